// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ham get` failures that happen before any cloud call.

use crate::prelude::*;

#[test]
fn get_requires_a_recipe() {
    cli().args(&["get"]).fails().code(2).stderr_has("<RECIPE>");
}

#[test]
fn missing_config_is_reported() {
    let project = Project::empty();
    let config = project.path().join("absent.json");

    cli()
        .env("HAM_CONFIG", &config)
        .args(&["get", "-n", "."])
        .fails()
        .code(1)
        .stderr_has("absent.json")
        .stderr_has("not found");
}

#[test]
fn invalid_config_is_reported() {
    let project = Project::empty();
    let config = project.file("ham.json", "{\"api_key\": 7}");

    cli()
        .env("HAM_CONFIG", &config)
        .args(&["get", "-n", "."])
        .fails()
        .code(1)
        .stderr_has("invalid config");
}

#[test]
fn missing_answers_file_is_reported() {
    let project = Project::empty();
    let config = project.file(
        "ham.json",
        r#"{"api_key":"t","ssh_public_key":"ssh-ed25519 AAAA","ssh_private_key":"/nope"}"#,
    );

    cli()
        .env("HAM_CONFIG", &config)
        .args(&["get", "--answers", "/no/such/answers.json", "."])
        .fails()
        .code(1)
        .stderr_has("/no/such/answers.json");
}
