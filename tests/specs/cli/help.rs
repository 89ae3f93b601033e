// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI help output specs

use crate::prelude::*;

#[test]
fn ham_help_lists_get() {
    cli().args(&["--help"]).passes().stdout_has("Usage:").stdout_has("get");
}

#[test]
fn ham_without_command_fails_with_usage() {
    cli().fails().code(2).stderr_has("Usage:");
}

#[test]
fn ham_get_help_lists_keep_flags() {
    cli()
        .args(&["get", "--help"])
        .passes()
        .stdout_has("--no-confirm")
        .stdout_has("--keep-server")
        .stdout_has("--keep-server-conn-fail")
        .stdout_has("--keep-server-track-fail")
        .stdout_has("--keep-server-build-fail")
        .stdout_has("--testing-ssh-ip")
        .stdout_has("--force");
}

#[test]
fn ham_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.2");
}
