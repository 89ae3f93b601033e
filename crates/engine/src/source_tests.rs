// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ham_adapters::FakeGitClient;
use yare::parameterized;

#[tokio::test]
async fn existing_directory_is_local() {
    let dir = tempfile::tempdir().unwrap();
    let git = FakeGitClient::new();

    let resolved = resolve_recipe(&dir.path().to_string_lossy(), &git).await.unwrap();

    assert_eq!(resolved.dir, dir.path().canonicalize().unwrap());
    assert!(matches!(resolved.origin, RecipeOrigin::Local(_)));
    assert!(git.calls().is_empty());
}

#[tokio::test]
async fn missing_path_is_an_error() {
    let git = FakeGitClient::new();
    let err = resolve_recipe("./no/such/recipe", &git).await.unwrap_err();
    assert!(matches!(err, SourceError::NotFound(_)));
    assert!(git.calls().is_empty());
}

#[tokio::test]
async fn shorthand_is_cloned_and_removed_on_drop() {
    let git = FakeGitClient::new().with_file("ham.toml", "title = \"lineage\"\n");

    let resolved = resolve_recipe("~@gh/lineage:v21", &git).await.unwrap();

    let call = &git.calls()[0];
    assert_eq!(call.url, "https://github.com/ham-community/lineage");
    assert_eq!(call.branch.as_deref(), Some("v21"));
    assert!(resolved.dir.join("ham.toml").is_file());
    assert!(matches!(&resolved.origin, RecipeOrigin::Git(r) if r.url == call.url));

    let dir = resolved.dir.clone();
    drop(resolved);
    assert!(!dir.exists());
}

#[tokio::test]
async fn clone_failure_names_the_url() {
    let git = FakeGitClient::new();
    git.fail_with("repository not found");

    let err = resolve_recipe("https://example.com/r.git", &git).await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("https://example.com/r.git"));
}

#[parameterized(
    dot = { ".", true },
    relative = { "./recipes/x", true },
    parent = { "../x", true },
    absolute = { "/srv/recipes", true },
    home = { "~/recipes", true },
    shorthand = { "~@gh/lineage", false },
    url = { "https://example.com/r.git", false },
    scp = { "git@example.com:me/r.git", false },
)]
fn path_detection(location: &str, expected: bool) {
    assert_eq!(looks_like_path(location), expected);
}
