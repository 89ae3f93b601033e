// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipe location resolution.

use ham_adapters::{GitClient, GitError};
use ham_core::{GitRemote, RecipeOrigin};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("recipe directory not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to fetch recipe {url}: {source}")]
    Clone {
        url: String,
        #[source]
        source: GitError,
    },
    #[error("failed to create checkout directory: {0}")]
    Io(#[from] std::io::Error),
}

/// A recipe ready to parse. A git checkout lives as long as this value.
#[derive(Debug)]
pub struct ResolvedRecipe {
    pub origin: RecipeOrigin,
    /// Local directory holding the recipe tree.
    pub dir: PathBuf,
    _checkout: Option<TempDir>,
}

/// Turn a recipe location into a local tree.
///
/// An existing directory is used in place. Anything that looks like a path
/// but does not exist is an error; everything else is a git remote, cloned
/// into a temporary directory.
pub async fn resolve_recipe<G: GitClient>(
    location: &str,
    git: &G,
) -> Result<ResolvedRecipe, SourceError> {
    let path = Path::new(location);
    if path.is_dir() {
        let dir = path.canonicalize()?;
        return Ok(ResolvedRecipe {
            origin: RecipeOrigin::Local(dir.clone()),
            dir,
            _checkout: None,
        });
    }
    if looks_like_path(location) {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }

    let remote = GitRemote::parse(location);
    let checkout = tempfile::Builder::new().prefix("ham-recipe-").tempdir()?;
    let dir = checkout.path().join("recipe");
    git.clone_into(&remote.url, remote.branch.as_deref(), &dir)
        .await
        .map_err(|source| SourceError::Clone { url: remote.url.clone(), source })?;
    tracing::info!(url = %remote.url, branch = ?remote.branch, "recipe fetched");

    Ok(ResolvedRecipe { origin: RecipeOrigin::Git(remote), dir, _checkout: Some(checkout) })
}

fn looks_like_path(location: &str) -> bool {
    location == "."
        || location == ".."
        || ["/", "./", "../", "~/"].iter().any(|p| location.starts_with(p))
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
