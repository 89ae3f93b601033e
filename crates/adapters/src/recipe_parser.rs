// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipe parsing from a local directory.
//!
//! A recipe directory carries a `ham.toml` manifest:
//!
//! ```toml
//! title = "LineageOS 21"
//! version = "1.2"
//!
//! [[args]]
//! id = "device"
//! prompt = "Device codename"
//! required = true
//!
//! [[args]]
//! id = "signing_key"
//! prompt = "Release signing key"
//! type = "file"
//! ```
//!
//! The content hash covers every file in the directory, not just the
//! manifest, so editing any build script yields a new build identity.

use ham_core::{Recipe, RecipeArg};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Manifest file name at the recipe root.
pub const MANIFEST: &str = "ham.toml";

/// Errors from recipe parsing
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("no {MANIFEST} in {0}")]
    MissingManifest(PathBuf),
    #[error("invalid {MANIFEST}: {0}")]
    Invalid(String),
    #[error("duplicate argument id {0:?}")]
    DuplicateArg(String),
    #[error("failed to read recipe: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to walk recipe: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Reads a recipe from a directory.
pub trait RecipeParser: Clone + Send + Sync + 'static {
    fn parse(&self, dir: &Path) -> Result<Recipe, RecipeError>;
}

#[derive(Deserialize)]
struct Manifest {
    title: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    args: Vec<RecipeArg>,
}

/// Parser for `ham.toml` recipe directories.
#[derive(Clone, Copy, Debug, Default)]
pub struct TomlRecipeParser;

impl RecipeParser for TomlRecipeParser {
    fn parse(&self, dir: &Path) -> Result<Recipe, RecipeError> {
        let manifest_path = dir.join(MANIFEST);
        if !manifest_path.is_file() {
            return Err(RecipeError::MissingManifest(dir.to_path_buf()));
        }
        let text = std::fs::read_to_string(&manifest_path)?;
        let manifest: Manifest =
            toml::from_str(&text).map_err(|e| RecipeError::Invalid(e.to_string()))?;

        let mut seen = HashSet::new();
        for arg in &manifest.args {
            if !seen.insert(arg.id.as_str()) {
                return Err(RecipeError::DuplicateArg(arg.id.clone()));
            }
        }

        let content_hash = content_hash(dir)?;
        tracing::debug!(title = %manifest.title, %content_hash, "parsed recipe");
        Ok(Recipe {
            title: manifest.title,
            version: manifest.version,
            content_hash,
            args: manifest.args,
        })
    }
}

/// SHA-256 over every file below `dir` (sorted relative paths, `.git`
/// excluded). Each entry contributes its path and its contents.
pub fn content_hash(dir: &Path) -> Result<String, RecipeError> {
    let mut hasher = Sha256::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let relative = relative.to_string_lossy().replace('\\', "/");
        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        hasher.update(std::fs::read(entry.path())?);
        hasher.update([0u8]);
    }
    Ok(hasher.finalize().iter().map(|b| format!("{b:02x}")).collect())
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{RecipeError, RecipeParser};
    use ham_core::Recipe;
    use std::path::Path;

    /// Parser that returns a fixed recipe wherever it is pointed
    #[derive(Clone)]
    pub struct FakeRecipeParser {
        recipe: Recipe,
    }

    impl FakeRecipeParser {
        pub fn new(recipe: Recipe) -> Self {
            Self { recipe }
        }
    }

    impl RecipeParser for FakeRecipeParser {
        fn parse(&self, _dir: &Path) -> Result<Recipe, RecipeError> {
            Ok(self.recipe.clone())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRecipeParser;

#[cfg(test)]
#[path = "recipe_parser_tests.rs"]
mod tests;
