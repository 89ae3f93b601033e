// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipe model and recipe location parsing.

use crate::identity::BuildIdentity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of a build argument
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    #[default]
    Value,
    Secret,
    File,
}

crate::simple_display! {
    ArgKind {
        Value => "value",
        Secret => "secret",
        File => "file",
    }
}

impl ArgKind {
    /// Lenient parse: unknown kinds fall back to a plain value.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "secret" => ArgKind::Secret,
            "file" => ArgKind::File,
            _ => ArgKind::Value,
        }
    }
}

impl<'de> Deserialize<'de> for ArgKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(ArgKind::parse(&s))
    }
}

/// A build-time input declared by a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeArg {
    pub id: String,
    pub prompt: String,
    #[serde(default, rename = "type")]
    pub kind: ArgKind,
    #[serde(default)]
    pub required: bool,
}

impl RecipeArg {
    pub fn new(id: impl Into<String>, kind: ArgKind) -> Self {
        let id = id.into();
        Self { prompt: id.clone(), id, kind, required: false }
    }

    crate::setters! {
        into { prompt: String }
        set { required: bool }
    }
}

/// Immutable description of a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub title: String,
    pub version: String,
    /// SHA-256 hex digest over the recipe's declared contents
    pub content_hash: String,
    pub args: Vec<RecipeArg>,
}

impl Recipe {
    pub fn identity(&self) -> BuildIdentity {
        BuildIdentity::for_hash(&self.content_hash)
    }
}

crate::builder! {
    pub struct RecipeBuilder => Recipe {
        into {
            title: String = "test-recipe",
            version: String = "1.0",
            content_hash: String = "0000000000000000000000000000000000000000000000000000000000000000",
        }
        set {
            args: Vec<RecipeArg> = Vec::new(),
        }
    }
}

/// Where a recipe comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeOrigin {
    /// A directory on the local machine, mirrored to the guest file by file.
    Local(PathBuf),
    /// A git remote the guest clones directly.
    Git(GitRemote),
}

/// A git URL plus optional branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRemote {
    pub url: String,
    pub branch: Option<String>,
}

/// Organisation hosting the community recipes (`~@gh/<repo>`).
pub const COMMUNITY_ORG: &str = "ham-community";

impl GitRemote {
    /// Parse a recipe location that is not a local path.
    ///
    /// Accepted forms:
    ///
    /// ```text
    /// ~@gh/<repo>[:branch]       community recipe on GitHub
    /// <user>@gh/<repo>[:branch]  user recipe on GitHub
    /// <url>[:branch]             any git URL
    /// ```
    ///
    /// A trailing `:branch` is only recognised when it contains no `/`, so
    /// ports (`host:8443/repo`) and scp-style remotes (`git@host:user/repo`)
    /// stay intact.
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        let (scheme, rest) = match location.split_once("://") {
            Some((scheme, rest)) => (Some(scheme), rest),
            None => (None, location),
        };

        let (target, branch) = match rest.rsplit_once(':') {
            Some((head, tail)) if !tail.is_empty() && !tail.contains('/') => {
                (head, Some(tail.to_string()))
            }
            _ => (rest, None),
        };

        if scheme.is_none() {
            if let Some(url) = github_shorthand(target) {
                return Self { url, branch };
            }
        }

        let url = match scheme {
            Some(scheme) => format!("{scheme}://{target}"),
            None => target.to_string(),
        };
        Self { url, branch }
    }
}

/// Expand `<user>@gh/<repo>` to a GitHub URL.
fn github_shorthand(target: &str) -> Option<String> {
    let (user_host, repo) = target.split_once('/')?;
    if repo.is_empty() || repo.contains('/') {
        return None;
    }
    let (user, host) = user_host.split_once('@')?;
    if !host.eq_ignore_ascii_case("gh") || user.is_empty() {
        return None;
    }
    let owner = if user == "~" { COMMUNITY_ORG } else { user };
    Some(format!("https://github.com/{owner}/{repo}"))
}

#[cfg(test)]
#[path = "recipe_tests.rs"]
mod tests;
