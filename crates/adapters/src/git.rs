// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git adapter for fetching recipe repositories locally.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },
}

/// Adapter for cloning git repositories
#[async_trait]
pub trait GitClient: Clone + Send + Sync + 'static {
    /// Clone `url` into `dir`, checking out `branch` when given.
    async fn clone_into(&self, url: &str, branch: Option<&str>, dir: &Path)
        -> Result<(), GitError>;
}

/// Git client that shells out to the `git` binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct GitCli;

impl GitCli {
    async fn git(&self, args: &[&str], cwd: Option<&Path>) -> Result<(), GitError> {
        let mut cmd = tokio::process::Command::new("git");
        cmd.args(args).env("GIT_TERMINAL_PROMPT", "0");
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }
        let output = cmd.output().await?;
        if output.status.success() {
            return Ok(());
        }
        Err(GitError::Failed {
            command: args.first().copied().unwrap_or_default().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[async_trait]
impl GitClient for GitCli {
    async fn clone_into(
        &self,
        url: &str,
        branch: Option<&str>,
        dir: &Path,
    ) -> Result<(), GitError> {
        let target = dir.to_string_lossy();
        tracing::info!(%url, ?branch, dir = %target, "cloning recipe");
        self.git(&["clone", "--quiet", url, target.as_ref()], None).await?;
        if let Some(branch) = branch {
            self.git(&["checkout", "--quiet", branch], Some(dir)).await?;
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{GitClient, GitError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    /// Recorded clone
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CloneCall {
        pub url: String,
        pub branch: Option<String>,
        pub dir: PathBuf,
    }

    #[derive(Default)]
    struct FakeGitState {
        /// Files written into every clone: relative path, contents.
        files: Vec<(String, String)>,
        fail: Option<String>,
        calls: Vec<CloneCall>,
    }

    /// Fake git client for testing
    #[derive(Clone, Default)]
    pub struct FakeGitClient {
        inner: Arc<Mutex<FakeGitState>>,
    }

    impl FakeGitClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a file that every clone produces.
        pub fn with_file(self, path: &str, contents: &str) -> Self {
            self.inner.lock().files.push((path.to_string(), contents.to_string()));
            self
        }

        pub fn fail_with(&self, stderr: &str) {
            self.inner.lock().fail = Some(stderr.to_string());
        }

        /// Get all recorded clones
        pub fn calls(&self) -> Vec<CloneCall> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl GitClient for FakeGitClient {
        async fn clone_into(
            &self,
            url: &str,
            branch: Option<&str>,
            dir: &Path,
        ) -> Result<(), GitError> {
            let files = {
                let mut state = self.inner.lock();
                state.calls.push(CloneCall {
                    url: url.to_string(),
                    branch: branch.map(str::to_string),
                    dir: dir.to_path_buf(),
                });
                if let Some(stderr) = state.fail.clone() {
                    return Err(GitError::Failed { command: "clone".into(), stderr });
                }
                state.files.clone()
            };
            for (path, contents) in files {
                let path = dir.join(path);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, contents)?;
            }
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{CloneCall, FakeGitClient};
