// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for CLI specs.

use assert_cmd::assert::Assert;
use assert_cmd::Command;
use predicates::str::contains;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A `ham` invocation with a clean environment.
pub struct Ham {
    cmd: Command,
}

pub fn cli() -> Ham {
    let mut cmd = Command::cargo_bin("ham").unwrap();
    for var in ["HAM_CONFIG", "HAM_LOG", "HAM_AGENT_URL", "HAM_API_URL"] {
        cmd.env_remove(var);
    }
    Ham { cmd }
}

impl Ham {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn passes(mut self) -> Outcome {
        Outcome(self.cmd.assert().success())
    }

    pub fn fails(mut self) -> Outcome {
        Outcome(self.cmd.assert().failure())
    }
}

pub struct Outcome(Assert);

impl Outcome {
    pub fn stdout_has(self, needle: &str) -> Self {
        Self(self.0.stdout(contains(needle)))
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        Self(self.0.stderr(contains(needle)))
    }

    pub fn code(self, code: i32) -> Self {
        Self(self.0.code(code))
    }
}

/// Scratch directory holding a config file and a recipe.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }
}
