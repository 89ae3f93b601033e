// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote host adapter (shell and file sessions)
//!
//! Sessions are never persisted. Callers open one per use, and reopen it
//! when an error's class says the connection is gone.

mod ssh;

pub use ssh::SshRemote;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRemote, RemoteCall};

use async_trait::async_trait;
use ham_core::FailureClass;
use std::path::Path;
use thiserror::Error;
use tokio::sync::mpsc;

/// A remote failure tagged with its class.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{class}: {message}")]
pub struct RemoteError {
    pub class: FailureClass,
    pub message: String,
}

impl RemoteError {
    pub fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self { class, message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureClass::Transport, message)
    }

    pub fn session(message: impl Into<String>) -> Self {
        Self::new(FailureClass::Session, message)
    }

    pub fn shell(message: impl Into<String>) -> Self {
        Self::new(FailureClass::Shell, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureClass::Other, message)
    }
}

/// Result of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: u32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Connects to a build server.
#[async_trait]
pub trait RemoteHost: Clone + Send + Sync + 'static {
    type Shell: ShellSession;
    type Files: FileSession;

    /// Open an authenticated shell session to `address` (`host:port`).
    async fn open_shell(&self, address: &str) -> Result<Self::Shell, RemoteError>;

    /// Open an SFTP session to `address`.
    async fn open_files(&self, address: &str) -> Result<Self::Files, RemoteError>;
}

/// Command execution over an open session.
#[async_trait]
pub trait ShellSession: Send + 'static {
    /// Run a command to completion and collect its output.
    async fn exec(&mut self, command: &str) -> Result<CommandOutput, RemoteError>;

    /// Run a command, forwarding stdout line by line.
    ///
    /// Returns the exit code, or `None` when the command ended without one
    /// or the receiver went away.
    async fn stream(
        &mut self,
        command: &str,
        lines: mpsc::Sender<String>,
    ) -> Result<Option<u32>, RemoteError>;

    async fn close(&mut self);
}

/// File transfer over an open session.
#[async_trait]
pub trait FileSession: Send + 'static {
    /// Create a directory and any missing parents.
    async fn mkdir_all(&mut self, path: &str) -> Result<(), RemoteError>;

    /// Copy a local file to `remote`, replacing it.
    async fn upload(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError>;

    async fn close(&mut self);
}

/// Split command output into lines, dropping a trailing partial newline.
pub(crate) fn drain_lines(buffer: &mut String) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.find('\n') {
        let line: String = buffer.drain(..=pos).collect();
        lines.push(line.trim_end_matches(['\n', '\r']).to_string());
    }
    lines
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
