// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resilient remote executor
//!
//! Wraps one shell and one file session to a build server. Every operation
//! runs under the same retry budget; a session broken by a connection-level
//! failure is dropped and reopened on the next attempt.

use crate::retry::{retry, retry_when};
use ham_adapters::{CommandOutput, FileSession, RemoteError, RemoteHost, ShellSession};
use ham_core::RetryPolicy;
use std::path::Path;
use tokio::sync::Mutex;

/// Executes commands and file copies on one build server.
pub struct RemoteExecutor<H: RemoteHost> {
    host: H,
    address: String,
    policy: RetryPolicy,
    shell: Mutex<Option<H::Shell>>,
    files: Mutex<Option<H::Files>>,
}

impl<H: RemoteHost> RemoteExecutor<H> {
    pub fn new(host: H, address: impl Into<String>) -> Self {
        Self {
            host,
            address: address.into(),
            policy: RetryPolicy::REMOTE,
            shell: Mutex::new(None),
            files: Mutex::new(None),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Open the shell session (retrying) if it is not open yet.
    pub async fn open_shell(&self) -> Result<(), RemoteError> {
        retry(self.policy, "open shell", move |_| async move {
            let mut shell = self.shell.lock().await;
            if shell.is_none() {
                *shell = Some(self.host.open_shell(&self.address).await?);
            }
            Ok(())
        })
        .await
    }

    /// Open the file session (retrying) if it is not open yet.
    pub async fn open_files(&self) -> Result<(), RemoteError> {
        retry(self.policy, "open sftp", move |_| async move {
            let mut files = self.files.lock().await;
            if files.is_none() {
                *files = Some(self.host.open_files(&self.address).await?);
            }
            Ok(())
        })
        .await
    }

    /// Run a command that must succeed. Any failure is retried, including
    /// a non-zero exit.
    pub async fn run(&self, command: &str) -> Result<CommandOutput, RemoteError> {
        retry(self.policy, command, move |_| async move {
            let output = self.exec_once(command).await?;
            if output.success() {
                Ok(output)
            } else {
                Err(RemoteError::other(format!(
                    "{command:?} exited with status {}: {}",
                    output.exit_code,
                    output.stderr.trim()
                )))
            }
        })
        .await
    }

    /// Run a command whose exit status is the answer. Only connection-level
    /// failures are retried. Returns whether it exited 0.
    pub async fn probe(&self, command: &str) -> Result<bool, RemoteError> {
        retry_when(
            self.policy,
            command,
            |e: &RemoteError| e.class.is_connection(),
            move |_| async move { Ok(self.exec_once(command).await?.success()) },
        )
        .await
    }

    /// Create a remote directory and its parents.
    pub async fn mkdir_all(&self, path: &str) -> Result<(), RemoteError> {
        retry(self.policy, path, move |_| async move {
            let mut files = self.files_session().await?;
            let result = match files.as_mut() {
                Some(session) => session.mkdir_all(path).await,
                None => Err(RemoteError::session("file session unavailable")),
            };
            drop_if_broken(&mut files, &result);
            result
        })
        .await
    }

    /// Copy one local file to the server.
    pub async fn upload(&self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        retry(self.policy, remote, move |_| async move {
            let mut files = self.files_session().await?;
            let result = match files.as_mut() {
                Some(session) => session.upload(local, remote).await,
                None => Err(RemoteError::session("file session unavailable")),
            };
            drop_if_broken(&mut files, &result);
            result
        })
        .await
    }

    /// Close both sessions. Safe to call more than once.
    pub async fn close(&self) {
        if let Some(mut shell) = self.shell.lock().await.take() {
            shell.close().await;
        }
        if let Some(mut files) = self.files.lock().await.take() {
            files.close().await;
        }
    }

    async fn exec_once(&self, command: &str) -> Result<CommandOutput, RemoteError> {
        let mut shell = self.shell.lock().await;
        if shell.is_none() {
            *shell = Some(self.host.open_shell(&self.address).await?);
        }
        let result = match shell.as_mut() {
            Some(session) => session.exec(command).await,
            None => Err(RemoteError::session("shell session unavailable")),
        };
        drop_if_broken(&mut shell, &result);
        result
    }

    async fn files_session(
        &self,
    ) -> Result<tokio::sync::MutexGuard<'_, Option<H::Files>>, RemoteError> {
        let mut files = self.files.lock().await;
        if files.is_none() {
            *files = Some(self.host.open_files(&self.address).await?);
        }
        Ok(files)
    }
}

/// Forget a session whose connection is gone so the next attempt reconnects.
fn drop_if_broken<S, T>(session: &mut Option<S>, result: &Result<T, RemoteError>) {
    if let Err(e) = result {
        if e.class.is_connection() && session.take().is_some() {
            tracing::debug!(error = %e, "dropping broken session");
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
