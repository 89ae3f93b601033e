// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH shell and SFTP sessions via russh.

use super::{drain_lines, CommandOutput, FileSession, RemoteError, RemoteHost, ShellSession};
use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::{ChannelMsg, Disconnect};
use russh_keys::key::{KeyPair, PublicKey};
use russh_sftp::client::SftpSession;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Extended data stream carrying stderr.
const STDERR_EXT: u32 = 1;

struct Client;

#[async_trait]
impl client::Handler for Client {
    type Error = russh::Error;

    // Build servers are created moments before we connect and never reused
    // across identities, so there is no known host key to pin.
    async fn check_server_key(&mut self, _key: &PublicKey) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Remote host reached over SSH with public key auth.
#[derive(Clone)]
pub struct SshRemote {
    user: String,
    key: Arc<KeyPair>,
    config: Arc<client::Config>,
    connect_timeout: Duration,
}

impl SshRemote {
    /// Build from an OpenSSH or PEM encoded private key.
    pub fn new(user: impl Into<String>, private_key: &str) -> Result<Self, RemoteError> {
        let key = russh_keys::decode_secret_key(private_key, None)
            .map_err(|e| RemoteError::session(format!("invalid private key: {e}")))?;
        let config = client::Config {
            keepalive_interval: Some(KEEPALIVE_INTERVAL),
            ..Default::default()
        };
        Ok(Self {
            user: user.into(),
            key: Arc::new(key),
            config: Arc::new(config),
            connect_timeout: CONNECT_TIMEOUT,
        })
    }

    async fn connect(&self, address: &str) -> Result<Handle<Client>, RemoteError> {
        let connect = client::connect(self.config.clone(), address, Client);
        let mut handle = match tokio::time::timeout(self.connect_timeout, connect).await {
            Err(_) => return Err(RemoteError::transport(format!("{address}: connect timed out"))),
            Ok(Err(russh::Error::IO(e))) => {
                return Err(RemoteError::transport(format!("{address}: {e}")))
            }
            Ok(Err(e)) => return Err(RemoteError::session(format!("{address}: {e}"))),
            Ok(Ok(handle)) => handle,
        };
        let accepted = handle
            .authenticate_publickey(&self.user, self.key.clone())
            .await
            .map_err(|e| RemoteError::session(format!("{address}: {e}")))?;
        if !accepted {
            return Err(RemoteError::session(format!(
                "{address}: public key rejected for {}",
                self.user
            )));
        }
        tracing::debug!(%address, user = %self.user, "ssh session established");
        Ok(handle)
    }
}

#[async_trait]
impl RemoteHost for SshRemote {
    type Shell = SshShell;
    type Files = SftpFiles;

    async fn open_shell(&self, address: &str) -> Result<SshShell, RemoteError> {
        Ok(SshShell { handle: self.connect(address).await? })
    }

    async fn open_files(&self, address: &str) -> Result<SftpFiles, RemoteError> {
        let handle = self.connect(address).await?;
        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| RemoteError::shell(format!("open sftp channel: {e}")))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| RemoteError::shell(format!("request sftp subsystem: {e}")))?;
        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| RemoteError::session(format!("start sftp: {e}")))?;
        Ok(SftpFiles { handle, sftp })
    }
}

async fn disconnect(handle: &Handle<Client>) {
    if let Err(e) = handle.disconnect(Disconnect::ByApplication, "", "en").await {
        tracing::debug!(error = %e, "ssh disconnect failed");
    }
}

/// Shell session over one SSH connection.
pub struct SshShell {
    handle: Handle<Client>,
}

impl SshShell {
    async fn start(&self, command: &str) -> Result<russh::Channel<client::Msg>, RemoteError> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| RemoteError::shell(format!("open channel: {e}")))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| RemoteError::shell(format!("exec: {e}")))?;
        Ok(channel)
    }
}

#[async_trait]
impl ShellSession for SshShell {
    async fn exec(&mut self, command: &str) -> Result<CommandOutput, RemoteError> {
        let mut channel = self.start(command).await?;
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext } if ext == STDERR_EXT => {
                    stderr.extend_from_slice(data)
                }
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status),
                _ => {}
            }
        }
        let exit_code = exit_code
            .ok_or_else(|| RemoteError::session(format!("{command:?} ended without exit status")))?;
        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    async fn stream(
        &mut self,
        command: &str,
        lines: mpsc::Sender<String>,
    ) -> Result<Option<u32>, RemoteError> {
        let mut channel = self.start(command).await?;
        let mut buffer = String::new();
        let mut exit_code = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => {
                    buffer.push_str(&String::from_utf8_lossy(data));
                    for line in drain_lines(&mut buffer) {
                        if lines.send(line).await.is_err() {
                            let _ = channel.close().await;
                            return Ok(None);
                        }
                    }
                }
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status),
                _ => {}
            }
        }
        if !buffer.is_empty() {
            let _ = lines.send(std::mem::take(&mut buffer)).await;
        }
        Ok(exit_code)
    }

    async fn close(&mut self) {
        disconnect(&self.handle).await;
    }
}

/// SFTP session plus the connection carrying it.
pub struct SftpFiles {
    handle: Handle<Client>,
    sftp: SftpSession,
}

#[async_trait]
impl FileSession for SftpFiles {
    async fn mkdir_all(&mut self, path: &str) -> Result<(), RemoteError> {
        let mut current = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            let exists = self
                .sftp
                .try_exists(current.as_str())
                .await
                .map_err(|e| RemoteError::other(format!("stat {current}: {e}")))?;
            if !exists {
                self.sftp
                    .create_dir(current.as_str())
                    .await
                    .map_err(|e| RemoteError::other(format!("mkdir {current}: {e}")))?;
            }
        }
        Ok(())
    }

    async fn upload(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        let mut source = tokio::fs::File::open(local)
            .await
            .map_err(|e| RemoteError::other(format!("open {}: {e}", local.display())))?;
        let mut target = self
            .sftp
            .create(remote)
            .await
            .map_err(|e| RemoteError::other(format!("create {remote}: {e}")))?;
        let bytes = tokio::io::copy(&mut source, &mut target)
            .await
            .map_err(|e| RemoteError::other(format!("copy to {remote}: {e}")))?;
        target
            .shutdown()
            .await
            .map_err(|e| RemoteError::other(format!("flush {remote}: {e}")))?;
        tracing::debug!(local = %local.display(), %remote, bytes, "uploaded");
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.sftp.close().await {
            tracing::debug!(error = %e, "sftp close failed");
        }
        disconnect(&self.handle).await;
    }
}
