// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `~/.ham.json`: API token and SSH key pair.
//!
//! Key fields hold either the key text itself or a path to it. The same
//! file is mirrored to the guest so the agent can record build labels.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine home directory, set HAM_CONFIG")]
    NoHome,
    #[error("config {} not found, create it with api_key, ssh_public_key and ssh_private_key", .0.display())]
    Missing(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid config {}: {source}", .path.display())]
    Invalid { path: PathBuf, source: serde_json::Error },
    #[error("config field {0} is empty")]
    Empty(&'static str),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub path: PathBuf,
    pub api_key: String,
    pub ssh_public_key: String,
    pub ssh_private_key: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::Missing(path.to_path_buf()))
            }
            Err(source) => return Err(ConfigError::Read { path: path.to_path_buf(), source }),
        };
        let mut config: Config = serde_json::from_str(&text)
            .map_err(|source| ConfigError::Invalid { path: path.to_path_buf(), source })?;
        for (name, value) in [
            ("api_key", &config.api_key),
            ("ssh_public_key", &config.ssh_public_key),
            ("ssh_private_key", &config.ssh_private_key),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(name));
            }
        }
        config.path = path.to_path_buf();
        Ok(config)
    }

    /// The public key line (`ssh-ed25519 AAAA... comment`).
    pub fn public_key(&self) -> Result<String, ConfigError> {
        let key = inline_or_file(&self.ssh_public_key, |v| {
            v.starts_with("ssh-") || v.starts_with("ecdsa-")
        })?;
        Ok(key.trim().to_string())
    }

    /// The private key in OpenSSH or PEM form.
    pub fn private_key(&self) -> Result<String, ConfigError> {
        inline_or_file(&self.ssh_private_key, |v| v.starts_with("-----BEGIN"))
    }
}

fn inline_or_file(value: &str, is_inline: impl Fn(&str) -> bool) -> Result<String, ConfigError> {
    let value = value.trim_start();
    if is_inline(value) {
        return Ok(value.to_string());
    }
    let path = expand_home(value);
    std::fs::read_to_string(&path).map_err(|source| ConfigError::Read { path, source })
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
