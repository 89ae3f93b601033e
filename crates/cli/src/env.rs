// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI.

use crate::config::ConfigError;
use std::path::PathBuf;

/// Version string shown by `ham --version`.
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("HAM_BUILD_GIT_HASH"));

/// Default download location of the guest build agent.
pub const DEFAULT_AGENT_URL: &str =
    "https://github.com/ham-community/ham/releases/latest/download/ham-linux-amd64";

/// Default log filter when `HAM_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Resolve the config file: HAM_CONFIG > ~/.ham.json
pub fn config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = non_empty("HAM_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".ham.json")).ok_or(ConfigError::NoHome)
}

/// Tracing filter directives (`HAM_LOG`, default `info`).
pub fn log_filter() -> String {
    non_empty("HAM_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

/// Agent release URL override (`HAM_AGENT_URL`).
pub fn agent_url() -> String {
    non_empty("HAM_AGENT_URL").unwrap_or_else(|| DEFAULT_AGENT_URL.to_string())
}

/// Cloud API base URL override (`HAM_API_URL`).
pub fn api_url() -> String {
    non_empty("HAM_API_URL").unwrap_or_else(|| ham_adapters::cloud::DEFAULT_API_URL.to_string())
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
