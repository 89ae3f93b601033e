// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status payload streamed by the remote build agent.
//!
//! One JSON object per line:
//!
//! ```text
//! {"status":"running","message":"syncing sources","progress":12}
//! {"status":"successful"}
//! {"status":"failed","message":"lunch: unknown target"}
//! ```

use serde::Deserialize;
use thiserror::Error;

/// State reported by the remote agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteState {
    Running,
    Successful,
    Failed,
}

/// One parsed status line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteStatus {
    pub status: RemoteState,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub progress: Option<u8>,
}

#[derive(Debug, Error)]
#[error("malformed status payload {line:?}: {source}")]
pub struct StatusError {
    pub line: String,
    #[source]
    pub source: serde_json::Error,
}

impl RemoteStatus {
    /// Parse one line of agent output.
    pub fn parse(line: &str) -> Result<Self, StatusError> {
        serde_json::from_str(line.trim())
            .map_err(|source| StatusError { line: line.to_string(), source })
    }

    pub fn is_terminal(&self) -> bool {
        self.status != RemoteState::Running
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
