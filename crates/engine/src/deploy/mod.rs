// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment pipeline: variable collection, guest bootstrap, build start.

mod bootstrap;
mod vars;

pub use bootstrap::{bootstrap, start_build, AgentSource, BootstrapPlan, BootstrapReport};
pub use vars::{collect_variables, write_vars_document, Answers};

use ham_adapters::{PromptError, RemoteError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from deployment
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("argument {0:?} is required but no value was given")]
    RequiredEmpty(String),
    #[error("file for argument {id:?} not found: {}", .path.display())]
    MissingFile { id: String, path: PathBuf },
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("invalid answers document: {0}")]
    Answers(String),
    #[error("failed to write vars document: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode vars document: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to walk recipe directory: {0}")]
    Walk(#[from] walkdir::Error),
}
