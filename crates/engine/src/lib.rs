// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ham-engine: the `ham get` flow
//!
//! Server lifecycle, guest bootstrap, build tracking and the cleanup guard
//! that ties them together.

pub mod cleanup;
pub mod deploy;
pub mod executor;
pub mod lifecycle;
pub mod orchestrator;
pub mod retry;
pub mod source;
pub mod tracker;

pub use cleanup::CleanupGuard;
pub use deploy::{AgentSource, Answers, DeployError};
pub use executor::RemoteExecutor;
pub use lifecycle::{LifecycleError, ServerLifecycle, ServerRef};
pub use orchestrator::{
    GetError, GetOptions, GetReport, OrchestrateError, Orchestrator, OrchestratorDeps,
};
pub use source::{resolve_recipe, ResolvedRecipe, SourceError};
pub use tracker::{TrackError, TrackOutcome, Tracker};
