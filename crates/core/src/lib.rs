// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ham-core: domain types for the ham remote build orchestrator

pub mod macros;

pub mod failure;
pub mod guest;
pub mod identity;
pub mod outcome;
pub mod policy;
pub mod recipe;
pub mod status;
pub mod vars;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use failure::{FailureClass, ServerFate};
pub use identity::BuildIdentity;
pub use outcome::{BuildOutcome, LABEL_FAILED, LABEL_IN_PROGRESS, LABEL_SUCCESSFUL};
pub use policy::{
    destroy_decision, probe_policy, Decision, KeepFlag, KeepFlags, ProbePolicy, RetryPolicy,
    ACTION_POLL_INTERVAL,
};
#[cfg(any(test, feature = "test-support"))]
pub use recipe::RecipeBuilder;
pub use recipe::{ArgKind, GitRemote, Recipe, RecipeArg, RecipeOrigin};
pub use status::{RemoteState, RemoteStatus, StatusError};
pub use vars::{BuildVariables, FileUpload, VarValue, VarsDocument};
