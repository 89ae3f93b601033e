// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build outcome as recorded in the durable label store.

/// Label value written when a build finished successfully.
pub const LABEL_SUCCESSFUL: &str = "successful";
/// Label value written when a build failed.
pub const LABEL_FAILED: &str = "failed";
/// Label value written while a build is running.
pub const LABEL_IN_PROGRESS: &str = "inprogress";

/// Final (or current) state of a build.
///
/// The local process is never the only writer of this value: the remote
/// agent and other invocations update it concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildOutcome {
    InProgress,
    Successful,
    Failed,
    /// No label recorded, or the store was unreachable.
    Unknown,
}

crate::simple_display! {
    BuildOutcome {
        InProgress => "in progress",
        Successful => "successful",
        Failed => "failed",
        Unknown => "unknown",
    }
}

impl BuildOutcome {
    /// Interpret a label value. Any present value that is not a known
    /// non-failure state counts as failed.
    pub fn from_label(value: Option<&str>) -> Self {
        match value {
            None => BuildOutcome::Unknown,
            Some(LABEL_SUCCESSFUL) => BuildOutcome::Successful,
            Some(LABEL_IN_PROGRESS) => BuildOutcome::InProgress,
            Some(_) => BuildOutcome::Failed,
        }
    }

    /// The label value that records this outcome.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            BuildOutcome::InProgress => Some(LABEL_IN_PROGRESS),
            BuildOutcome::Successful => Some(LABEL_SUCCESSFUL),
            BuildOutcome::Failed => Some(LABEL_FAILED),
            BuildOutcome::Unknown => None,
        }
    }
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
