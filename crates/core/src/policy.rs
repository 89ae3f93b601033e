// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry budgets and the destroy/keep policy table.
//!
//! ```text
//! class                    retry            keep honoured by
//! ───────────────────────  ───────────────  ─────────────────────────
//! Transport/Session/Shell  3 × 5s           keep, keep_on_connect_fail
//! MalformedStatus          10 × 10min       keep, keep_on_track_fail
//! BuildFailed              none             keep, keep_on_build_fail
//! Other                    3 × 5s           keep
//! ```

use crate::failure::FailureClass;
use std::time::Duration;

/// Bounded attempts with a fixed pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts: if attempts == 0 { 1 } else { attempts }, backoff }
    }

    /// A single attempt.
    pub const fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Session setup, single commands and single file copies.
    pub const REMOTE: RetryPolicy = RetryPolicy::new(20, Duration::from_secs(3));
    /// Probe reconnects after connection-level failures.
    pub const PROBE_CONNECTION: RetryPolicy = RetryPolicy::new(3, Duration::from_secs(5));
    /// Probe retries while the agent may still be writing its status.
    pub const PROBE_MALFORMED: RetryPolicy = RetryPolicy::new(10, Duration::from_secs(600));
    /// Probe retries after unclassified failures.
    pub const PROBE_OTHER: RetryPolicy = RetryPolicy::new(3, Duration::from_secs(5));
    /// Reading the final outcome from the label store.
    pub const LABEL_POLL: RetryPolicy = RetryPolicy::new(20, Duration::from_secs(10));
    /// Deleting a server after a decided failure.
    pub const DESTROY: RetryPolicy = RetryPolicy::new(20, Duration::from_secs(5));
    /// Deleting a server from the exit hook.
    pub const DESTROY_ON_EXIT: RetryPolicy = RetryPolicy::new(5, Duration::from_secs(5));
}

/// Interval between polls of an asynchronous provider action.
pub const ACTION_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// User overrides of the default destroy-on-failure behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeepFlags {
    /// Never destroy, whatever happened.
    pub keep: bool,
    pub on_connect_fail: bool,
    pub on_track_fail: bool,
    pub on_build_fail: bool,
}

impl KeepFlags {
    /// Hint passed to the remote agent so it does not power itself off on failure.
    pub fn agent_keep_hint(&self) -> bool {
        self.keep || self.on_build_fail
    }

    fn has(&self, flag: KeepFlag) -> bool {
        match flag {
            KeepFlag::OnConnectFail => self.on_connect_fail,
            KeepFlag::OnTrackFail => self.on_track_fail,
            KeepFlag::OnBuildFail => self.on_build_fail,
            KeepFlag::GenericOnly => false,
        }
    }
}

/// The class-specific keep flag that can veto destruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepFlag {
    OnConnectFail,
    OnTrackFail,
    OnBuildFail,
    /// Only the generic keep flag applies.
    GenericOnly,
}

/// Keep or destroy the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Destroy,
}

/// One row of the probe policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    /// `None` means the class is terminal on first sight.
    pub retry: Option<RetryPolicy>,
    pub keep_flag: KeepFlag,
}

/// Policy row for a failure class.
pub fn probe_policy(class: FailureClass) -> ProbePolicy {
    match class {
        FailureClass::Transport | FailureClass::Session | FailureClass::Shell => ProbePolicy {
            retry: Some(RetryPolicy::PROBE_CONNECTION),
            keep_flag: KeepFlag::OnConnectFail,
        },
        FailureClass::MalformedStatus => ProbePolicy {
            retry: Some(RetryPolicy::PROBE_MALFORMED),
            keep_flag: KeepFlag::OnTrackFail,
        },
        FailureClass::BuildFailed => ProbePolicy { retry: None, keep_flag: KeepFlag::OnBuildFail },
        FailureClass::Other => {
            ProbePolicy { retry: Some(RetryPolicy::PROBE_OTHER), keep_flag: KeepFlag::GenericOnly }
        }
    }
}

/// Decide the server's fate once a failure class is terminal.
///
/// The generic keep flag always wins; a specific flag only covers its own class.
pub fn destroy_decision(class: FailureClass, flags: KeepFlags) -> Decision {
    if flags.keep || flags.has(probe_policy(class).keep_flag) {
        Decision::Keep
    } else {
        Decision::Destroy
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
