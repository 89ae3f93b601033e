// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exit-time server cleanup.
//!
//! The guard's armed flag decides whether the server outlives this
//! invocation. It is armed as soon as a server is known and disarmed on a
//! clean finish or a keep decision. [`CleanupGuard::run`] reads the flag
//! once, after the orchestration future finished, failed or was cancelled.

use crate::lifecycle::ServerLifecycle;
use crate::retry::retry;
use ham_adapters::CloudProvider;
use ham_core::{BuildIdentity, RetryPolicy, ServerFate};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct GuardState {
    armed: bool,
    ran: bool,
    destroyed: bool,
    destroy_failed: bool,
}

pub struct CleanupGuard<P: CloudProvider> {
    lifecycle: ServerLifecycle<P>,
    identity: BuildIdentity,
    /// Never deletes anything (externally managed test server).
    protected: bool,
    state: Mutex<GuardState>,
}

impl<P: CloudProvider> CleanupGuard<P> {
    pub fn new(lifecycle: ServerLifecycle<P>, identity: BuildIdentity) -> Self {
        Self { lifecycle, identity, protected: false, state: Mutex::new(GuardState::default()) }
    }

    /// A guard that reports every server as kept.
    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    pub fn identity(&self) -> &BuildIdentity {
        &self.identity
    }

    pub fn arm(&self) {
        if self.protected {
            tracing::debug!(server = %self.identity, "protected server, guard not armed");
            return;
        }
        self.state.lock().armed = true;
        tracing::debug!(server = %self.identity, "cleanup armed");
    }

    pub fn disarm(&self, reason: &str) {
        let mut state = self.state.lock();
        if state.armed {
            state.armed = false;
            tracing::info!(server = %self.identity, reason, "cleanup disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state.lock().armed
    }

    /// What has happened to the server so far.
    pub fn fate(&self) -> ServerFate {
        let state = self.state.lock();
        if state.destroyed {
            ServerFate::Destroyed
        } else if state.destroy_failed {
            ServerFate::DestroyFailed
        } else {
            ServerFate::Kept
        }
    }

    /// Destroy after a decided failure. On failure the guard stays armed so
    /// the exit hook tries again.
    pub async fn destroy_now(&self) -> ServerFate {
        self.destroy(RetryPolicy::DESTROY).await
    }

    /// Exit hook. Destroys the server if still armed. Only the first call
    /// does anything; later calls return `None`.
    pub async fn run(&self) -> Option<ServerFate> {
        let armed = {
            let mut state = self.state.lock();
            if state.ran {
                return None;
            }
            state.ran = true;
            state.armed
        };
        if !armed {
            return None;
        }
        tracing::warn!(server = %self.identity, "server still armed at exit, destroying");
        Some(self.destroy(RetryPolicy::DESTROY_ON_EXIT).await)
    }

    async fn destroy(&self, policy: RetryPolicy) -> ServerFate {
        if self.protected {
            tracing::info!(server = %self.identity, "protected server kept");
            return ServerFate::Kept;
        }
        let lifecycle = &self.lifecycle;
        let identity = &self.identity;
        let result = retry(policy, "destroy server", move |_| async move {
            lifecycle.destroy(identity).await
        })
        .await;

        let mut state = self.state.lock();
        match result {
            Ok(_) => {
                state.armed = false;
                state.destroyed = true;
                state.destroy_failed = false;
                ServerFate::Destroyed
            }
            Err(e) => {
                tracing::error!(server = %self.identity, error = %e, "failed to destroy server");
                state.destroy_failed = true;
                ServerFate::DestroyFailed
            }
        }
    }
}

impl<P: CloudProvider> Drop for CleanupGuard<P> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.ran && state.armed {
            tracing::warn!(server = %self.identity, "cleanup guard dropped while armed");
        }
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
