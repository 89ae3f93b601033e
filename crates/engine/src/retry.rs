// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded retry with a fixed pause.

use ham_core::RetryPolicy;
use std::fmt::Display;
use std::future::Future;

/// Run `op` until it succeeds or the policy's attempts are used up.
///
/// `op` receives the 1-based attempt number. The last error is returned.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, what: &str, op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_when(policy, what, |_| true, op).await
}

/// Like [`retry`], but errors for which `retryable` is false are returned
/// immediately.
pub async fn retry_when<T, E, F, Fut, P>(
    policy: RetryPolicy,
    what: &str,
    retryable: P,
    mut op: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(what, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < policy.attempts && retryable(&e) => {
                tracing::warn!(
                    what,
                    attempt,
                    attempts = policy.attempts,
                    error = %e,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::debug!(what, attempt, error = %e, "giving up");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
