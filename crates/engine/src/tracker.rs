// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote build tracking.
//!
//! A log tail task streams the build log for display while the completion
//! probe runs `ham progress --json` until the remote build terminates.
//! Probe failures are retried per failure class; exhausting a class ends
//! in a keep-or-destroy decision. After a clean probe the recorded label
//! decides the outcome.

use crate::cleanup::CleanupGuard;
use crate::retry::retry;
use ham_adapters::{
    CloudProvider, LabelStore, ProgressDisplay, RemoteError, RemoteHost, ShellSession,
};
use ham_core::{
    destroy_decision, guest, probe_policy, BuildIdentity, BuildOutcome, Decision, FailureClass,
    KeepFlags, RemoteState, RemoteStatus, RetryPolicy, ServerFate,
};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const LINE_BUFFER: usize = 256;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("{class}: {message}")]
    Failed { class: FailureClass, message: String, fate: ServerFate },
    #[error("cannot determine build status")]
    Undetermined { fate: ServerFate },
}

impl TrackError {
    pub fn class(&self) -> FailureClass {
        match self {
            TrackError::Failed { class, .. } => *class,
            TrackError::Undetermined { .. } => FailureClass::Other,
        }
    }

    pub fn fate(&self) -> ServerFate {
        match self {
            TrackError::Failed { fate, .. } | TrackError::Undetermined { fate } => *fate,
        }
    }
}

/// How a tracked build ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    Succeeded,
    /// The label still reads in progress; the server is left running.
    InProgress,
}

/// Follows one remote build to completion.
pub struct Tracker<H, L, D> {
    host: H,
    address: String,
    labels: L,
    display: D,
    identity: BuildIdentity,
    keep: KeepFlags,
}

impl<H, L, D> Tracker<H, L, D>
where
    H: RemoteHost,
    L: LabelStore,
    D: ProgressDisplay,
{
    pub fn new(
        host: H,
        address: impl Into<String>,
        labels: L,
        display: D,
        identity: BuildIdentity,
        keep: KeepFlags,
    ) -> Self {
        Self { host, address: address.into(), labels, display, identity, keep }
    }

    /// Track the build, with the log tail running for the duration of the
    /// probe loop.
    pub async fn track<P: CloudProvider>(
        &self,
        guard: &CleanupGuard<P>,
    ) -> Result<TrackOutcome, TrackError> {
        let tail = LogTail::start(self.host.clone(), self.address.clone(), self.display.clone());
        let probed = self.probe_loop(guard).await;
        tail.stop().await;
        probed?;

        guard.disarm("remote build finished");
        self.poll_label(guard).await
    }

    async fn probe_loop<P: CloudProvider>(
        &self,
        guard: &CleanupGuard<P>,
    ) -> Result<(), TrackError> {
        let mut failures: HashMap<FailureClass, u32> = HashMap::new();
        loop {
            let err = match self.probe_once().await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            let policy = probe_policy(err.class);
            let count = failures.entry(err.class).or_insert(0);
            *count += 1;
            match policy.retry {
                Some(retry) if *count < retry.attempts => {
                    tracing::warn!(
                        class = %err.class,
                        attempt = *count,
                        attempts = retry.attempts,
                        error = %err.message,
                        "progress probe failed, retrying"
                    );
                    tokio::time::sleep(retry.backoff).await;
                }
                _ => return Err(self.fail(guard, err.class, err.message).await),
            }
        }
    }

    /// One run of the progress command on a fresh shell.
    async fn probe_once(&self) -> Result<(), RemoteError> {
        let mut shell = self.host.open_shell(&self.address).await?;
        let (tx, mut rx) = mpsc::channel::<String>(LINE_BUFFER);
        let display = &self.display;

        let consume = async move {
            while let Some(line) = rx.recv().await {
                if line.trim().is_empty() {
                    continue;
                }
                let status = RemoteStatus::parse(&line)
                    .map_err(|e| RemoteError::new(FailureClass::MalformedStatus, e.to_string()))?;
                display.status(&status);
                if status.status == RemoteState::Failed {
                    let message =
                        status.message.unwrap_or_else(|| "remote build reported failure".into());
                    return Err(RemoteError::new(FailureClass::BuildFailed, message));
                }
            }
            Ok(())
        };
        let (streamed, consumed) =
            tokio::join!(shell.stream(guest::PROGRESS_COMMAND, tx), consume);
        shell.close().await;

        consumed?;
        match streamed? {
            Some(0) | None => Ok(()),
            Some(code) => Err(RemoteError::other(format!("progress exited with status {code}"))),
        }
    }

    async fn poll_label<P: CloudProvider>(
        &self,
        guard: &CleanupGuard<P>,
    ) -> Result<TrackOutcome, TrackError> {
        let policy = RetryPolicy::LABEL_POLL;
        for attempt in 1..=policy.attempts {
            match self.labels.get(self.identity.as_str()).await {
                Ok(value) => match BuildOutcome::from_label(value.as_deref()) {
                    BuildOutcome::Successful => {
                        tracing::info!(server = %self.identity, "build successful");
                        return Ok(TrackOutcome::Succeeded);
                    }
                    BuildOutcome::InProgress => {
                        self.display.notice(&format!(
                            "build on {} is still in progress, server left running",
                            self.identity
                        ));
                        return Ok(TrackOutcome::InProgress);
                    }
                    BuildOutcome::Failed => {
                        let message = format!("build recorded as {}", value.unwrap_or_default());
                        return Err(self.fail(guard, FailureClass::BuildFailed, message).await);
                    }
                    BuildOutcome::Unknown => {
                        tracing::debug!(attempt, "no build label yet");
                    }
                },
                Err(e) => tracing::warn!(attempt, error = %e, "label read failed"),
            }
            if attempt < policy.attempts {
                tokio::time::sleep(policy.backoff).await;
            }
        }
        Err(TrackError::Undetermined { fate: guard.fate() })
    }

    async fn fail<P: CloudProvider>(
        &self,
        guard: &CleanupGuard<P>,
        class: FailureClass,
        message: String,
    ) -> TrackError {
        let fate = match destroy_decision(class, self.keep) {
            Decision::Destroy => {
                // Stays armed until destroyed, leaving the exit hook a retry.
                guard.arm();
                guard.destroy_now().await
            }
            Decision::Keep => {
                guard.disarm(&format!("keep flag covers {class}"));
                ServerFate::Kept
            }
        };
        tracing::error!(server = %self.identity, %class, %fate, error = %message, "tracking failed");
        TrackError::Failed { class, message, fate }
    }
}

/// Background task streaming the build log to the display.
struct LogTail {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl LogTail {
    fn start<H: RemoteHost, D: ProgressDisplay>(host: H, address: String, display: D) -> Self {
        let (shutdown, rx) = oneshot::channel();
        let handle = tokio::spawn(tail_log(host, address, display, rx));
        Self { shutdown, handle }
    }

    async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "log tail task failed");
        }
    }
}

async fn tail_log<H: RemoteHost, D: ProgressDisplay>(
    host: H,
    address: String,
    display: D,
    mut shutdown: oneshot::Receiver<()>,
) {
    let host = &host;
    let addr = address.as_str();
    let opened = tokio::select! {
        _ = &mut shutdown => return,
        opened = retry(RetryPolicy::PROBE_CONNECTION, "open log tail", move |_| async move {
            host.open_shell(addr).await
        }) => opened,
    };
    let mut shell = match opened {
        Ok(shell) => shell,
        Err(e) => {
            tracing::warn!(error = %e, "log tail unavailable");
            return;
        }
    };

    let command = guest::tail_command();
    {
        let (tx, mut rx) = mpsc::channel::<String>(LINE_BUFFER);
        let stream = shell.stream(&command, tx);
        tokio::pin!(stream);
        let mut streaming = true;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                line = rx.recv() => match line {
                    Some(line) => display.log_line(&line),
                    None => break,
                },
                result = &mut stream, if streaming => {
                    streaming = false;
                    if let Err(e) = result {
                        tracing::debug!(error = %e, "log tail ended");
                    }
                }
            }
        }
    }
    shell.close().await;
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
