// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing progress output.

use ham_core::{RemoteState, RemoteStatus};
use std::io::Write;

/// Adapter for showing build progress
pub trait ProgressDisplay: Clone + Send + Sync + 'static {
    /// One line of the remote build log.
    fn log_line(&self, line: &str);

    /// A parsed status update from the remote agent.
    fn status(&self, status: &RemoteStatus);

    /// A message from the orchestrator itself.
    fn notice(&self, message: &str);
}

/// Format a status update for humans.
pub fn format_status(status: &RemoteStatus) -> String {
    let state = match status.status {
        RemoteState::Running => "running",
        RemoteState::Successful => "successful",
        RemoteState::Failed => "failed",
    };
    let mut out = match status.progress {
        Some(pct) => format!("[{pct:>3}%] {state}"),
        None => format!("[----] {state}"),
    };
    if let Some(message) = status.message.as_deref().filter(|m| !m.is_empty()) {
        out.push_str(": ");
        out.push_str(message);
    }
    out
}

/// Display on stdout/stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalDisplay;

impl ProgressDisplay for TerminalDisplay {
    fn log_line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
    }

    fn status(&self, status: &RemoteStatus) {
        let _ = writeln!(std::io::stderr().lock(), "{}", format_status(status));
    }

    fn notice(&self, message: &str) {
        let _ = writeln!(std::io::stderr().lock(), "ham: {message}");
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::ProgressDisplay;
    use ham_core::RemoteStatus;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Recorded display event
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum DisplayEvent {
        Log(String),
        Status(RemoteStatus),
        Notice(String),
    }

    /// Fake display for testing
    #[derive(Clone, Default)]
    pub struct FakeDisplay {
        events: Arc<Mutex<Vec<DisplayEvent>>>,
    }

    impl FakeDisplay {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<DisplayEvent> {
            self.events.lock().clone()
        }

        pub fn log_lines(&self) -> Vec<String> {
            self.events
                .lock()
                .iter()
                .filter_map(|e| match e {
                    DisplayEvent::Log(line) => Some(line.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn notices(&self) -> Vec<String> {
            self.events
                .lock()
                .iter()
                .filter_map(|e| match e {
                    DisplayEvent::Notice(msg) => Some(msg.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl ProgressDisplay for FakeDisplay {
        fn log_line(&self, line: &str) {
            self.events.lock().push(DisplayEvent::Log(line.to_string()));
        }

        fn status(&self, status: &RemoteStatus) {
            self.events.lock().push(DisplayEvent::Status(status.clone()));
        }

        fn notice(&self, message: &str) {
            self.events.lock().push(DisplayEvent::Notice(message.to_string()));
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{DisplayEvent, FakeDisplay};

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
