// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive prompts.
//!
//! Prompting blocks on the terminal; it only happens before any remote work
//! starts, so the trait is synchronous.

use thiserror::Error;

/// Errors from prompting the user
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt failed: {0}")]
    Io(String),
}

/// Adapter for asking the user questions
pub trait Prompter: Send + Sync {
    /// Ask for a value. Secret answers are not echoed.
    fn ask(&self, prompt: &str, secret: bool) -> Result<String, PromptError>;

    /// Ask a yes/no question. Defaults to no.
    fn confirm(&self, prompt: &str) -> Result<bool, PromptError>;
}

/// Prompter on the controlling terminal.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&self, prompt: &str, secret: bool) -> Result<String, PromptError> {
        let answer = if secret {
            dialoguer::Password::new().with_prompt(prompt).allow_empty_password(true).interact()
        } else {
            dialoguer::Input::<String>::new().with_prompt(prompt).allow_empty(true).interact_text()
        };
        answer.map_err(|e| PromptError::Io(e.to_string()))
    }

    fn confirm(&self, prompt: &str) -> Result<bool, PromptError> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| PromptError::Io(e.to_string()))
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{PromptError, Prompter};
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    /// Recorded question
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum PromptCall {
        Ask { prompt: String, secret: bool },
        Confirm(String),
    }

    #[derive(Default)]
    struct FakePromptState {
        answers: HashMap<String, String>,
        confirms: VecDeque<bool>,
        calls: Vec<PromptCall>,
    }

    /// Fake prompter for testing
    ///
    /// Unscripted questions are answered with an empty string; unscripted
    /// confirmations with yes.
    #[derive(Clone, Default)]
    pub struct FakePrompter {
        inner: Arc<Mutex<FakePromptState>>,
    }

    impl FakePrompter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer the question with this prompt text.
        pub fn answer(self, prompt: &str, value: &str) -> Self {
            self.inner.lock().answers.insert(prompt.to_string(), value.to_string());
            self
        }

        /// Queue the next confirmation answer.
        pub fn confirm_with(self, yes: bool) -> Self {
            self.inner.lock().confirms.push_back(yes);
            self
        }

        /// Get all recorded questions
        pub fn calls(&self) -> Vec<PromptCall> {
            self.inner.lock().calls.clone()
        }
    }

    impl Prompter for FakePrompter {
        fn ask(&self, prompt: &str, secret: bool) -> Result<String, PromptError> {
            let mut state = self.inner.lock();
            state.calls.push(PromptCall::Ask { prompt: prompt.to_string(), secret });
            Ok(state.answers.get(prompt).cloned().unwrap_or_default())
        }

        fn confirm(&self, prompt: &str) -> Result<bool, PromptError> {
            let mut state = self.inner.lock();
            state.calls.push(PromptCall::Confirm(prompt.to_string()));
            Ok(state.confirms.pop_front().unwrap_or(true))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakePrompter, PromptCall};
