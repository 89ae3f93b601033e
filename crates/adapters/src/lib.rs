// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ham-adapters: I/O seams for the ham remote build orchestrator
//!
//! Every external collaborator sits behind a trait with one real adapter and,
//! with the `test-support` feature, one in-memory fake.

pub mod cloud;
pub mod display;
pub mod git;
pub mod labels;
pub mod prompt;
pub mod recipe_parser;
pub mod remote;

pub use cloud::{
    Action, ActionStatus, CloudError, CloudProvider, Created, HetznerClient, Price, Server,
    ServerRequest, ServerStatus, ServerType, SshKey, Volume, VolumeRequest,
};
pub use display::{ProgressDisplay, TerminalDisplay};
pub use git::{GitCli, GitClient, GitError};
pub use labels::{LabelError, LabelStore, SshKeyLabelStore};
pub use prompt::{PromptError, Prompter, TerminalPrompter};
pub use recipe_parser::{RecipeError, RecipeParser, TomlRecipeParser};
pub use remote::{
    CommandOutput, FileSession, RemoteError, RemoteHost, ShellSession, SshRemote,
};

#[cfg(any(test, feature = "test-support"))]
pub use cloud::{CloudCall, FakeCloudProvider};
#[cfg(any(test, feature = "test-support"))]
pub use display::{DisplayEvent, FakeDisplay};
#[cfg(any(test, feature = "test-support"))]
pub use git::{CloneCall, FakeGitClient};
#[cfg(any(test, feature = "test-support"))]
pub use labels::FakeLabelStore;
#[cfg(any(test, feature = "test-support"))]
pub use prompt::{FakePrompter, PromptCall};
#[cfg(any(test, feature = "test-support"))]
pub use recipe_parser::FakeRecipeParser;
#[cfg(any(test, feature = "test-support"))]
pub use remote::{FakeRemote, RemoteCall};
