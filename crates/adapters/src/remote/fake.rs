// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory build server for tests.
//!
//! Understands just enough of the guest protocol (`test -f`, `mountpoint
//! -q`, `mount`, `touch`, `mkdir -p`) for bootstrap to behave idempotently.

use super::{CommandOutput, FileSession, RemoteError, RemoteHost, ShellSession};
use async_trait::async_trait;
use ham_core::guest;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Recorded remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    OpenShell(String),
    OpenFiles(String),
    Exec(String),
    Stream(String),
    Mkdir(String),
    Upload { local: PathBuf, remote: String },
    CloseShell,
    CloseFiles,
}

/// One scripted run of the progress command.
enum ProbeScript {
    Lines { lines: Vec<String>, exit_code: u32 },
    Fail(RemoteError),
}

struct CommandFailure {
    prefix: String,
    remaining: u32,
}

#[derive(Default)]
struct FakeRemoteState {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    mounted: bool,
    calls: Vec<RemoteCall>,
    connect_failures: VecDeque<RemoteError>,
    exec_failures: VecDeque<RemoteError>,
    command_failures: Vec<CommandFailure>,
    probes: VecDeque<ProbeScript>,
    tail_lines: Vec<String>,
}

impl FakeRemoteState {
    fn open(&mut self, call: RemoteCall) -> Result<(), RemoteError> {
        self.calls.push(call);
        match self.connect_failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn run(&mut self, command: &str) -> CommandOutput {
        if let Some(failure) = self
            .command_failures
            .iter_mut()
            .find(|f| f.remaining > 0 && command.starts_with(&f.prefix))
        {
            failure.remaining -= 1;
            return CommandOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr: "simulated failure".to_string(),
            };
        }

        let words: Vec<&str> = command.split_whitespace().collect();
        let exit_code = match words.as_slice() {
            ["test", "-f", path] => u32::from(!self.files.contains_key(unquote(path))),
            ["mountpoint", "-q", _] => u32::from(!self.mounted),
            ["mount", ..] => {
                self.mounted = true;
                0
            }
            ["touch", path] => {
                self.files.insert(unquote(path).to_string(), Vec::new());
                0
            }
            ["mkdir", "-p", dirs @ ..] => {
                self.dirs.extend(dirs.iter().map(|d| unquote(d).to_string()));
                0
            }
            _ => 0,
        };
        CommandOutput { exit_code, ..Default::default() }
    }
}

fn unquote(s: &str) -> &str {
    s.trim_matches('\'')
}

/// Fake remote host for testing
#[derive(Clone, Default)]
pub struct FakeRemote {
    inner: Arc<Mutex<FakeRemoteState>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next session opens (shell or files), in order.
    pub fn fail_connects(&self, errors: impl IntoIterator<Item = RemoteError>) {
        self.inner.lock().connect_failures.extend(errors);
    }

    /// Fail the next `exec` calls with errors, in order.
    pub fn fail_execs(&self, errors: impl IntoIterator<Item = RemoteError>) {
        self.inner.lock().exec_failures.extend(errors);
    }

    /// Make commands starting with `prefix` exit 1 the next `times` runs.
    pub fn fail_command(&self, prefix: &str, times: u32) {
        self.inner
            .lock()
            .command_failures
            .push(CommandFailure { prefix: prefix.to_string(), remaining: times });
    }

    /// Queue the output of the next progress command run.
    pub fn script_probe<'a>(&self, lines: impl IntoIterator<Item = &'a str>, exit_code: u32) {
        let lines = lines.into_iter().map(str::to_string).collect();
        self.inner.lock().probes.push_back(ProbeScript::Lines { lines, exit_code });
    }

    /// Queue a failing progress command run.
    pub fn script_probe_error(&self, error: RemoteError) {
        self.inner.lock().probes.push_back(ProbeScript::Fail(error));
    }

    pub fn set_tail_lines<'a>(&self, lines: impl IntoIterator<Item = &'a str>) {
        self.inner.lock().tail_lines = lines.into_iter().map(str::to_string).collect();
    }

    /// Mark the guest as already bootstrapped.
    pub fn mark_initialized(&self) {
        self.inner.lock().files.insert(guest::INIT_SENTINEL.to_string(), Vec::new());
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.inner.lock().files.contains_key(path)
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.lock().files.get(path).cloned()
    }

    /// Every uploaded or touched path.
    pub fn file_paths(&self) -> Vec<String> {
        self.inner.lock().files.keys().cloned().collect()
    }

    pub fn dirs(&self) -> Vec<String> {
        self.inner.lock().dirs.iter().cloned().collect()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.lock().mounted
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().calls.clone()
    }

    /// Commands passed to `exec`, in order.
    pub fn commands(&self) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RemoteCall::Exec(cmd) => Some(cmd.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RemoteHost for FakeRemote {
    type Shell = FakeShell;
    type Files = FakeFiles;

    async fn open_shell(&self, address: &str) -> Result<FakeShell, RemoteError> {
        self.inner.lock().open(RemoteCall::OpenShell(address.to_string()))?;
        Ok(FakeShell { inner: self.inner.clone() })
    }

    async fn open_files(&self, address: &str) -> Result<FakeFiles, RemoteError> {
        self.inner.lock().open(RemoteCall::OpenFiles(address.to_string()))?;
        Ok(FakeFiles { inner: self.inner.clone() })
    }
}

/// Shell session on a [`FakeRemote`].
pub struct FakeShell {
    inner: Arc<Mutex<FakeRemoteState>>,
}

#[async_trait]
impl ShellSession for FakeShell {
    async fn exec(&mut self, command: &str) -> Result<CommandOutput, RemoteError> {
        let mut state = self.inner.lock();
        state.calls.push(RemoteCall::Exec(command.to_string()));
        if let Some(err) = state.exec_failures.pop_front() {
            return Err(err);
        }
        Ok(state.run(command))
    }

    async fn stream(
        &mut self,
        command: &str,
        lines: mpsc::Sender<String>,
    ) -> Result<Option<u32>, RemoteError> {
        let (output, exit_code) = {
            let mut state = self.inner.lock();
            state.calls.push(RemoteCall::Stream(command.to_string()));
            if command == guest::PROGRESS_COMMAND {
                match state.probes.pop_front() {
                    Some(ProbeScript::Lines { lines, exit_code }) => (lines, exit_code),
                    Some(ProbeScript::Fail(err)) => return Err(err),
                    None => (vec![r#"{"status":"successful"}"#.to_string()], 0),
                }
            } else if command == guest::tail_command() {
                (state.tail_lines.clone(), 0)
            } else {
                (Vec::new(), state.run(command).exit_code)
            }
        };
        for line in output {
            if lines.send(line).await.is_err() {
                return Ok(None);
            }
        }
        Ok(Some(exit_code))
    }

    async fn close(&mut self) {
        self.inner.lock().calls.push(RemoteCall::CloseShell);
    }
}

/// File session on a [`FakeRemote`].
pub struct FakeFiles {
    inner: Arc<Mutex<FakeRemoteState>>,
}

#[async_trait]
impl FileSession for FakeFiles {
    async fn mkdir_all(&mut self, path: &str) -> Result<(), RemoteError> {
        let mut state = self.inner.lock();
        state.calls.push(RemoteCall::Mkdir(path.to_string()));
        state.dirs.insert(path.to_string());
        Ok(())
    }

    async fn upload(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        let contents = std::fs::read(local)
            .map_err(|e| RemoteError::other(format!("open {}: {e}", local.display())))?;
        let mut state = self.inner.lock();
        state
            .calls
            .push(RemoteCall::Upload { local: local.to_path_buf(), remote: remote.to_string() });
        state.files.insert(remote.to_string(), contents);
        Ok(())
    }

    async fn close(&mut self) {
        self.inner.lock().calls.push(RemoteCall::CloseFiles);
    }
}
