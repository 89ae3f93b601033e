// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotent guest bootstrap.
//!
//! ```text
//! sessions ─▶ sentinel? ──yes──▶ skip
//!                │ no
//!                ▼
//! apt ─▶ agent ─▶ credential ─▶ work dirs ─▶ recipe ─▶ uploads ─▶ mount ─▶ sentinel
//! ```

use super::{write_vars_document, DeployError};
use crate::executor::RemoteExecutor;
use ham_adapters::RemoteHost;
use ham_core::{guest, BuildIdentity, FileUpload, RecipeOrigin, VarsDocument};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const APT_ENV: &str = "DEBIAN_FRONTEND=noninteractive";
const APT_PACKAGES: &str = "git wget curl";

/// Where the guest gets the build agent binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentSource {
    /// Downloaded on the guest from a release URL.
    Release(String),
    /// Uploaded from the local machine.
    Local(PathBuf),
}

/// Everything bootstrap puts on the guest.
#[derive(Debug, Clone)]
pub struct BootstrapPlan {
    pub identity: BuildIdentity,
    pub origin: RecipeOrigin,
    /// Local recipe tree, mirrored when `origin` is local.
    pub recipe_dir: PathBuf,
    pub vars_document: VarsDocument,
    pub uploads: Vec<FileUpload>,
    /// Local credential file mirrored to the guest.
    pub credential_file: PathBuf,
    pub agent: AgentSource,
    /// Data volume device, when one is attached.
    pub volume_device: Option<String>,
}

/// What bootstrap did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapReport {
    /// False when the guest was already initialized.
    pub ran: bool,
}

/// Bring the guest to the initialized state. Sessions are closed on every
/// path; a failed step aborts without rollback.
pub async fn bootstrap<H: RemoteHost>(
    exec: &RemoteExecutor<H>,
    plan: &BootstrapPlan,
) -> Result<BootstrapReport, DeployError> {
    let result = run_steps(exec, plan).await;
    exec.close().await;
    result
}

async fn run_steps<H: RemoteHost>(
    exec: &RemoteExecutor<H>,
    plan: &BootstrapPlan,
) -> Result<BootstrapReport, DeployError> {
    exec.open_shell().await?;
    exec.open_files().await?;

    if exec.probe(&guest::sentinel_probe()).await? {
        tracing::info!(server = %plan.identity, "guest already initialized");
        return Ok(BootstrapReport { ran: false });
    }
    tracing::info!(server = %plan.identity, address = exec.address(), "bootstrapping guest");

    exec.run(&format!("{APT_ENV} apt-get update -y")).await?;
    exec.run(&format!("{APT_ENV} apt-get upgrade -y -o Dpkg::Options::=--force-confold")).await?;
    exec.run(&format!("{APT_ENV} apt-get install -y {APT_PACKAGES}")).await?;

    match &plan.agent {
        AgentSource::Release(url) => {
            exec.run(&format!("wget -q -O {} {}", guest::AGENT_PATH, guest::shell_quote(url)))
                .await?;
        }
        AgentSource::Local(path) => exec.upload(path, guest::AGENT_PATH).await?,
    }
    exec.run(&format!("chmod a+x {}", guest::AGENT_PATH)).await?;

    exec.upload(&plan.credential_file, guest::CREDENTIAL_PATH).await?;

    exec.run(&format!("mkdir -p {}", guest::WORK_DIRS.join(" "))).await?;

    match &plan.origin {
        RecipeOrigin::Git(remote) => {
            for command in guest::clone_commands(&remote.url, remote.branch.as_deref()) {
                exec.run(&command).await?;
            }
        }
        RecipeOrigin::Local(_) => mirror_tree(exec, &plan.recipe_dir, guest::RECIPE_DIR).await?,
    }

    for upload in &plan.uploads {
        exec.upload(&upload.local, &upload.remote).await?;
    }
    let scratch = tempfile::tempdir()?;
    let vars_file = write_vars_document(&plan.vars_document, scratch.path(), &plan.identity)?;
    exec.upload(&vars_file, guest::VARS_PATH).await?;
    drop(scratch);

    if let Some(device) = &plan.volume_device {
        if !exec.probe(&guest::mountpoint_probe()).await? {
            for command in guest::mount_commands(device) {
                exec.run(&command).await?;
            }
            tracing::info!(%device, "build volume mounted");
        }
    }

    exec.run(&format!("touch {}", guest::INIT_SENTINEL)).await?;
    tracing::info!(server = %plan.identity, "bootstrap finished");
    Ok(BootstrapReport { ran: true })
}

/// Copy a local tree below `remote_root`, skipping `.git`.
async fn mirror_tree<H: RemoteHost>(
    exec: &RemoteExecutor<H>,
    local_root: &Path,
    remote_root: &str,
) -> Result<(), DeployError> {
    let walker = WalkDir::new(local_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");
    let mut files = 0usize;
    for entry in walker {
        let entry = entry?;
        let relative = entry.path().strip_prefix(local_root).unwrap_or(entry.path());
        if relative.as_os_str().is_empty() {
            continue;
        }
        let remote = format!("{remote_root}/{}", relative.to_string_lossy().replace('\\', "/"));
        if entry.file_type().is_dir() {
            exec.mkdir_all(&remote).await?;
        } else if entry.file_type().is_file() {
            exec.upload(entry.path(), &remote).await?;
            files += 1;
        }
    }
    tracing::info!(files, root = remote_root, "recipe mirrored");
    Ok(())
}

/// Start the build agent detached on the guest.
pub async fn start_build<H: RemoteHost>(
    exec: &RemoteExecutor<H>,
    content_hash: &str,
    keep_server: bool,
) -> Result<(), DeployError> {
    let result = exec.run(&guest::build_command(content_hash, keep_server)).await;
    exec.close().await;
    result?;
    tracing::info!(keep_server, "remote build started");
    Ok(())
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
