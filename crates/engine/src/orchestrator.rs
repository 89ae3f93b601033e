// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ham get`: one recipe in, one tracked remote build out.
//!
//! ```text
//! resolve ─▶ parse ─▶ vars ─▶ verify key ─▶ reap ─▶ find ──found──▶ bootstrap? ─▶ track
//!                                                     │ absent          ▲
//!                                                     ▼                 │
//!                                label check ─▶ type ─▶ confirm ─▶ create
//! ```
//!
//! Variables are collected before the first network call. The cleanup
//! guard runs after the flow finishes, fails or is cancelled.

use crate::cleanup::CleanupGuard;
use crate::deploy::{
    bootstrap, collect_variables, start_build, AgentSource, Answers, BootstrapPlan, DeployError,
};
use crate::executor::RemoteExecutor;
use crate::lifecycle::{LifecycleError, ServerLifecycle, ServerRef};
use crate::source::{resolve_recipe, ResolvedRecipe, SourceError};
use crate::tracker::{TrackError, TrackOutcome, Tracker};
use ham_adapters::{
    CloudProvider, GitClient, LabelError, LabelStore, ProgressDisplay, PromptError, Prompter,
    RecipeError, RecipeParser, RemoteHost,
};
use ham_core::{
    destroy_decision, guest, BuildIdentity, BuildVariables, Decision, FailureClass, KeepFlags,
    Recipe, ServerFate,
};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Options for one `ham get` run.
#[derive(Debug, Clone)]
pub struct GetOptions {
    /// Local directory, git URL or `user@gh/repo[:branch]` shorthand.
    pub recipe: String,
    pub keep: KeepFlags,
    pub no_confirm: bool,
    /// Build again even if a status is already recorded for this recipe.
    pub force: bool,
    /// Use this address instead of a cloud server; nothing is created or deleted.
    pub testing_ssh_ip: Option<String>,
    pub answers: Option<Answers>,
    /// Gross hourly price ceiling for the server type.
    pub max_price: Option<f64>,
    pub agent: AgentSource,
    /// Local credential file mirrored to the guest.
    pub credential_file: PathBuf,
    /// Public half of the configured SSH key pair.
    pub public_key: String,
}

impl GetOptions {
    pub fn new(
        recipe: impl Into<String>,
        agent: AgentSource,
        credential_file: impl Into<PathBuf>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            recipe: recipe.into(),
            keep: KeepFlags::default(),
            no_confirm: false,
            force: false,
            testing_ssh_ip: None,
            answers: None,
            max_price: None,
            agent,
            credential_file: credential_file.into(),
            public_key: public_key.into(),
        }
    }

    ham_core::setters! {
        set {
            keep: KeepFlags,
            no_confirm: bool,
            force: bool,
        }
        option {
            testing_ssh_ip: String,
            answers: Answers,
            max_price: f64,
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestrateError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Recipe(#[from] RecipeError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Labels(#[from] LabelError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Deploy(#[from] DeployError),
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error("a {status} build already ran for this recipe, run with --force to build again")]
    AlreadyBuilt { status: String },
    #[error("declined to create a new server")]
    Declined,
    #[error("interrupted")]
    Interrupted,
}

impl OrchestrateError {
    pub fn class(&self) -> FailureClass {
        match self {
            OrchestrateError::Deploy(DeployError::Remote(e)) => e.class,
            OrchestrateError::Track(e) => e.class(),
            _ => FailureClass::Other,
        }
    }
}

/// A failed run: what went wrong and what became of the server.
#[derive(Debug, Error)]
#[error("{source}{}", fate_suffix(.fate))]
pub struct GetError {
    pub source: OrchestrateError,
    pub class: FailureClass,
    /// `None` when no server was involved.
    pub fate: Option<ServerFate>,
}

fn fate_suffix(fate: &Option<ServerFate>) -> String {
    match fate {
        Some(fate) => format!(" ({fate})"),
        None => String::new(),
    }
}

/// A finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetReport {
    pub identity: BuildIdentity,
    pub address: String,
    pub outcome: TrackOutcome,
}

/// Collaborators for the orchestrator.
pub struct OrchestratorDeps<P, L, H, G, R, D> {
    pub cloud: P,
    pub labels: L,
    pub remote: H,
    pub git: G,
    pub parser: R,
    pub display: D,
    pub prompter: Arc<dyn Prompter>,
}

pub struct Orchestrator<P: CloudProvider, L, H, G, R, D> {
    lifecycle: ServerLifecycle<P>,
    labels: L,
    remote: H,
    git: G,
    parser: R,
    display: D,
    prompter: Arc<dyn Prompter>,
}

struct Prepared {
    resolved: ResolvedRecipe,
    recipe: Recipe,
    identity: BuildIdentity,
    vars: BuildVariables,
}

impl<P, L, H, G, R, D> Orchestrator<P, L, H, G, R, D>
where
    P: CloudProvider,
    L: LabelStore,
    H: RemoteHost,
    G: GitClient,
    R: RecipeParser,
    D: ProgressDisplay,
{
    pub fn new(deps: OrchestratorDeps<P, L, H, G, R, D>) -> Self {
        Self {
            lifecycle: ServerLifecycle::new(deps.cloud),
            labels: deps.labels,
            remote: deps.remote,
            git: deps.git,
            parser: deps.parser,
            display: deps.display,
            prompter: deps.prompter,
        }
    }

    /// Run `ham get` to completion or until `cancel` resolves. The cleanup
    /// guard runs on every path.
    pub async fn run<C>(&self, options: &GetOptions, cancel: C) -> Result<GetReport, GetError>
    where
        C: Future<Output = ()>,
    {
        tokio::pin!(cancel);
        let prepared = tokio::select! {
            prepared = self.prepare(options) => prepared,
            () = &mut cancel => Err(OrchestrateError::Interrupted),
        };
        let prepared =
            prepared.map_err(|source| GetError { class: source.class(), source, fate: None })?;

        let mut guard = CleanupGuard::new(self.lifecycle.clone(), prepared.identity.clone());
        if options.testing_ssh_ip.is_some() {
            guard = guard.protected();
        }
        let server_known = AtomicBool::new(false);

        let result = tokio::select! {
            result = self.drive(options, &prepared, &guard, &server_known) => result,
            () = &mut cancel => {
                tracing::warn!(server = %prepared.identity, "interrupted");
                Err(OrchestrateError::Interrupted)
            }
        };
        let exit_fate = guard.run().await;

        result.map_err(|source| {
            let fate = server_known
                .load(Ordering::SeqCst)
                .then(|| exit_fate.unwrap_or_else(|| guard.fate()));
            GetError { class: source.class(), source, fate }
        })
    }

    async fn prepare(&self, options: &GetOptions) -> Result<Prepared, OrchestrateError> {
        let resolved = resolve_recipe(&options.recipe, &self.git).await?;
        let recipe = self.parser.parse(&resolved.dir)?;
        let identity = recipe.identity();
        tracing::info!(
            title = %recipe.title,
            version = %recipe.version,
            hash = %recipe.content_hash,
            server = %identity,
            "recipe parsed"
        );
        self.display.notice(&format!("{} {} ({identity})", recipe.title, recipe.version));
        let vars = collect_variables(
            &recipe,
            options.answers.as_ref(),
            options.no_confirm,
            self.prompter.as_ref(),
        )?;
        self.lifecycle.verify_ssh_key(&options.public_key).await?;
        Ok(Prepared { resolved, recipe, identity, vars })
    }

    async fn drive(
        &self,
        options: &GetOptions,
        prepared: &Prepared,
        guard: &CleanupGuard<P>,
        known: &AtomicBool,
    ) -> Result<GetReport, OrchestrateError> {
        let identity = &prepared.identity;
        let testing = options.testing_ssh_ip.as_deref();

        let existing = match testing {
            Some(_) => None,
            None => {
                let reaped = self.lifecycle.reap_dead_servers().await?;
                if reaped > 0 {
                    self.display.notice(&format!("removed {reaped} powered-off build server(s)"));
                }
                self.lifecycle.find_existing(identity).await?
            }
        };

        let (server, fresh) = match existing {
            Some(server) => {
                self.display.notice(&format!("active build found on {}", server.address));
                self.claim(options, guard, known);
                (server, false)
            }
            None => {
                self.check_not_built(options, identity).await?;
                let server = match testing {
                    Some(ip) => {
                        self.claim(options, guard, known);
                        ServerRef { id: 0, identity: identity.clone(), address: test_address(ip) }
                    }
                    None => self.create(options, guard, known, identity).await?,
                };
                (server, true)
            }
        };

        let exec = RemoteExecutor::new(self.remote.clone(), server.address.clone());
        let deployed = self.deploy_if_needed(options, prepared, &exec, fresh).await;
        exec.close().await;
        if let Err(err) = deployed {
            return Err(self.settle_deploy_failure(guard, options.keep, err).await);
        }

        let tracker = Tracker::new(
            self.remote.clone(),
            server.address.clone(),
            self.labels.clone(),
            self.display.clone(),
            identity.clone(),
            options.keep,
        );
        let outcome = tracker.track(guard).await?;
        Ok(GetReport { identity: identity.clone(), address: server.address, outcome })
    }

    /// Note that a server is involved and arm the guard unless the user
    /// keeps it.
    fn claim(&self, options: &GetOptions, guard: &CleanupGuard<P>, known: &AtomicBool) {
        known.store(true, Ordering::SeqCst);
        if !options.keep.keep {
            guard.arm();
        }
    }

    /// A new build needs no recorded status, unless forced.
    async fn check_not_built(
        &self,
        options: &GetOptions,
        identity: &BuildIdentity,
    ) -> Result<(), OrchestrateError> {
        if options.force || options.testing_ssh_ip.is_some() {
            return Ok(());
        }
        match self.labels.get(identity.as_str()).await? {
            Some(status) => Err(OrchestrateError::AlreadyBuilt { status }),
            None => Ok(()),
        }
    }

    async fn create(
        &self,
        options: &GetOptions,
        guard: &CleanupGuard<P>,
        known: &AtomicBool,
        identity: &BuildIdentity,
    ) -> Result<ServerRef, OrchestrateError> {
        let (price, server_type) = self.lifecycle.select_server_type(options.max_price).await?;
        self.display.notice(&format!(
            "server type {} at {price:.4}/h (gross)",
            server_type.name.to_uppercase()
        ));
        if !options.no_confirm && !self.prompter.confirm("Create a new build server?")? {
            return Err(OrchestrateError::Declined);
        }

        // Armed before the create call so a half-created server is cleaned up.
        self.claim(options, guard, known);
        Ok(self.lifecycle.create_server(identity, &server_type.name).await?)
    }

    /// New servers are always deployed; existing ones only when the guest
    /// never finished initializing.
    async fn deploy_if_needed(
        &self,
        options: &GetOptions,
        prepared: &Prepared,
        exec: &RemoteExecutor<H>,
        fresh: bool,
    ) -> Result<(), OrchestrateError> {
        if !fresh {
            if self.guest_initialized(exec).await? {
                return Ok(());
            }
            tracing::info!(server = %prepared.identity, "existing server was never initialized");
        }
        self.deploy(options, prepared, exec).await
    }

    /// Connection failures before tracking are terminal. The keep flags
    /// decide the server's fate the same way they do while tracking.
    async fn settle_deploy_failure(
        &self,
        guard: &CleanupGuard<P>,
        keep: KeepFlags,
        err: OrchestrateError,
    ) -> OrchestrateError {
        let class = err.class();
        if !class.is_connection() {
            return err;
        }
        let fate = match destroy_decision(class, keep) {
            Decision::Destroy => {
                guard.arm();
                guard.destroy_now().await
            }
            Decision::Keep => {
                guard.disarm(&format!("keep flag covers {class}"));
                ServerFate::Kept
            }
        };
        tracing::error!(server = %guard.identity(), %class, %fate, error = %err, "deploy failed");
        err
    }

    async fn guest_initialized(&self, exec: &RemoteExecutor<H>) -> Result<bool, DeployError> {
        exec.open_shell().await?;
        Ok(exec.probe(&guest::sentinel_probe()).await?)
    }

    async fn deploy(
        &self,
        options: &GetOptions,
        prepared: &Prepared,
        exec: &RemoteExecutor<H>,
    ) -> Result<(), OrchestrateError> {
        let volume_device = match options.testing_ssh_ip {
            Some(_) => None,
            None => self.lifecycle.volume_device_for(&prepared.identity).await?,
        };
        let (vars_document, uploads) = prepared.vars.to_document();
        let plan = BootstrapPlan {
            identity: prepared.identity.clone(),
            origin: prepared.resolved.origin.clone(),
            recipe_dir: prepared.resolved.dir.clone(),
            vars_document,
            uploads,
            credential_file: options.credential_file.clone(),
            agent: options.agent.clone(),
            volume_device,
        };
        let report = bootstrap(exec, &plan).await?;
        if report.ran {
            start_build(exec, &prepared.recipe.content_hash, options.keep.agent_keep_hint())
                .await?;
            self.display.notice(&format!("build started on {}", exec.address()));
        } else {
            tracing::info!(server = %prepared.identity, "guest already initialized, not restarting");
        }
        Ok(())
    }
}

/// SSH address for a test server given as an IP, `ip:port` or host name.
fn test_address(ip: &str) -> String {
    if ip.parse::<SocketAddr>().is_ok() {
        return ip.to_string();
    }
    match ip.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
        Ok(addr) => SocketAddr::new(addr, 22).to_string(),
        Err(_) => format!("{ip}:22"),
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
