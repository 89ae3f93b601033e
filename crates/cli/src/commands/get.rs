// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ham get` - build a recipe on a cloud server

use crate::config::Config;
use crate::env;
use crate::exit_error::ExitError;
use anyhow::{Context, Result};
use clap::Args;
use ham_adapters::{
    GitCli, HetznerClient, SshKeyLabelStore, SshRemote, TerminalDisplay, TerminalPrompter,
    TomlRecipeParser,
};
use ham_core::KeepFlags;
use ham_engine::lifecycle::SSH_KEY_NAME;
use ham_engine::{
    AgentSource, Answers, GetOptions, Orchestrator, OrchestratorDeps, TrackOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;

/// SSH user on build servers.
const SSH_USER: &str = "root";

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Recipe directory, git URL or `user@gh/repo[:branch]` shorthand
    pub recipe: String,

    /// Answer yes to every question (use with caution)
    #[arg(short = 'n', long)]
    pub no_confirm: bool,

    /// Never destroy the server on error
    #[arg(short = 'k', long)]
    pub keep_server: bool,

    /// Keep the server when it cannot be reached over SSH
    #[arg(short = 's', long = "keep-server-conn-fail")]
    pub keep_server_conn_fail: bool,

    /// Keep the server when tracking fails
    #[arg(short = 't', long = "keep-server-track-fail")]
    pub keep_server_track_fail: bool,

    /// Keep the server when the build fails (use with caution)
    #[arg(short = 'b', long = "keep-server-build-fail")]
    pub keep_server_build_fail: bool,

    /// Test run against this host instead of a new server (developer)
    #[arg(short = 'i', long, value_name = "IP")]
    pub testing_ssh_ip: Option<String>,

    /// Build even if this recipe was built already
    #[arg(short = 'f', long)]
    pub force: bool,

    /// JSON object of argument answers, keyed by argument id
    #[arg(long, value_name = "FILE")]
    pub answers: Option<PathBuf>,

    /// Highest gross hourly price for the server type
    #[arg(long, value_name = "PRICE")]
    pub max_price: Option<f64>,

    /// Upload this agent binary instead of downloading a release
    #[arg(long, value_name = "PATH")]
    pub agent_binary: Option<PathBuf>,
}

impl GetArgs {
    pub fn keep_flags(&self) -> KeepFlags {
        KeepFlags {
            keep: self.keep_server,
            on_connect_fail: self.keep_server_conn_fail,
            on_track_fail: self.keep_server_track_fail,
            on_build_fail: self.keep_server_build_fail,
        }
    }

    /// Options for the orchestrator, reading the answers file if given.
    pub fn options(&self, config: &Config, agent_url: String) -> Result<GetOptions> {
        let agent = match &self.agent_binary {
            Some(path) => AgentSource::Local(path.clone()),
            None => AgentSource::Release(agent_url),
        };
        let mut options =
            GetOptions::new(&self.recipe, agent, config.path.clone(), config.public_key()?)
                .keep(self.keep_flags())
                .no_confirm(self.no_confirm)
                .force(self.force);
        if let Some(ip) = &self.testing_ssh_ip {
            options = options.testing_ssh_ip(ip);
        }
        if let Some(price) = self.max_price {
            options = options.max_price(price);
        }
        if let Some(path) = &self.answers {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read answers file {}", path.display()))?;
            options = options.answers(Answers::parse(&text)?);
        }
        Ok(options)
    }
}

pub async fn get(args: GetArgs) -> Result<()> {
    let config = Config::load(&env::config_path()?)?;
    let options = args.options(&config, env::agent_url())?;

    let cloud = HetznerClient::with_base_url(&config.api_key, env::api_url())?;
    let remote = SshRemote::new(SSH_USER, &config.private_key()?)?;
    let orchestrator = Orchestrator::new(OrchestratorDeps {
        labels: SshKeyLabelStore::new(cloud.clone(), SSH_KEY_NAME),
        cloud,
        remote,
        git: GitCli,
        parser: TomlRecipeParser,
        display: TerminalDisplay,
        prompter: Arc::new(TerminalPrompter),
    });

    let report = orchestrator.run(&options, interrupted()).await.map_err(ExitError::from)?;
    match report.outcome {
        TrackOutcome::Succeeded => {
            println!("build {} finished successfully on {}", report.identity, report.address)
        }
        TrackOutcome::InProgress => {
            println!("build {} still running on {}", report.identity, report.address)
        }
    }
    Ok(())
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
#[path = "get_tests.rs"]
mod tests;
