//! `gitsecureops` command-line entry point

mod cli;
mod commands;
mod format;
mod logging;

use crate::cli::{Args, Command};
use anyhow::Context;
use clap::Parser;
use gitsecureops_common::initialize_environment;
use gitsecureops_config::{ApplicationConfig, ConfigurationLoader, EnvironmentSource, file_source};
use gitsecureops_github::{GitHubClient, build_http_client};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    initialize_environment();
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    let log_dir = args.log_dir.clone().unwrap_or_else(logging::default_log_dir);
    let _log_guards = logging::init(&log_dir, &config.telemetry.tracing_level, args.verbose)
        .with_context(|| format!("Failed to create log directory '{}'", log_dir.display()))?;

    let token = args
        .token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .context("A GitHub token is required: pass --token or set GITHUB_TOKEN")?;
    let http = build_http_client(&config.github)?;
    let github = Arc::new(GitHubClient::new(http, &config.github, token));

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    let mut stdout = std::io::stdout();
    match &args.command {
        Command::Search(search) => {
            commands::search(github, &config, search, cancel, &mut stdout).await?;
        }
        Command::Repos(repos) => {
            commands::repos(github, &config, repos, &cancel, &mut stdout).await?;
        }
    }
    Ok(())
}

/// Defaults, then the optional file, then environment
fn load_config(path: Option<&Path>) -> anyhow::Result<ApplicationConfig> {
    let mut loader = ConfigurationLoader::new().add_source(Box::new(EnvironmentSource));
    if let Some(path) = path {
        loader = loader.add_source(file_source(path)?);
    }
    loader.load().context("Invalid configuration")
}
