// src/lib.rs

pub mod actions;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod extract;
pub mod fs;
pub mod gateway;
pub mod logging;
pub mod session;

use tracing::{debug, info};

use crate::actions::run_action;
use crate::cli::CliArgs;
use crate::config::{Defaults, load_from_path, resolve_settings};
use crate::errors::Result;
use crate::exec::ShellExecutor;
use crate::fs::RealFileSystem;
use crate::gateway::Gateway;
use crate::session::SessionOrchestrator;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - override capture from CLI flags (before the config file is read)
/// - config file loading
/// - merging and defaulting into `Settings`
/// - the shell executor, gateway and session orchestrator
pub async fn run(args: CliArgs) -> Result<()> {
    let fs = RealFileSystem;

    let overrides = args.overrides.to_layer()?;
    debug!(count = overrides.len(), "captured command-line overrides");

    let file = match &args.config_file {
        Some(path) => Some(load_from_path(&fs, path)?),
        None => None,
    };

    let settings = resolve_settings(overrides, file, &Defaults::from_env(), &fs)?;
    info!(action = %args.action, "configuration resolved");

    let executor = ShellExecutor::new();
    let orchestrator = SessionOrchestrator::new(Gateway::new(&settings, &executor));
    run_action(args.action, &orchestrator).await
}
