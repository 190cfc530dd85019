//! Sheaf - an incremental resource bundler.

mod address;
mod bundle;
mod cli;
mod config;
mod core;
mod engine;
mod freshness;
mod generator;
mod logger;
mod postprocess;
mod rebuild;
mod resource;
mod store;
mod utils;
mod variant;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::SheafConfig;

fn main() -> Result<()> {
    // Ctrl+C cancels the running build and stops the watch loop
    let shutdown = core::CancelToken::new();
    core::setup_shutdown_handler(shutdown.clone(), || {})?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = SheafConfig::load(&cli)?;

    match &cli.command {
        Commands::Build { .. } => cli::build::build(&config, shutdown),
        Commands::Watch { .. } => cli::watch::watch(&config, shutdown),
        Commands::Check { path, .. } => cli::check::check(&config, path, shutdown),
        Commands::Paths { .. } => cli::paths::paths(&config, shutdown),
    }
}
