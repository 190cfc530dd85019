//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Sheaf incremental resource bundler CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: sheaf.toml)
    #[arg(short = 'C', long, default_value = "sheaf.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Resource root directory (relative to the config file)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build every bundle
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Build, then rebuild changed bundles until interrupted
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Quiet period after the last change before rebuilding (ms)
        #[arg(short, long)]
        quiet: Option<u64>,
    },

    /// Classify a request path against the current bundle hashes
    #[command(visible_alias = "c")]
    Check {
        /// Request path, e.g. `js/main-1a2b3c4d.js`
        path: String,

        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Print the request path of every bundle variant
    #[command(visible_alias = "p")]
    Paths {
        #[command(flatten)]
        build_args: BuildArgs,
    },
}

impl Commands {
    pub fn build_args(&self) -> &BuildArgs {
        match self {
            Self::Build { build_args }
            | Self::Watch { build_args, .. }
            | Self::Check { build_args, .. }
            | Self::Paths { build_args } => build_args,
        }
    }
}

/// Shared build arguments
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Build debug member lists instead of bundle output
    #[arg(short, long)]
    pub debug: bool,

    /// Ignore the stored bundle mapping and rebuild everything
    #[arg(long)]
    pub clean: bool,

    /// Join every bundle in memory without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Build bundles in parallel
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub parallel: Option<bool>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
