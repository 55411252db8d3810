//! Velocity Control - CLI for the Velocity reasoning engine
//!
//! Answers questions by researching them across web sources with competing
//! hypotheses, then prints the synthesized answer with its confidence.

mod cache;
mod commands;
mod config;
mod conversation;
mod formatter;
mod render;
mod sources;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::GlobalOptions;

/// Overrides the `-v` derived log filter
const LOG_ENV: &str = "VELOCITY_LOG";

#[derive(Parser)]
#[command(name = "velocityctl")]
#[command(about = "Velocity - epistemic answer engine", long_about = None)]
#[command(version = velocity_core::VERSION)]
struct Cli {
    /// Config file (default: $VELOCITY_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip natural-language formatting even if configured
    #[arg(long, global = true)]
    no_format: bool,

    /// More logging and the reasoning trace (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a question
    Ask {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask questions interactively, with follow-ups and an answer cache
    Repl,

    /// Show how a question is classified
    Classify {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show which sources a question would be routed to
    Route {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config,
}

fn log_filter(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let opts = GlobalOptions {
        config: cli.config,
        no_format: cli.no_format,
        verbose: cli.verbose > 0,
    };

    match cli.command {
        Commands::Ask { query, json } => commands::ask(&opts, &query.join(" "), json).await,
        Commands::Repl => commands::repl(&opts).await,
        Commands::Classify { query, json } => commands::classify_query(&query.join(" "), json),
        Commands::Route { query, json } => commands::route(&opts, &query.join(" "), json),
        Commands::Config => commands::show_config(&opts),
    }
}
