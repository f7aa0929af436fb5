//! gitgate CLI - a guarded JSON bridge between a UI and git's sequential operations.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Serve { repo } => commands::serve::run(&repo),
        Commands::Call {
            method,
            params,
            repo,
        } => commands::call::run(&method, params.as_deref(), &repo),
        Commands::Status { json, repo } => commands::status::run(json, &repo),
        Commands::Completions { shell } => commands::completions::run(shell),
    };

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries responses.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("GITGATE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
