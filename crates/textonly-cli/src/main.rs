//! TextOnly CLI - command-line client for TextOnly notes.
//!
//! This binary wires the clap command tree to `textonly-core`: device login,
//! logout, identity, and a connectivity doctor.

mod cli;
mod commands;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{AuthCommand, Cli, Command};
use commands::Context;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::Version = cli.command {
        commands::version();
        return Ok(());
    }

    let ctx = Context::new(cli.api.as_deref())?;
    info!(command = ?cli.command, "Running command");

    match cli.command {
        Command::Login(args) | Command::Auth(AuthCommand::Login(args)) => {
            commands::login(&ctx, args.no_open).await
        }
        Command::Logout | Command::Auth(AuthCommand::Logout) => commands::logout(&ctx).await,
        Command::Whoami(args) | Command::Auth(AuthCommand::Whoami(args)) => {
            commands::whoami(&ctx, args.json).await
        }
        Command::Doctor => commands::doctor(&ctx).await,
        Command::Version => Ok(()),
    }
}
