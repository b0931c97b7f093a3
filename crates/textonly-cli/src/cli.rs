//! Command line definition.

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "to", version, about = "TextOnly CLI")]
pub struct Cli {
    /// Override API base URL
    #[arg(long, global = true, env = "TO_API")]
    pub api: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in via device authorization
    Login(LoginArgs),
    /// Log out and revoke token
    Logout,
    /// Show current authenticated user
    Whoami(WhoamiArgs),
    /// Authentication
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Run connectivity and auth checks
    Doctor,
    /// Show CLI version
    Version,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Log in via device authorization
    Login(LoginArgs),
    /// Log out and revoke token
    Logout,
    /// Show current authenticated user
    Whoami(WhoamiArgs),
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Do not open the browser automatically
    #[arg(long)]
    pub no_open: bool,
}

#[derive(Debug, Args)]
pub struct WhoamiArgs {
    /// Output JSON
    #[arg(long)]
    pub json: bool,
}
