//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mailkey_core::{DEFAULT_CLIENT_SECRET_PATH, DEFAULT_SLOT_PATH, GMAIL_MODIFY_SCOPE};

/// Obtain and cache OAuth2 credentials for the Gmail API.
#[derive(Debug, Parser)]
#[command(name = "mailkey", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Use the cached credential, refresh it, or authorize in the browser.
    Login(LoginArgs),
    /// Show the cached credential without contacting the provider.
    Status(SlotArgs),
    /// Delete the cached credential.
    Logout(SlotArgs),
}

#[derive(Debug, Args)]
pub struct SlotArgs {
    /// Credential slot file.
    #[arg(long = "token", env = "MAILKEY_TOKEN_PATH", default_value = DEFAULT_SLOT_PATH)]
    pub token_path: PathBuf,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Client secret file downloaded from the provider console.
    #[arg(
        long = "client-secret",
        env = "MAILKEY_CLIENT_SECRET",
        default_value = DEFAULT_CLIENT_SECRET_PATH
    )]
    pub client_secret: PathBuf,

    #[command(flatten)]
    pub slot: SlotArgs,

    /// Scope to request; repeat or comma-separate for several.
    #[arg(
        long = "scope",
        env = "MAILKEY_SCOPES",
        value_delimiter = ',',
        default_value = GMAIL_MODIFY_SCOPE
    )]
    pub scopes: Vec<String>,

    /// Print the consent URL instead of opening a browser.
    #[arg(long)]
    pub no_browser: bool,
}
