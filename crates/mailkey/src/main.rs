//! `mailkey` - OAuth2 login for Google mail APIs from the command line.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use mailkey_core::{
    BrowserPrompt, CancellationToken, Credential, CredentialManager, Error, ManagerConfig,
    ServiceHandle,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command, LoginArgs, SlotArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailkey=info,mailkey_core=info,mailkey_oauth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Command::Login(args) => login(args).await,
        Command::Status(args) => status(&args),
        Command::Logout(args) => logout(&args),
    }
}

async fn login(args: LoginArgs) -> anyhow::Result<()> {
    let config = ManagerConfig::new(&args.client_secret, args.scopes)
        .with_slot_path(&args.slot.token_path);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling authorization");
            on_interrupt.cancel();
        }
    });

    let prompt = if args.no_browser {
        BrowserPrompt::print_only()
    } else {
        BrowserPrompt::new()
    };
    let manager = CredentialManager::new(config)
        .with_prompt(prompt)
        .with_cancellation(cancel);

    match manager.acquire_service().await {
        Ok(service) => {
            print_service(&service);
            Ok(())
        }
        Err(Error::Persist { source, service }) => {
            print_service(&service);
            warn!("Credential is valid for this session only");
            Err(source).context("Failed to save credential")
        }
        Err(e) if e.is_cancelled() => anyhow::bail!("Authorization cancelled"),
        Err(e) => Err(e).context("Login failed"),
    }
}

fn status(args: &SlotArgs) -> anyhow::Result<()> {
    let manager = CredentialManager::new(ManagerConfig::default().with_slot_path(&args.token_path));
    let path = args.token_path.display();

    match manager
        .cached_credential()
        .context("Failed to read credential slot")?
    {
        Some(credential) => {
            println!("slot:     {path}");
            print_credential(&credential, Utc::now());
        }
        None => println!("No cached credential at {path}"),
    }
    Ok(())
}

fn logout(args: &SlotArgs) -> anyhow::Result<()> {
    let manager = CredentialManager::new(ManagerConfig::default().with_slot_path(&args.token_path));
    let path = args.token_path.display();

    if manager.forget().context("Failed to delete credential slot")? {
        println!("Removed cached credential at {path}");
    } else {
        println!("No cached credential at {path}");
    }
    Ok(())
}

fn print_service(service: &ServiceHandle) {
    println!("service:  {} {}", service.name(), service.version());
    println!("endpoint: {}", service.base_url());
    print_credential(service.credential(), Utc::now());
}

fn print_credential(credential: &Credential, now: DateTime<Utc>) {
    let state = if credential.is_valid_at(now) {
        "valid"
    } else if credential.can_refresh() {
        "expired (refreshable)"
    } else {
        "expired"
    };
    println!("state:    {state}");
    match credential.expires_at {
        Some(at) => println!("expires:  {}", at.to_rfc3339()),
        None => println!("expires:  unknown"),
    }
    println!("scopes:   {}", credential.scopes.join(" "));
}
