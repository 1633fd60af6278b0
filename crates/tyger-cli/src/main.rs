use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tyger_auth::{AuthContext, CredentialStore};

mod cli_args;
mod cli_command;
mod modules;

use crate::cli_args::*;
use crate::cli_command::handle_command;
use crate::modules::system::CommandContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(cli.insecure)
        .build()?;
    let auth =
        AuthContext::with_default_providers(CredentialStore::default_location()?, client.clone());

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let ctx = CommandContext {
        client: &client,
        auth: &auth,
        allow_insecure: cli.insecure,
        cancel: &cancel,
    };

    tokio::select! {
        biased;
        result = handle_command(cli.command, &ctx) => result,
        _ = cancel.cancelled() => anyhow::bail!("interrupted"),
    }
}

fn cancel_on_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupt received; cancelling");
            cancel.cancel();
        }
    });
}

fn init_logging(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter)?)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
