use std::path::PathBuf;

use clap::{Args, Subcommand};

#[derive(Args)]
#[command(args_conflicts_with_subcommands = true)]
pub struct LoginArgs {
    #[command(subcommand)]
    pub command: Option<LoginCommand>,
    #[arg(value_name = "SERVER_URL")]
    pub server_url: Option<String>,
    #[arg(
        short = 's',
        long,
        value_name = "APPID",
        help = "The service principal app ID or identifier URI"
    )]
    pub service_principal: Option<String>,
    #[arg(
        short = 'c',
        long = "cert",
        value_name = "CERTPATH",
        help = "The path to the certificate in PEM format to use for service principal authentication"
    )]
    pub certificate_path: Option<PathBuf>,
    #[arg(
        short = 'd',
        long,
        help = "Use the device code flow for user logins, for when a browser can't be launched"
    )]
    pub use_device_code: bool,
    #[arg(
        long,
        env = "TYGER_LOGIN_TIMEOUT",
        value_name = "SECONDS",
        help = "Give up waiting for device code authorization after this many seconds"
    )]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum LoginCommand {
    #[command(about = "Show the current login")]
    Status,
}
