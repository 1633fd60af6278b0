use clap::{ArgAction, Parser, Subcommand};

pub use crate::modules::auth::args::*;
pub use crate::modules::codespecs::args::*;

#[derive(Parser)]
#[command(name = "tyger")]
#[command(about = "Tyger CLI")]
pub struct Cli {
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    #[arg(long, help = "Allow http:// servers and invalid TLS certificates")]
    pub insecure: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(about = "Login to a server")]
    Login(LoginArgs),
    #[command(about = "Logout and remove stored credentials")]
    Logout,
    #[command(about = "Create or update a resource")]
    Create(CreateArgs),
}
