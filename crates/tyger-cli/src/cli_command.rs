use crate::cli_args::*;
use crate::modules::auth::{handle_login_command, handle_logout};
use crate::modules::codespecs::handle_create;
use crate::modules::system::CommandContext;

pub(crate) async fn handle_command(
    command: Command,
    ctx: &CommandContext<'_>,
) -> anyhow::Result<()> {
    match command {
        Command::Login(args) => handle_login_command(args, ctx).await?,
        Command::Logout => handle_logout(ctx)?,
        Command::Create(args) => handle_create(args, ctx).await?,
    }

    Ok(())
}
