use std::time::Duration;

use tyger_auth::{LoginOptions, StatusReport, Validity};

use crate::cli_args::*;
use crate::modules::system::{ensure_secure_addr, CommandContext};

pub(crate) async fn handle_login_command(
    args: LoginArgs,
    ctx: &CommandContext<'_>,
) -> anyhow::Result<()> {
    if let Some(LoginCommand::Status) = args.command {
        let report = ctx.auth.status()?;
        println!("{}", render_status(&report));
        return Ok(());
    }

    let Some(server_url) = args.server_url else {
        anyhow::bail!("a server URL is required: tyger login SERVER_URL");
    };
    let options = LoginOptions {
        server_uri: server_url,
        service_principal: args.service_principal,
        certificate_path: args.certificate_path,
        use_device_code: args.use_device_code,
        device_code_timeout: args.timeout.map(Duration::from_secs),
    };
    // Flag combinations are rejected before the address check.
    options.select_mode()?;
    ensure_secure_addr(&options.normalized_server_uri()?, ctx.allow_insecure)?;

    ctx.auth.login(&options, ctx.cancel).await?;
    let report = ctx.auth.status()?;
    match report.principal.as_deref() {
        Some(principal) => println!(
            "Logged in to {} as {principal}",
            report.server_uri.as_deref().unwrap_or_default()
        ),
        None => println!(
            "Logged in to {}",
            report.server_uri.as_deref().unwrap_or_default()
        ),
    }
    Ok(())
}

pub(crate) fn handle_logout(ctx: &CommandContext<'_>) -> anyhow::Result<()> {
    ctx.auth.logout()?;
    println!("Logged out");
    Ok(())
}

pub(crate) fn render_status(report: &StatusReport) -> String {
    if report.validity == Validity::NotLoggedIn {
        return "Not logged in".to_string();
    }
    let mut lines = Vec::new();
    if let Some(server) = report.server_uri.as_deref() {
        lines.push(format!("Server:    {server}"));
    }
    if let Some(mode) = report.mode {
        lines.push(format!("Login:     {mode}"));
    }
    if let Some(principal) = report.principal.as_deref() {
        lines.push(format!("Principal: {principal}"));
    }
    let token = match report.expires_at {
        Some(expires_at) => format!("{} (expires {})", report.validity, expires_at.to_rfc3339()),
        None => format!("{} (expiry unknown)", report.validity),
    };
    lines.push(format!("Token:     {token}"));
    lines.join("\n")
}
