pub(crate) mod http;

use tokio_util::sync::CancellationToken;
use tyger_auth::AuthContext;

pub struct CommandContext<'a> {
    pub client: &'a reqwest::Client,
    pub auth: &'a AuthContext,
    pub allow_insecure: bool,
    pub cancel: &'a CancellationToken,
}

pub(crate) fn ensure_secure_addr(addr: &str, allow_insecure: bool) -> anyhow::Result<()> {
    if addr.starts_with("http://") && !allow_insecure {
        anyhow::bail!("refusing to use http:// without --insecure");
    }
    Ok(())
}
