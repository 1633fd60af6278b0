use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use tracing::debug;

use crate::modules::system::{ensure_secure_addr, CommandContext};

pub(crate) fn auth_headers(token: &str) -> anyhow::Result<HeaderMap> {
    if token.trim().is_empty() {
        anyhow::bail!("access token is empty; run `tyger login`");
    }
    let mut headers = HeaderMap::new();
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
    value.set_sensitive(true);
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

/// Sends an authenticated request to the server of the current login.
pub(crate) async fn send_request(
    ctx: &CommandContext<'_>,
    method: Method,
    path: &str,
    payload: Option<serde_json::Value>,
) -> anyhow::Result<reqwest::Response> {
    let session = ctx.auth.session().await?;
    ensure_secure_addr(&session.server_uri, ctx.allow_insecure)?;
    let url = format!(
        "{}/{}",
        session.server_uri.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let headers = auth_headers(&session.access_token)?;
    let builder = ctx.client.request(method.clone(), &url).headers(headers);
    let builder = if let Some(payload) = payload {
        builder.json(&payload)
    } else {
        builder
    };
    debug!(method = %method, url = %url, "http request");
    let start = std::time::Instant::now();
    let response = builder.send().await?;
    debug!(
        method = %method,
        url = %url,
        status = %response.status(),
        elapsed_ms = start.elapsed().as_millis(),
        "http response"
    );
    Ok(response)
}

pub(crate) async fn ensure_success(response: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Request failed: {status} {body}");
    }
    Ok(response)
}
