use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;
use crate::token::TokenRecord;

pub(crate) const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
pub(crate) const JWT_BEARER_ASSERTION: &str =
    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Where the identity provider lives and which app the CLI signs in as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityEndpoints {
    pub authority: String,
    pub audience: String,
    pub client_id: String,
}

impl IdentityEndpoints {
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority.trim_end_matches('/'))
    }

    pub fn device_code_endpoint(&self) -> String {
        format!(
            "{}/oauth2/v2.0/devicecode",
            self.authority.trim_end_matches('/')
        )
    }

    pub fn default_scope(&self) -> String {
        format!("{}/.default", self.audience.trim_end_matches('/'))
    }

    pub(crate) fn interactive_scope(&self) -> String {
        format!("{} offline_access openid profile", self.default_scope())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerMetadata {
    #[serde(default)]
    pub authority: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub cli_app_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeviceAuthResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    pub expires_in: i64,
    #[serde(default)]
    pub interval: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenErrorResponse {
    pub fn describe(&self) -> String {
        match self.error_description.as_deref() {
            Some(detail) if !detail.is_empty() => format!("{}: {}", self.error, detail),
            _ => self.error.clone(),
        }
    }
}

#[derive(Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    upn: Option<String>,
    #[serde(default)]
    sub: Option<String>,
}

impl TokenResponse {
    pub fn into_record(self, now: DateTime<Utc>) -> TokenRecord {
        TokenRecord {
            // Out-of-range lifetimes count as unknown, which reads as expired.
            expires_at: self
                .expires_in
                .and_then(ChronoDuration::try_seconds)
                .and_then(|lifetime| now.checked_add_signed(lifetime)),
            subject: self.id_token.as_deref().and_then(subject_from_id_token),
            refresh_token: self.refresh_token,
            access_token: self.access_token,
        }
    }
}

/// Reads the display subject out of an id token. The signature is not
/// checked: the value is only shown to the user.
pub(crate) fn subject_from_id_token(id_token: &str) -> Option<String> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: IdTokenClaims = serde_json::from_slice(&bytes).ok()?;
    claims.preferred_username.or(claims.upn).or(claims.sub)
}

pub(crate) async fn fetch_server_metadata(
    client: &reqwest::Client,
    server_uri: &str,
) -> Result<ServerMetadata, AuthError> {
    let url = format!("{}/v1/metadata", server_uri.trim_end_matches('/'));
    let response = client.get(&url).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::IdentityProvider(format!(
            "failed to fetch server metadata: {status} {body}"
        )));
    }
    Ok(response.json::<ServerMetadata>().await?)
}

pub(crate) async fn request_device_code(
    client: &reqwest::Client,
    identity: &IdentityEndpoints,
) -> Result<DeviceAuthResponse, AuthError> {
    let scope = identity.interactive_scope();
    let params = [
        ("client_id", identity.client_id.as_str()),
        ("scope", scope.as_str()),
    ];
    let response = client
        .post(identity.device_code_endpoint())
        .form(&params)
        .send()
        .await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::IdentityProvider(format!(
            "device authorization failed: {status} {body}"
        )));
    }
    Ok(response.json::<DeviceAuthResponse>().await?)
}

/// Posts a token request. OAuth error bodies come back as `Ok(Err(_))` so
/// callers can branch on the error code.
pub(crate) async fn post_token_request(
    client: &reqwest::Client,
    identity: &IdentityEndpoints,
    params: &[(&str, &str)],
) -> Result<Result<TokenResponse, TokenErrorResponse>, AuthError> {
    let grant = params
        .iter()
        .find_map(|(key, value)| (*key == "grant_type").then_some(*value))
        .unwrap_or("unknown");
    let response = client
        .post(identity.token_endpoint())
        .form(params)
        .send()
        .await?;
    let status = response.status();
    debug!(grant = %grant, status = %status, "token endpoint response");

    if status.is_success() {
        return Ok(Ok(response.json::<TokenResponse>().await?));
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<TokenErrorResponse>(&body) {
        Ok(error) if status.is_client_error() => Ok(Err(error)),
        _ => Err(AuthError::IdentityProvider(format!(
            "token request failed: {status} {body}"
        ))),
    }
}
