use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::oauth::{
    post_token_request, request_device_code, DeviceAuthResponse, IdentityEndpoints,
    DEVICE_CODE_GRANT,
};
use super::{until_cancelled, TokenProvider};
use crate::error::AuthError;
use crate::token::TokenRecord;

const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 5;
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);
// Caps on values the identity provider sends back.
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);
const MAX_CODE_LIFETIME: Duration = Duration::from_secs(60 * 60);

pub struct DeviceCodeProvider {
    client: reqwest::Client,
    identity: IdentityEndpoints,
    timeout: Option<Duration>,
}

impl DeviceCodeProvider {
    pub fn new(
        client: reqwest::Client,
        identity: IdentityEndpoints,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            client,
            identity,
            timeout,
        }
    }

    async fn poll(
        &self,
        device: &DeviceAuthResponse,
        cancel: &CancellationToken,
    ) -> Result<TokenRecord, AuthError> {
        let started = Instant::now();
        let code_lifetime =
            Duration::from_secs(device.expires_in.max(0).unsigned_abs()).min(MAX_CODE_LIFETIME);
        let deadline = match self.timeout {
            Some(timeout) => started + timeout.min(code_lifetime),
            None => started + code_lifetime,
        };
        let mut interval = Duration::from_secs(
            device
                .interval
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS),
        )
        .min(MAX_POLL_INTERVAL);

        loop {
            if Instant::now() >= deadline {
                return Err(AuthError::Timeout);
            }

            let params = [
                ("grant_type", DEVICE_CODE_GRANT),
                ("device_code", device.device_code.as_str()),
                ("client_id", self.identity.client_id.as_str()),
            ];
            let outcome = until_cancelled(
                cancel,
                post_token_request(&self.client, &self.identity, &params),
            )
            .await?;

            match outcome {
                Ok(token) => return Ok(token.into_record(Utc::now())),
                Err(error) => match error.error.as_str() {
                    "authorization_pending" => {}
                    "slow_down" => {
                        interval = (interval + SLOW_DOWN_STEP).min(MAX_POLL_INTERVAL);
                    }
                    "access_denied" | "authorization_declined" => {
                        return Err(AuthError::AuthorizationDenied)
                    }
                    "expired_token" | "code_expired" => return Err(AuthError::Timeout),
                    _ => {
                        return Err(AuthError::IdentityProvider(format!(
                            "device code login failed: {}",
                            error.describe()
                        )))
                    }
                },
            }

            debug!(interval_secs = interval.as_secs(), "waiting for device code authorization");
            let wake = (Instant::now() + interval).min(deadline);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AuthError::Cancelled),
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }
}

fn announce(device: &DeviceAuthResponse) {
    match device.message.as_deref() {
        Some(message) if !message.is_empty() => eprintln!("{message}"),
        _ => {
            let verification = device
                .verification_uri_complete
                .as_deref()
                .unwrap_or(&device.verification_uri);
            eprintln!("To sign in, visit: {verification}");
            eprintln!("User code: {}", device.user_code);
        }
    }
}

#[async_trait]
impl TokenProvider for DeviceCodeProvider {
    async fn acquire(&self, cancel: &CancellationToken) -> Result<TokenRecord, AuthError> {
        let device =
            until_cancelled(cancel, request_device_code(&self.client, &self.identity)).await?;
        announce(&device);
        let record = self.poll(&device, cancel).await?;
        if !record.can_refresh() {
            return Err(AuthError::IdentityProvider(
                "device code login returned no refresh token".to_string(),
            ));
        }
        info!(subject = record.subject.as_deref().unwrap_or("unknown"), "device code authorized");
        Ok(record)
    }

    async fn refresh(&self, record: &TokenRecord) -> Result<TokenRecord, AuthError> {
        let Some(refresh_token) = record.refresh_token.as_deref().filter(|t| !t.is_empty()) else {
            return Err(AuthError::ReauthenticationRequired(
                "no refresh token is stored for this login".to_string(),
            ));
        };
        let scope = self.identity.interactive_scope();
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.identity.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("scope", scope.as_str()),
        ];

        match post_token_request(&self.client, &self.identity, &params).await? {
            Ok(token) => {
                let mut refreshed = token.into_record(Utc::now());
                if refreshed.refresh_token.is_none() {
                    refreshed.refresh_token = record.refresh_token.clone();
                }
                if refreshed.subject.is_none() {
                    refreshed.subject = record.subject.clone();
                }
                debug!("refreshed device code token");
                Ok(refreshed)
            }
            Err(error) => match error.error.as_str() {
                "invalid_grant" | "interaction_required" | "expired_token" => Err(
                    AuthError::ReauthenticationRequired(format!(
                        "the stored refresh token was rejected ({})",
                        error.describe()
                    )),
                ),
                _ => Err(AuthError::IdentityProvider(format!(
                    "token refresh failed: {}",
                    error.describe()
                ))),
            },
        }
    }

    fn describe(&self, record: &TokenRecord) -> Option<String> {
        record.subject.clone()
    }
}
