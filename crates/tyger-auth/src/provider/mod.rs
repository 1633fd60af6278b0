mod device_code;
mod oauth;
mod service_principal;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::AuthError;
use crate::options::LoginMode;
use crate::token::TokenRecord;

pub use device_code::DeviceCodeProvider;
pub use oauth::IdentityEndpoints;
pub use service_principal::ServicePrincipalCertificateProvider;

/// One login strategy. A fresh instance is built for every login or refresh.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire(&self, cancel: &CancellationToken) -> Result<TokenRecord, AuthError>;

    /// Renews a token without user interaction.
    async fn refresh(&self, record: &TokenRecord) -> Result<TokenRecord, AuthError>;

    /// The principal or user the token belongs to, if known.
    fn describe(&self, record: &TokenRecord) -> Option<String>;
}

/// Builds the provider matching a login mode.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    /// Asks the server which identity provider it trusts.
    async fn discover(
        &self,
        server_uri: &str,
        mode: &LoginMode,
    ) -> Result<IdentityEndpoints, AuthError>;

    fn provider(
        &self,
        identity: &IdentityEndpoints,
        mode: &LoginMode,
        timeout: Option<Duration>,
    ) -> Box<dyn TokenProvider>;
}

pub struct OAuthProviderFactory {
    client: reqwest::Client,
}

impl OAuthProviderFactory {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderFactory for OAuthProviderFactory {
    async fn discover(
        &self,
        server_uri: &str,
        mode: &LoginMode,
    ) -> Result<IdentityEndpoints, AuthError> {
        let metadata = oauth::fetch_server_metadata(&self.client, server_uri).await?;
        let (Some(authority), Some(audience)) = (metadata.authority, metadata.audience) else {
            return Err(AuthError::IdentityProvider(format!(
                "{server_uri} does not advertise an identity provider"
            )));
        };
        let client_id = match mode {
            LoginMode::ServicePrincipal { principal_id, .. } => principal_id.clone(),
            LoginMode::DeviceCode => metadata.cli_app_uri.ok_or_else(|| {
                AuthError::IdentityProvider(format!(
                    "{server_uri} does not advertise a CLI application for interactive login"
                ))
            })?,
        };
        debug!(server = %server_uri, authority = %authority, "discovered identity provider");
        Ok(IdentityEndpoints {
            authority,
            audience,
            client_id,
        })
    }

    fn provider(
        &self,
        identity: &IdentityEndpoints,
        mode: &LoginMode,
        timeout: Option<Duration>,
    ) -> Box<dyn TokenProvider> {
        match mode {
            LoginMode::ServicePrincipal {
                principal_id,
                certificate_path,
            } => Box::new(ServicePrincipalCertificateProvider::new(
                self.client.clone(),
                identity.clone(),
                principal_id.clone(),
                certificate_path.clone(),
            )),
            LoginMode::DeviceCode => Box::new(DeviceCodeProvider::new(
                self.client.clone(),
                identity.clone(),
                timeout,
            )),
        }
    }
}

/// Runs `future` unless `cancel` fires first.
pub(crate) async fn until_cancelled<T, F>(
    cancel: &CancellationToken,
    future: F,
) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, AuthError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AuthError::Cancelled),
        result = future => result,
    }
}
