use std::fmt;

use chrono::{Duration as ChronoDuration, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::options::LoginOptions;
use crate::provider::{OAuthProviderFactory, ProviderFactory};
use crate::status::{StatusReport, StatusReporter};
use crate::store::{CredentialStore, PersistedContext};
use crate::token::{Validity, REFRESH_MARGIN_SECONDS};

/// Ties the credential store to the login providers.
///
/// Every command except `login` goes through [`AuthContext::get_access_token`]
/// or [`AuthContext::session`]: a cached token that is still valid is returned
/// without network activity, otherwise it is refreshed once and re-persisted.
pub struct AuthContext {
    store: CredentialStore,
    factory: Box<dyn ProviderFactory>,
    refresh_margin: ChronoDuration,
}

/// A usable bearer token and the server it was issued for.
#[derive(Clone)]
pub struct Session {
    pub server_uri: String,
    pub access_token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("server_uri", &self.server_uri)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl AuthContext {
    pub fn new(store: CredentialStore, factory: impl ProviderFactory + 'static) -> Self {
        Self {
            store,
            factory: Box::new(factory),
            refresh_margin: ChronoDuration::seconds(REFRESH_MARGIN_SECONDS),
        }
    }

    pub fn with_default_providers(store: CredentialStore, client: reqwest::Client) -> Self {
        Self::new(store, OAuthProviderFactory::new(client))
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub async fn login(
        &self,
        options: &LoginOptions,
        cancel: &CancellationToken,
    ) -> Result<(), AuthError> {
        let server_uri = options.normalized_server_uri()?;
        let mode = options.select_mode()?.with_absolute_paths()?;
        info!(server = %server_uri, mode = %mode, "logging in");

        let identity = self.factory.discover(&server_uri, &mode).await?;
        let provider = self
            .factory
            .provider(&identity, &mode, options.device_code_timeout);
        let token = provider.acquire(cancel).await?;
        let principal = provider.describe(&token);

        self.store
            .save(&PersistedContext::new(server_uri.clone(), identity, mode, token))?;
        info!(
            server = %server_uri,
            principal = principal.as_deref().unwrap_or("unknown"),
            "logged in"
        );
        Ok(())
    }

    pub async fn get_access_token(&self) -> Result<String, AuthError> {
        Ok(self.session().await?.access_token)
    }

    pub async fn session(&self) -> Result<Session, AuthError> {
        let mut context = self.store.load()?;
        let validity = context.token.validity_at(Utc::now(), self.refresh_margin);
        if validity == Validity::Valid {
            debug!(server = %context.server_uri, "using cached access token");
            return Ok(Session {
                server_uri: context.server_uri,
                access_token: context.token.access_token,
            });
        }

        debug!(server = %context.server_uri, validity = %validity, "refreshing access token");
        let provider = self.factory.provider(&context.identity, &context.mode, None);
        let refreshed = provider.refresh(&context.token).await;
        match refreshed {
            Ok(token) => {
                context.token = token;
                self.store.save(&context)?;
                Ok(Session {
                    server_uri: context.server_uri,
                    access_token: context.token.access_token,
                })
            }
            Err(AuthError::ReauthenticationRequired(reason)) => {
                warn!(server = %context.server_uri, reason = %reason, "refresh rejected; clearing login");
                self.store.clear()?;
                Err(AuthError::ReauthenticationRequired(reason))
            }
            Err(err) => Err(err),
        }
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.store.clear()
    }

    pub fn status(&self) -> Result<StatusReport, AuthError> {
        StatusReporter::new(&self.store)
            .with_margin(self.refresh_margin)
            .report(Utc::now())
    }
}
