use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;

use crate::error::AuthError;
use crate::options::LoginModeKind;
use crate::store::CredentialStore;
use crate::token::{Validity, REFRESH_MARGIN_SECONDS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub server_uri: Option<String>,
    pub mode: Option<LoginModeKind>,
    pub principal: Option<String>,
    pub validity: Validity,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StatusReport {
    pub fn not_logged_in() -> Self {
        Self {
            server_uri: None,
            mode: None,
            principal: None,
            validity: Validity::NotLoggedIn,
            expires_at: None,
        }
    }
}

/// Inspects the stored login without refreshing or rewriting it.
pub struct StatusReporter<'a> {
    store: &'a CredentialStore,
    margin: ChronoDuration,
}

impl<'a> StatusReporter<'a> {
    pub fn new(store: &'a CredentialStore) -> Self {
        Self {
            store,
            margin: ChronoDuration::seconds(REFRESH_MARGIN_SECONDS),
        }
    }

    pub fn with_margin(mut self, margin: ChronoDuration) -> Self {
        self.margin = margin;
        self
    }

    pub fn report(&self, now: DateTime<Utc>) -> Result<StatusReport, AuthError> {
        let context = match self.store.load() {
            Ok(context) => context,
            Err(AuthError::NotLoggedIn) => return Ok(StatusReport::not_logged_in()),
            Err(err) => return Err(err),
        };
        Ok(StatusReport {
            validity: context.token.validity_at(now, self.margin),
            expires_at: context.token.expires_at,
            principal: context.principal(),
            mode: Some(context.mode.kind()),
            server_uri: Some(context.server_uri),
        })
    }
}
