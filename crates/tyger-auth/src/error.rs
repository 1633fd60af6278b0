use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("not logged in; run `tyger login SERVER_URL` first")]
    NotLoggedIn,
    #[error("context file {} is corrupt ({reason}); run `tyger login` to recreate it", path.display())]
    Corrupt { path: PathBuf, reason: String },
    #[error("cannot restrict access to {}: {source}", path.display())]
    Permission {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("timed out waiting for the device code to be authorized")]
    Timeout,
    #[error("authorization was denied")]
    AuthorizationDenied,
    #[error("{0}; run `tyger login` to sign in again")]
    ReauthenticationRequired(String),
    #[error("login cancelled")]
    Cancelled,
    #[error("certificate error: {0}")]
    Certificate(String),
    #[error("identity provider error: {0}")]
    IdentityProvider(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AuthError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
