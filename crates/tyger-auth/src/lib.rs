#![allow(clippy::pedantic)]
#![allow(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]

//! Authentication context for the tyger CLI.
//!
//! Establishes credentials with `tyger login`, persists them to a per-user
//! context file and hands bearer tokens to every other command, refreshing
//! them silently when they are about to expire.

pub mod context;
pub mod error;
pub mod options;
pub mod provider;
pub mod status;
pub mod store;
pub mod token;

pub use crate::context::{AuthContext, Session};
pub use crate::error::AuthError;
pub use crate::options::{LoginMode, LoginModeKind, LoginOptions};
pub use crate::provider::{
    DeviceCodeProvider, IdentityEndpoints, OAuthProviderFactory, ProviderFactory,
    ServicePrincipalCertificateProvider, TokenProvider,
};
pub use crate::status::{StatusReport, StatusReporter};
pub use crate::store::{CredentialStore, PersistedContext, CONTEXT_FORMAT_VERSION};
pub use crate::token::{TokenRecord, Validity, REFRESH_MARGIN_SECONDS};
