use std::path::PathBuf;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::oauth::{post_token_request, IdentityEndpoints, JWT_BEARER_ASSERTION};
use super::{until_cancelled, TokenProvider};
use crate::error::AuthError;
use crate::token::TokenRecord;

const ASSERTION_LIFETIME_SECONDS: i64 = 600;

/// Non-interactive login. The certificate is the durable credential, so a
/// refresh is just another acquisition.
pub struct ServicePrincipalCertificateProvider {
    client: reqwest::Client,
    identity: IdentityEndpoints,
    principal_id: String,
    certificate_path: PathBuf,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    aud: &'a str,
    iss: &'a str,
    sub: &'a str,
    jti: String,
    nbf: i64,
    iat: i64,
    exp: i64,
}

impl ServicePrincipalCertificateProvider {
    pub fn new(
        client: reqwest::Client,
        identity: IdentityEndpoints,
        principal_id: String,
        certificate_path: PathBuf,
    ) -> Self {
        Self {
            client,
            identity,
            principal_id,
            certificate_path,
        }
    }

    async fn request_token(&self) -> Result<TokenRecord, AuthError> {
        let pem = tokio::fs::read_to_string(&self.certificate_path)
            .await
            .map_err(|err| {
                AuthError::Certificate(format!(
                    "failed to read {}: {err}",
                    self.certificate_path.display()
                ))
            })?;
        let token_endpoint = self.identity.token_endpoint();
        let assertion = build_client_assertion(&pem, &self.principal_id, &token_endpoint)?;
        let scope = self.identity.default_scope();
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.principal_id.as_str()),
            ("client_assertion_type", JWT_BEARER_ASSERTION),
            ("client_assertion", assertion.as_str()),
            ("scope", scope.as_str()),
        ];

        match post_token_request(&self.client, &self.identity, &params).await? {
            Ok(token) => {
                let mut record = token.into_record(Utc::now());
                record.refresh_token = None;
                Ok(record)
            }
            Err(error) => Err(AuthError::IdentityProvider(format!(
                "service principal login failed: {}",
                error.describe()
            ))),
        }
    }
}

#[async_trait]
impl TokenProvider for ServicePrincipalCertificateProvider {
    async fn acquire(&self, cancel: &CancellationToken) -> Result<TokenRecord, AuthError> {
        until_cancelled(cancel, self.request_token()).await
    }

    async fn refresh(&self, _record: &TokenRecord) -> Result<TokenRecord, AuthError> {
        debug!(principal = %self.principal_id, "renewing service principal token from certificate");
        self.request_token().await
    }

    fn describe(&self, _record: &TokenRecord) -> Option<String> {
        Some(self.principal_id.clone())
    }
}

/// Signs an RS256 client assertion with the key in `pem`, tagged with the
/// certificate's SHA-256 thumbprint.
pub(crate) fn build_client_assertion(
    pem: &str,
    client_id: &str,
    audience: &str,
) -> Result<String, AuthError> {
    let blocks = pem::parse_many(pem)
        .map_err(|err| AuthError::Certificate(format!("failed to parse PEM content: {err}")))?;
    let certificate = blocks
        .iter()
        .find(|block| block.tag() == "CERTIFICATE")
        .ok_or_else(|| AuthError::Certificate("no certificate found in PEM".to_string()))?;
    let private_key = blocks
        .iter()
        .find(|block| matches!(block.tag(), "PRIVATE KEY" | "RSA PRIVATE KEY"))
        .ok_or_else(|| AuthError::Certificate("no private key found in PEM".to_string()))?;

    let key = EncodingKey::from_rsa_pem(pem::encode(private_key).as_bytes())
        .map_err(|err| AuthError::Certificate(format!("unsupported private key: {err}")))?;

    let mut header = Header::new(Algorithm::RS256);
    header.x5t_s256 = Some(URL_SAFE_NO_PAD.encode(Sha256::digest(certificate.contents())));

    let now = Utc::now().timestamp();
    let claims = AssertionClaims {
        aud: audience,
        iss: client_id,
        sub: client_id,
        jti: uuid::Uuid::new_v4().to_string(),
        nbf: now,
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECONDS,
    };

    encode(&header, &claims, &key)
        .map_err(|err| AuthError::Certificate(format!("failed to sign client assertion: {err}")))
}
