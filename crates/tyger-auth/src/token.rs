use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens expiring within this many seconds are refreshed before use.
pub const REFRESH_MARGIN_SECONDS: i64 = 300;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl TokenRecord {
    pub fn validity_at(&self, now: DateTime<Utc>, margin: Duration) -> Validity {
        Validity::classify(self.expires_at, now, margin)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("subject", &self.subject)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Validity {
    Valid,
    ExpiringSoon,
    Expired,
    NotLoggedIn,
}

impl Validity {
    /// An unknown expiry counts as expired. A token whose expiry falls exactly
    /// on `now + margin` is expiring soon.
    pub fn classify(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>, margin: Duration) -> Self {
        let Some(expires_at) = expires_at else {
            return Self::Expired;
        };
        if now >= expires_at {
            Self::Expired
        } else if now + margin >= expires_at {
            Self::ExpiringSoon
        } else {
            Self::Valid
        }
    }

    pub fn needs_refresh(self) -> bool {
        matches!(self, Self::ExpiringSoon | Self::Expired)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::ExpiringSoon => "expiring-soon",
            Self::Expired => "expired",
            Self::NotLoggedIn => "not-logged-in",
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
