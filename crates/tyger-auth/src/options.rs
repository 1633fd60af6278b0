use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

#[derive(Debug, Clone, Default)]
pub struct LoginOptions {
    pub server_uri: String,
    pub service_principal: Option<String>,
    pub certificate_path: Option<PathBuf>,
    pub use_device_code: bool,
    pub device_code_timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoginMode {
    ServicePrincipal {
        principal_id: String,
        certificate_path: PathBuf,
    },
    DeviceCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginModeKind {
    ServicePrincipal,
    DeviceCode,
}

impl LoginOptions {
    pub fn new(server_uri: impl Into<String>) -> Self {
        Self {
            server_uri: server_uri.into(),
            ..Self::default()
        }
    }

    pub fn device_code(server_uri: impl Into<String>) -> Self {
        Self {
            use_device_code: true,
            ..Self::new(server_uri)
        }
    }

    pub fn service_principal(
        server_uri: impl Into<String>,
        principal_id: impl Into<String>,
        certificate_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            service_principal: Some(principal_id.into()),
            certificate_path: Some(certificate_path.into()),
            ..Self::new(server_uri)
        }
    }

    /// Validates the server URI and strips any trailing slash.
    pub fn normalized_server_uri(&self) -> Result<String, AuthError> {
        let raw = self.server_uri.trim();
        if raw.is_empty() {
            return Err(AuthError::validation("a server URL is required"));
        }
        let url = reqwest::Url::parse(raw)
            .map_err(|err| AuthError::validation(format!("invalid server URL '{raw}': {err}")))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(AuthError::validation(format!(
                "invalid server URL '{raw}': expected an http or https address"
            )));
        }
        Ok(raw.trim_end_matches('/').to_string())
    }

    /// Picks the login mode. Touches neither disk nor network.
    pub fn select_mode(&self) -> Result<LoginMode, AuthError> {
        let principal = self
            .service_principal
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let certificate = self
            .certificate_path
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty());

        match (principal, certificate) {
            (Some(principal_id), Some(certificate_path)) => {
                if self.use_device_code {
                    return Err(AuthError::validation(
                        "--use-device-code cannot be used with --service-principal",
                    ));
                }
                Ok(LoginMode::ServicePrincipal {
                    principal_id: principal_id.to_string(),
                    certificate_path: certificate_path.clone(),
                })
            }
            (None, None) => Ok(LoginMode::DeviceCode),
            _ => Err(AuthError::validation(
                "--service-principal and --cert must be specified together",
            )),
        }
    }
}

impl LoginMode {
    pub fn kind(&self) -> LoginModeKind {
        match self {
            Self::ServicePrincipal { .. } => LoginModeKind::ServicePrincipal,
            Self::DeviceCode => LoginModeKind::DeviceCode,
        }
    }

    /// Resolves a relative certificate path so later invocations from another
    /// working directory still find it.
    pub(crate) fn with_absolute_paths(self) -> Result<Self, AuthError> {
        match self {
            Self::ServicePrincipal {
                principal_id,
                certificate_path,
            } => Ok(Self::ServicePrincipal {
                principal_id,
                certificate_path: std::path::absolute(&certificate_path)?,
            }),
            Self::DeviceCode => Ok(Self::DeviceCode),
        }
    }
}

impl fmt::Display for LoginModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServicePrincipal => f.write_str("service principal"),
            Self::DeviceCode => f.write_str("device code"),
        }
    }
}

impl fmt::Display for LoginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(principal: Option<&str>, cert: Option<&str>, device_code: bool) -> LoginOptions {
        LoginOptions {
            server_uri: "https://tyger.example.com".to_string(),
            service_principal: principal.map(str::to_string),
            certificate_path: cert.map(PathBuf::from),
            use_device_code: device_code,
            device_code_timeout: None,
        }
    }

    #[test]
    fn valid_combinations_select_exactly_one_mode() {
        assert_eq!(
            options(None, None, false).select_mode().expect("default"),
            LoginMode::DeviceCode
        );
        assert_eq!(
            options(None, None, true).select_mode().expect("device code"),
            LoginMode::DeviceCode
        );
        assert_eq!(
            options(Some("api://sp"), Some("/certs/sp.pem"), false)
                .select_mode()
                .expect("service principal"),
            LoginMode::ServicePrincipal {
                principal_id: "api://sp".to_string(),
                certificate_path: PathBuf::from("/certs/sp.pem"),
            }
        );
    }

    #[test]
    fn invalid_combinations_are_rejected() {
        let cases = [
            options(Some("api://sp"), None, false),
            options(None, Some("/certs/sp.pem"), false),
            options(Some("api://sp"), None, true),
            options(None, Some("/certs/sp.pem"), true),
            options(Some("api://sp"), Some("/certs/sp.pem"), true),
        ];
        for case in cases {
            assert!(matches!(
                case.select_mode(),
                Err(AuthError::Validation(_))
            ));
        }
    }

    #[test]
    fn blank_principal_counts_as_absent() {
        assert_eq!(
            options(Some("  "), None, false).select_mode().expect("mode"),
            LoginMode::DeviceCode
        );
    }

    #[test]
    fn server_uri_is_normalized() {
        let opts = LoginOptions::new("https://tyger.example.com/");
        assert_eq!(
            opts.normalized_server_uri().expect("uri"),
            "https://tyger.example.com"
        );
        for bad in ["", "   ", "tyger.example.com", "ftp://tyger.example.com"] {
            assert!(matches!(
                LoginOptions::new(bad).normalized_server_uri(),
                Err(AuthError::Validation(_))
            ));
        }
    }

    #[test]
    fn login_mode_serializes_with_type_tag() {
        let json = serde_json::to_value(LoginMode::DeviceCode).expect("serialize");
        assert_eq!(json, serde_json::json!({ "type": "device_code" }));
    }
}
