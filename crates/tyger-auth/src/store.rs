use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::options::LoginMode;
use crate::provider::IdentityEndpoints;
use crate::token::TokenRecord;

pub const CONTEXT_FORMAT_VERSION: u32 = 1;

const CONTEXT_DIR: &str = ".tyger";
const CONTEXT_FILE: &str = "context.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedContext {
    pub version: u32,
    pub server_uri: String,
    pub identity: IdentityEndpoints,
    pub mode: LoginMode,
    pub token: TokenRecord,
}

impl PersistedContext {
    pub fn new(
        server_uri: impl Into<String>,
        identity: IdentityEndpoints,
        mode: LoginMode,
        token: TokenRecord,
    ) -> Self {
        Self {
            version: CONTEXT_FORMAT_VERSION,
            server_uri: server_uri.into(),
            identity,
            mode,
            token,
        }
    }

    pub fn principal(&self) -> Option<String> {
        match &self.mode {
            LoginMode::ServicePrincipal { principal_id, .. } => Some(principal_id.clone()),
            LoginMode::DeviceCode => self.token.subject.clone(),
        }
    }

    fn check(&self) -> Result<(), String> {
        if self.version != CONTEXT_FORMAT_VERSION {
            return Err(format!("unsupported format version {}", self.version));
        }
        if self.server_uri.trim().is_empty() {
            return Err("server_uri is empty".to_string());
        }
        Ok(())
    }
}

/// Owns the context file. Nothing else reads or writes it.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$HOME/.tyger/context.json`, falling back to `USERPROFILE` on Windows.
    pub fn default_location() -> Result<Self, AuthError> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME is not set"))?;
        Ok(Self::at(Path::new(&home).join(CONTEXT_DIR).join(CONTEXT_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, context: &PersistedContext) -> Result<(), AuthError> {
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        ensure_private_dir(dir)?;

        let mut contents = serde_json::to_vec_pretty(context).map_err(io::Error::other)?;
        contents.push(b'\n');

        // Dropping the temp file on any early return removes it.
        let mut temp = tempfile::Builder::new()
            .prefix(".context-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        restrict_to_owner(temp.path())?;
        temp.write_all(&contents)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|err| AuthError::Io(err.error))?;

        debug!(path = %self.path.display(), server = %context.server_uri, "saved login context");
        Ok(())
    }

    pub fn load(&self) -> Result<PersistedContext, AuthError> {
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(AuthError::NotLoggedIn)
            }
            Err(err) => return Err(err.into()),
        };
        let context: PersistedContext =
            serde_json::from_slice(&contents).map_err(|err| self.corrupt(err.to_string()))?;
        context.check().map_err(|reason| self.corrupt(reason))?;
        Ok(context)
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed login context");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn corrupt(&self, reason: String) -> AuthError {
        AuthError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }
}

fn ensure_private_dir(dir: &Path) -> Result<(), AuthError> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700)).map_err(|source| {
                AuthError::Permission {
                    path: dir.to_path_buf(),
                    source,
                }
            })?;
        }
        return Ok(());
    }
    #[cfg(unix)]
    tighten_existing_dir(dir);
    Ok(())
}

// The context file is 0600 on its own, so a directory we cannot tighten
// (for instance one owned by another user) only earns a warning.
#[cfg(unix)]
fn tighten_existing_dir(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let Ok(metadata) = fs::metadata(dir) else {
        return;
    };
    if metadata.permissions().mode() & 0o077 == 0 {
        return;
    }
    if let Err(err) = fs::set_permissions(dir, fs::Permissions::from_mode(0o700)) {
        warn!(path = %dir.display(), error = %err, "cannot restrict context directory to owner");
    } else {
        debug!(path = %dir.display(), "restricted context directory to owner");
    }
}

fn restrict_to_owner(path: &Path) -> Result<(), AuthError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|source| {
            AuthError::Permission {
                path: path.to_path_buf(),
                source,
            }
        })?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
