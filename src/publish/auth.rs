use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

/// Environment variable holding the bearer token. Takes precedence over
/// both the inline config token and `token_file`.
pub const TOKEN_ENV: &str = "NEWSWIRE_TOKEN";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read token file {path}: {source}")]
    TokenFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Token is empty")]
    EmptyToken,
}

/// Credential collaborator for the publish transport.
///
/// `attach` decorates an outgoing request; `handle_unsuccessful` is offered
/// every non-2xx status and returns `true` only when it changed credential
/// state in a way that makes an immediate retry worthwhile. Implementations
/// must be idempotent: repeated calls with the same status are safe.
pub trait CredentialProvider: Send + Sync {
    fn attach(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder;

    fn handle_unsuccessful(&self, status: u16) -> bool;
}

/// For endpoints that require no authentication.
pub struct NoAuth;

impl CredentialProvider for NoAuth {
    fn attach(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
    }

    fn handle_unsuccessful(&self, _status: u16) -> bool {
        false
    }
}

enum TokenSource {
    /// Env var or inline config value. Fixed for the process lifetime.
    Static,
    /// Token file, re-read on auth failure so external rotation becomes
    /// visible without a restart.
    File(PathBuf),
}

/// Bearer-token credentials with file-based rotation support.
///
/// On a 401/403 the file source is re-read; if the token on disk differs
/// from the one in memory, it is swapped in and the transport retries
/// immediately. An unchanged token reports unhandled, which routes the
/// failure to the normal backoff path instead of a hot retry loop.
pub struct BearerToken {
    token: RwLock<SecretString>,
    source: TokenSource,
}

impl BearerToken {
    /// Resolves the token from the configured sources, in precedence order:
    /// `NEWSWIRE_TOKEN` env var, then the inline config token, then
    /// `token_file`. Returns `Ok(None)` when no source is configured.
    pub fn discover(
        inline: Option<&str>,
        token_file: Option<&Path>,
    ) -> Result<Option<Self>, AuthError> {
        if let Ok(value) = std::env::var(TOKEN_ENV) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                tracing::debug!(source = "env", "Bearer token configured");
                return Ok(Some(Self::from_static(trimmed)));
            }
        }

        if let Some(value) = inline {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                tracing::debug!(source = "config", "Bearer token configured");
                return Ok(Some(Self::from_static(trimmed)));
            }
        }

        if let Some(path) = token_file {
            let token = read_token_file(path)?;
            tracing::debug!(source = "file", path = %path.display(), "Bearer token configured");
            return Ok(Some(Self {
                token: RwLock::new(token),
                source: TokenSource::File(path.to_path_buf()),
            }));
        }

        Ok(None)
    }

    pub fn from_static(token: &str) -> Self {
        Self {
            token: RwLock::new(SecretString::from(token.to_string())),
            source: TokenSource::Static,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let token = read_token_file(path)?;
        Ok(Self {
            token: RwLock::new(token),
            source: TokenSource::File(path.to_path_buf()),
        })
    }

    /// Re-reads the token file and swaps in the new value if it changed.
    /// Returns `true` only on an observed rotation.
    fn refresh(&self) -> bool {
        let TokenSource::File(path) = &self.source else {
            return false;
        };

        let fresh = match read_token_file(path) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Token refresh failed");
                return false;
            }
        };

        let mut guard = self.token.write().unwrap_or_else(PoisonError::into_inner);
        if guard.expose_secret() == fresh.expose_secret() {
            return false;
        }

        tracing::info!(path = %path.display(), "Bearer token rotated");
        *guard = fresh;
        true
    }
}

impl CredentialProvider for BearerToken {
    fn attach(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let guard = self.token.read().unwrap_or_else(PoisonError::into_inner);
        request.bearer_auth(guard.expose_secret())
    }

    fn handle_unsuccessful(&self, status: u16) -> bool {
        if status != 401 && status != 403 {
            return false;
        }
        self.refresh()
    }
}

fn read_token_file(path: &Path) -> Result<SecretString, AuthError> {
    let raw = std::fs::read_to_string(path).map_err(|source| AuthError::TokenFile {
        path: path.to_path_buf(),
        source,
    })?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    Ok(SecretString::from(trimmed.to_string()))
}
