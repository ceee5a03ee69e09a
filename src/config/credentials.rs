// ABOUTME: Opaque credential handles and the collaborator that resolves them.
// ABOUTME: Handles are stored in config and records; secrets are resolved only at call time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reference to a credential, never the credential itself.
///
/// In YAML: `agent`, `{ key_file: ~/.ssh/id_ed25519 }`, `{ env: REGISTRY_TOKEN }`,
/// or `{ file: /run/secrets/registry }`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialsHandle {
    /// Use the SSH agent (or default key locations).
    #[default]
    Agent,
    /// Private key file for SSH authentication.
    KeyFile(PathBuf),
    /// Environment variable holding the secret.
    Env(String),
    /// File whose contents are the secret.
    File(PathBuf),
}

impl CredentialsHandle {
    /// Key path to use for SSH, if this handle names one.
    pub fn ssh_key_path(
        &self,
        provider: &dyn SecretProvider,
    ) -> Result<Option<PathBuf>, CredentialsError> {
        match self {
            CredentialsHandle::Agent => Ok(None),
            CredentialsHandle::KeyFile(path) => Ok(Some(expand_home(path))),
            CredentialsHandle::File(path) => Ok(Some(expand_home(path))),
            CredentialsHandle::Env(_) => {
                let secret = provider.resolve(self)?;
                Ok(Some(expand_home(Path::new(secret.expose()))))
            }
        }
    }
}

impl fmt::Display for CredentialsHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsHandle::Agent => write!(f, "ssh-agent"),
            CredentialsHandle::KeyFile(path) => write!(f, "key file {}", path.display()),
            CredentialsHandle::Env(var) => write!(f, "${}", var),
            CredentialsHandle::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("failed to read secret from {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("secret from {0} is empty")]
    Empty(String),

    #[error("{0} does not carry a secret value")]
    NotASecret(String),
}

/// A resolved secret. Debug output is redacted.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Resolves credential handles into secrets when a collaborator needs them.
pub trait SecretProvider: Send + Sync {
    fn resolve(&self, handle: &CredentialsHandle) -> Result<Secret, CredentialsError>;
}

/// Resolves handles from the process environment and local files.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretProvider;

impl SecretProvider for EnvSecretProvider {
    fn resolve(&self, handle: &CredentialsHandle) -> Result<Secret, CredentialsError> {
        let value = match handle {
            CredentialsHandle::Env(var) => std::env::var(var)
                .map_err(|_| CredentialsError::MissingEnvVar(var.clone()))?,
            CredentialsHandle::File(path) | CredentialsHandle::KeyFile(path) => {
                let path = expand_home(path);
                std::fs::read_to_string(&path)
                    .map_err(|source| CredentialsError::Unreadable { path, source })?
            }
            CredentialsHandle::Agent => {
                return Err(CredentialsError::NotASecret(handle.to_string()));
            }
        };

        let value = value.trim();
        if value.is_empty() {
            return Err(CredentialsError::Empty(handle.to_string()));
        }
        Ok(Secret::new(value))
    }
}

/// Expand a leading `~/` using `$HOME`.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}
