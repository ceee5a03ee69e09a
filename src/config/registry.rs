// ABOUTME: Registry login configuration.
// ABOUTME: The password is a credentials handle resolved at publish time.

use serde::{Deserialize, Serialize};

use super::CredentialsHandle;

/// Credentials for the image registry. Holds handles, never secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCredentials {
    /// Registry host; `None` means the runtime's default (Docker Hub).
    #[serde(default)]
    pub server: Option<String>,
    pub username: String,
    pub password: CredentialsHandle,
}
