// ABOUTME: Registry client trait and the docker/podman CLI implementation.
// ABOUTME: Login reads the password from stdin; push output yields the manifest digest.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::{RegistryCredentials, SecretProvider};
use crate::types::{ImageReference, RuntimeType};

use super::PublishError;

/// Remote image registry operations.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Log in to the registry.
    async fn authenticate(&self, credentials: &RegistryCredentials) -> Result<(), PublishError>;

    /// Push the image under its tag and return the registry's manifest digest.
    ///
    /// The tag must only become visible to pullers once the whole artifact is
    /// stored; a failed upload leaves the previous tag in place.
    async fn upload(&self, image: &ImageReference) -> Result<String, PublishError>;
}

/// Publishes through the docker-compatible CLI of the configured runtime.
pub struct DockerCliRegistry {
    runtime: RuntimeType,
    secrets: Arc<dyn SecretProvider>,
}

impl DockerCliRegistry {
    pub fn new(runtime: RuntimeType, secrets: Arc<dyn SecretProvider>) -> Self {
        Self { runtime, secrets }
    }
}

impl std::fmt::Debug for DockerCliRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerCliRegistry")
            .field("runtime", &self.runtime)
            .finish()
    }
}

#[async_trait]
impl RegistryClient for DockerCliRegistry {
    async fn authenticate(&self, credentials: &RegistryCredentials) -> Result<(), PublishError> {
        let password = self
            .secrets
            .resolve(&credentials.password)
            .map_err(|e| PublishError::Auth(e.to_string()))?;

        let mut cmd = Command::new(self.runtime.program());
        cmd.arg("login")
            .arg("--username")
            .arg(&credentials.username)
            .arg("--password-stdin");
        if let Some(ref server) = credentials.server {
            cmd.arg(server);
        }

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PublishError::Auth(format!("failed to run {} login: {}", self.runtime, e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(password.expose().as_bytes())
                .await
                .map_err(|e| PublishError::Auth(format!("failed to send password: {}", e)))?;
            // Dropping stdin closes it so login can proceed.
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| PublishError::Auth(e.to_string()))?;

        if !output.status.success() {
            return Err(PublishError::Auth(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        tracing::debug!(user = %credentials.username, "registry login succeeded");
        Ok(())
    }

    async fn upload(&self, image: &ImageReference) -> Result<String, PublishError> {
        let digest_file = tempfile::NamedTempFile::new()
            .map_err(|e| PublishError::Transfer(format!("failed to create digest file: {}", e)))?;

        let mut cmd = Command::new(self.runtime.program());
        cmd.arg("push");
        // Podman is quiet about digests unless asked for a digest file.
        if self.runtime == RuntimeType::Podman {
            cmd.arg("--digestfile").arg(digest_file.path());
        }
        cmd.arg(image.reference());

        let output = cmd
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                PublishError::Transfer(format!("failed to run {} push: {}", self.runtime, e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let message = stderr.trim().to_string();
            return Err(if is_auth_failure(&message) {
                PublishError::Auth(message)
            } else {
                PublishError::Transfer(message)
            });
        }

        let digest = match self.runtime {
            RuntimeType::Podman => tokio::fs::read_to_string(digest_file.path())
                .await
                .ok()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            RuntimeType::Docker => parse_push_digest(&stdout),
        };

        digest.ok_or_else(|| {
            PublishError::Transfer(format!("push of {} reported no digest", image))
        })
    }
}

/// Extract `sha256:...` from push output such as
/// `v1: digest: sha256:abcd size: 1573`.
pub fn parse_push_digest(output: &str) -> Option<String> {
    output.lines().rev().find_map(|line| {
        let mut words = line.split_whitespace();
        while let Some(word) = words.next() {
            if word == "digest:" {
                return words
                    .next()
                    .filter(|d| d.contains(':'))
                    .map(str::to_string);
            }
        }
        None
    })
}

fn is_auth_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["denied", "unauthorized", "authentication required"]
        .iter()
        .any(|needle| lower.contains(needle))
}
