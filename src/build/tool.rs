// ABOUTME: External image build tool invocation.
// ABOUTME: DockerCli shells out to `docker build` / `podman build` and reads the image id.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::types::{ImageReference, RuntimeType};

use super::BuildError;

/// Arguments for one build invocation.
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub context: &'a Path,
    pub dockerfile: &'a Path,
    pub image: &'a ImageReference,
}

/// An external tool that builds and tags an image, returning its content digest.
#[async_trait]
pub trait BuildTool: Send + Sync {
    async fn build(&self, request: BuildRequest<'_>) -> Result<String, BuildError>;
}

/// Builds with the docker-compatible CLI of the configured runtime.
#[derive(Debug, Clone, Default)]
pub struct DockerCli {
    runtime: RuntimeType,
}

impl DockerCli {
    pub fn new(runtime: RuntimeType) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl BuildTool for DockerCli {
    async fn build(&self, request: BuildRequest<'_>) -> Result<String, BuildError> {
        let iid_file = tempfile::NamedTempFile::new()
            .map_err(|e| BuildError::compile(None, format!("failed to create iid file: {}", e)))?;

        let output = Command::new(self.runtime.program())
            .arg("build")
            .arg("--tag")
            .arg(request.image.reference())
            .arg("--iidfile")
            .arg(iid_file.path())
            .arg("--file")
            .arg(request.context.join(request.dockerfile))
            .arg(request.context)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                BuildError::compile(
                    None,
                    format!("failed to run {} build: {}", self.runtime, e),
                )
            })?;

        if !output.status.success() {
            return Err(BuildError::compile(
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let image_id = tokio::fs::read_to_string(iid_file.path())
            .await
            .map_err(|e| BuildError::compile(None, format!("failed to read image id: {}", e)))?;
        let image_id = image_id.trim();

        if image_id.is_empty() {
            return Err(BuildError::compile(
                None,
                "build succeeded but produced no image id",
            ));
        }

        Ok(image_id.to_string())
    }
}
