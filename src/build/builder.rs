// ABOUTME: Context validation and build orchestration for a single image.
// ABOUTME: ArtifactBuilder checks the context, then runs the tool under a timeout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::BuildConfig;
use crate::types::ImageReference;

use super::{BuildError, BuildRequest, BuildSpec, BuildTool};

/// Produces an image reference (with digest) from a build spec.
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    async fn build(&self, spec: &BuildSpec) -> Result<ImageReference, BuildError>;
}

/// Validates the build context and delegates to a [`BuildTool`].
#[derive(Debug, Clone)]
pub struct ArtifactBuilder<T> {
    tool: T,
    dockerfile: PathBuf,
    required_files: Vec<PathBuf>,
    timeout: Duration,
}

impl<T: BuildTool> ArtifactBuilder<T> {
    pub fn new(tool: T, config: &BuildConfig) -> Self {
        Self {
            tool,
            dockerfile: config.dockerfile.clone(),
            required_files: config.required_files(),
            timeout: config.timeout,
        }
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    /// Check that the context exists, is a readable directory, and holds
    /// every required file.
    async fn validate_context(&self, context: &Path) -> Result<(), BuildError> {
        let metadata = tokio::fs::metadata(context)
            .await
            .map_err(|e| BuildError::context(context, format!("cannot access: {}", e)))?;

        if !metadata.is_dir() {
            return Err(BuildError::context(context, "not a directory"));
        }

        tokio::fs::read_dir(context)
            .await
            .map_err(|e| BuildError::context(context, format!("unreadable: {}", e)))?;

        for file in &self.required_files {
            let path = context.join(file);
            match tokio::fs::metadata(&path).await {
                Ok(m) if m.is_file() => {}
                _ => {
                    return Err(BuildError::context(
                        context,
                        format!("missing required file {}", file.display()),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<T: BuildTool> ImageBuilder for ArtifactBuilder<T> {
    async fn build(&self, spec: &BuildSpec) -> Result<ImageReference, BuildError> {
        let context = spec.context_path();
        self.validate_context(context).await?;

        tracing::info!(image = %spec.image(), context = %context.display(), "building image");

        let request = BuildRequest {
            context,
            dockerfile: &self.dockerfile,
            image: spec.image(),
        };

        let digest = match tokio::time::timeout(self.timeout, self.tool.build(request)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(BuildError::compile(
                    None,
                    format!("build timed out after {:?}", self.timeout),
                ));
            }
        };

        tracing::info!(image = %spec.image(), %digest, "image built");
        Ok(spec.image().with_digest(digest))
    }
}
