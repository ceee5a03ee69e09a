// ABOUTME: Immutable build request submitted with each deployment.
// ABOUTME: Pairs a context directory with the image name and tag to produce.

use std::path::{Path, PathBuf};

use crate::types::{ImageReference, ParseImageRefError};

/// What to build. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    context_path: PathBuf,
    image: ImageReference,
}

impl BuildSpec {
    pub fn new(
        context_path: impl Into<PathBuf>,
        image_name: &str,
        tag: &str,
    ) -> Result<Self, ParseImageRefError> {
        Ok(Self {
            context_path: context_path.into(),
            image: ImageReference::new(image_name, tag)?,
        })
    }

    pub fn context_path(&self) -> &Path {
        &self.context_path
    }

    pub fn image_name(&self) -> &str {
        self.image.name()
    }

    pub fn tag(&self) -> &str {
        self.image.tag()
    }

    /// The reference this build will produce, before a digest is known.
    pub fn image(&self) -> &ImageReference {
        &self.image
    }
}
