// ABOUTME: Container image reference parsing and validation.
// ABOUTME: Handles name:tag with an optional content digest (name:tag@sha256:...).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const MAX_TAG_LEN: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image name: {0}")]
    InvalidChar(char),

    #[error("image name must be lowercase: {0}")]
    NotLowercase(String),

    #[error("invalid image tag: {0}")]
    InvalidTag(String),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),
}

/// An image identified by name, tag, and (once built) content digest.
///
/// `name` may include a registry host and repository path
/// (e.g. `ghcr.io/org/app`). `digest` holds the local image id after a build
/// and the registry manifest digest after a publish.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    name: String,
    tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    digest: Option<String>,
}

impl ImageReference {
    /// Create a reference from a separately supplied name and tag.
    pub fn new(name: &str, tag: &str) -> Result<Self, ParseImageRefError> {
        validate_name(name)?;
        validate_tag(tag)?;
        Ok(Self {
            name: name.to_string(),
            tag: tag.to_string(),
            digest: None,
        })
    }

    /// Parse `name[:tag][@digest]`. A missing tag defaults to `latest`.
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        let (without_digest, digest) = match input.split_once('@') {
            Some((before, after)) => {
                if !after.contains(':') {
                    return Err(ParseImageRefError::InvalidFormat(input.to_string()));
                }
                (before, Some(after.to_string()))
            }
            None => (input, None),
        };

        // A colon followed by a slash belongs to a registry port, not a tag.
        let (name, tag) = match without_digest.rsplit_once(':') {
            Some((before, after)) if !after.contains('/') => (before, after),
            _ => (without_digest, "latest"),
        };

        let mut reference = Self::new(name, tag)?;
        reference.digest = digest;
        Ok(reference)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Registry host, if the name carries one.
    pub fn registry(&self) -> Option<&str> {
        let (first, _) = self.name.split_once('/')?;
        if first.contains('.') || first.contains(':') || first == "localhost" {
            Some(first)
        } else {
            None
        }
    }

    /// Copy of this reference carrying the given digest.
    pub fn with_digest(&self, digest: impl Into<String>) -> Self {
        Self {
            name: self.name.clone(),
            tag: self.tag.clone(),
            digest: Some(digest.into()),
        }
    }

    /// `name:tag`, the form pushed to a registry.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }

    /// `name@digest` once a digest is known, otherwise `name:tag`.
    ///
    /// Pulling and running the pinned form keeps naming the same artifact
    /// after the tag has been pushed over.
    pub fn pinned(&self) -> String {
        match &self.digest {
            Some(digest) => format!("{}@{}", self.name, digest),
            None => self.reference(),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

fn validate_name(name: &str) -> Result<(), ParseImageRefError> {
    if name.is_empty() {
        return Err(ParseImageRefError::Empty);
    }

    for c in name.chars() {
        if c.is_ascii_uppercase() {
            return Err(ParseImageRefError::NotLowercase(name.to_string()));
        }
        if !c.is_ascii_alphanumeric() && !matches!(c, '/' | '.' | '-' | '_' | ':') {
            return Err(ParseImageRefError::InvalidChar(c));
        }
    }

    if name.starts_with('/') || name.ends_with('/') || name.contains("//") {
        return Err(ParseImageRefError::InvalidFormat(name.to_string()));
    }

    Ok(())
}

fn validate_tag(tag: &str) -> Result<(), ParseImageRefError> {
    let valid = !tag.is_empty()
        && tag.len() <= MAX_TAG_LEN
        && !tag.starts_with('.')
        && !tag.starts_with('-')
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

    if valid {
        Ok(())
    } else {
        Err(ParseImageRefError::InvalidTag(tag.to_string()))
    }
}
