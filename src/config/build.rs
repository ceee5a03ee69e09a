// ABOUTME: Build context configuration.
// ABOUTME: Names the context directory, dockerfile, and files that must be present.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_context")]
    pub context: PathBuf,

    /// Dockerfile path, relative to the context.
    #[serde(default = "default_dockerfile")]
    pub dockerfile: PathBuf,

    /// Application entrypoint that must exist in the context (e.g. `app.py`).
    #[serde(default)]
    pub entrypoint: Option<PathBuf>,

    /// Dependency manifest that must exist in the context (e.g. `requirements.txt`).
    #[serde(default)]
    pub manifest: Option<PathBuf>,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl BuildConfig {
    /// Files the context must contain, relative to the context root.
    pub fn required_files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.dockerfile.clone()];
        files.extend(self.entrypoint.iter().cloned());
        files.extend(self.manifest.iter().cloned());
        files
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            context: default_context(),
            dockerfile: default_dockerfile(),
            entrypoint: None,
            manifest: None,
            timeout: default_timeout(),
        }
    }
}

fn default_context() -> PathBuf {
    PathBuf::from(".")
}

fn default_dockerfile() -> PathBuf {
    PathBuf::from("Dockerfile")
}

fn default_timeout() -> Duration {
    Duration::from_secs(600)
}
