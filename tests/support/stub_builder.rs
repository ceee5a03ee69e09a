// ABOUTME: ImageBuilder stand-in that never touches a build tool.
// ABOUTME: Can fail on demand or hold a build open until released.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

use hoist::build::{BuildError, BuildSpec, ImageBuilder};
use hoist::types::ImageReference;

#[derive(Default)]
pub struct StubBuilder {
    calls: AtomicU32,
    fail: Option<String>,
    gate: Option<Arc<Notify>>,
}

impl StubBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every build fails at the compile stage with `stderr`.
    pub fn failing(stderr: &str) -> Self {
        Self {
            fail: Some(stderr.to_string()),
            ..Self::default()
        }
    }

    /// Builds wait until the returned handle is notified.
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let builder = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (builder, gate)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageBuilder for StubBuilder {
    async fn build(&self, spec: &BuildSpec) -> Result<ImageReference, BuildError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }

        match self.fail {
            Some(ref stderr) => Err(BuildError::Compile {
                exit_code: Some(1),
                stderr: stderr.clone(),
            }),
            None => Ok(spec
                .image()
                .with_digest(format!("sha256:local-{}", spec.tag()))),
        }
    }
}
