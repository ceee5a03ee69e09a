// ABOUTME: RegistryClient stand-in with scripted failures.
// ABOUTME: Counts login and upload calls so retry behaviour can be asserted exactly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use hoist::config::RegistryCredentials;
use hoist::registry::{PublishError, RegistryClient};
use hoist::types::ImageReference;

#[derive(Default)]
pub struct FlakyRegistry {
    transfer_failures: u32,
    reject_login: bool,
    deny_push: bool,
    logins: AtomicU32,
    uploads: AtomicU32,
    pushes_per_tag: Mutex<HashMap<String, u32>>,
}

impl FlakyRegistry {
    /// Accepts every upload.
    pub fn healthy() -> Self {
        Self::default()
    }

    /// The first `n` uploads fail with a transfer error.
    pub fn failing_uploads(n: u32) -> Self {
        Self {
            transfer_failures: n,
            ..Self::default()
        }
    }

    /// Login is rejected.
    pub fn rejecting_login() -> Self {
        Self {
            reject_login: true,
            ..Self::default()
        }
    }

    /// Pushes are denied for lack of permission.
    pub fn denying_push() -> Self {
        Self {
            deny_push: true,
            ..Self::default()
        }
    }

    pub fn logins(&self) -> u32 {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> u32 {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryClient for FlakyRegistry {
    async fn authenticate(&self, _credentials: &RegistryCredentials) -> Result<(), PublishError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if self.reject_login {
            return Err(PublishError::Auth("incorrect username or password".to_string()));
        }
        Ok(())
    }

    async fn upload(&self, image: &ImageReference) -> Result<String, PublishError> {
        let attempt = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        if self.deny_push {
            return Err(PublishError::Auth(
                "denied: requested access to the resource is denied".to_string(),
            ));
        }
        if attempt <= self.transfer_failures {
            return Err(PublishError::Transfer("connection reset by peer".to_string()));
        }
        // Pushing a tag again moves it to a new manifest.
        let mut pushes = self.pushes_per_tag.lock();
        let n = pushes.entry(image.tag().to_string()).or_insert(0);
        *n += 1;
        Ok(match *n {
            1 => format!("sha256:registry-{}", image.tag()),
            n => format!("sha256:registry-{}-{}", image.tag(), n),
        })
    }
}
