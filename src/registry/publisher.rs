// ABOUTME: Authenticate-then-upload sequence with the retry policy applied.
// ABOUTME: Reports how many upload attempts were made, on success or failure.

use std::time::Duration;

use crate::config::RegistryCredentials;
use crate::types::ImageReference;

use super::{PublishError, PublishFailure, RegistryClient, RetryPolicy};

/// A successfully published image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// The image carrying the registry manifest digest.
    pub image: ImageReference,
    /// Upload attempts made, including the successful one.
    pub attempts: u32,
}

/// Wraps a [`RegistryClient`] with credentials, timeouts, and retries.
#[derive(Debug)]
pub struct Publisher<R> {
    client: R,
    credentials: Option<RegistryCredentials>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl<R: RegistryClient> Publisher<R> {
    pub fn new(client: R, credentials: Option<RegistryCredentials>) -> Self {
        Self {
            client,
            credentials,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(600),
        }
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Ceiling for each individual registry call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn client(&self) -> &R {
        &self.client
    }

    /// Authenticate (if credentials are configured), then upload with retries.
    pub async fn publish(&self, image: &ImageReference) -> Result<Published, PublishFailure> {
        if let Some(ref credentials) = self.credentials {
            let auth = tokio::time::timeout(self.timeout, self.client.authenticate(credentials))
                .await
                .unwrap_or_else(|_| {
                    Err(PublishError::Auth(format!(
                        "login timed out after {:?}",
                        self.timeout
                    )))
                });
            auth.map_err(|error| PublishFailure { error, attempts: 0 })?;
        }

        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::info!(%image, attempt, max_attempts, "uploading image");

            let result = tokio::time::timeout(self.timeout, self.client.upload(image))
                .await
                .unwrap_or_else(|_| {
                    Err(PublishError::Transfer(format!(
                        "upload timed out after {:?}",
                        self.timeout
                    )))
                });

            match result {
                Ok(digest) => {
                    tracing::info!(%image, %digest, attempts = attempt, "image published");
                    return Ok(Published {
                        image: image.with_digest(digest),
                        attempts: attempt,
                    });
                }
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        %image,
                        attempt,
                        ?delay,
                        error = %error,
                        "upload failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    return Err(PublishFailure {
                        error,
                        attempts: attempt,
                    });
                }
            }
        }
    }
}
