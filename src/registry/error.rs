// ABOUTME: Error types for registry operations.
// ABOUTME: Separates authentication from transfer so retry policy can differ.

/// A single registry call failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PublishError {
    /// Credentials rejected or unresolvable. Never retried.
    #[error("registry authentication failed: {0}")]
    Auth(String),

    /// Upload failed, usually for transient network reasons. Retried.
    #[error("image transfer failed: {0}")]
    Transfer(String),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishErrorKind {
    Auth,
    Transfer,
}

impl PublishError {
    pub fn kind(&self) -> PublishErrorKind {
        match self {
            PublishError::Auth(_) => PublishErrorKind::Auth,
            PublishError::Transfer(_) => PublishErrorKind::Transfer,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == PublishErrorKind::Transfer
    }
}

/// Terminal publish failure, with the number of uploads attempted.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{error} (after {attempts} upload attempt(s))")]
pub struct PublishFailure {
    pub error: PublishError,
    pub attempts: u32,
}
