// ABOUTME: Registry publisher: authenticate, then upload a built image under its tag.
// ABOUTME: Auth failures abort immediately; transfer failures retry with exponential backoff.

mod client;
mod error;
mod publisher;
mod retry;

pub use client::{DockerCliRegistry, RegistryClient, parse_push_digest};
pub use error::{PublishError, PublishErrorKind, PublishFailure};
pub use publisher::{Published, Publisher};
pub use retry::RetryPolicy;
