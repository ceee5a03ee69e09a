// ABOUTME: SSH client module for reaching deployment targets.
// ABOUTME: Supports SSH agent and key-based authentication with known_hosts verification.

mod client;
mod error;

pub use client::{CommandOutput, DEFAULT_CONNECT_TIMEOUT, Session, SessionConfig};
pub use error::{Error, Result};
