// ABOUTME: The seam between the command runner and the channel that reaches the host.
// ABOUTME: Implemented by the SSH session; tests substitute an in-memory host.

use std::time::Duration;

use async_trait::async_trait;

use crate::ssh::{self, CommandOutput, Session};

/// Runs one shell line on the target host.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn exec(&self, line: &str, timeout: Duration) -> ssh::Result<CommandOutput>;
}

#[async_trait]
impl CommandTransport for Session {
    async fn exec(&self, line: &str, timeout: Duration) -> ssh::Result<CommandOutput> {
        self.exec_with_timeout(line, timeout).await
    }
}
