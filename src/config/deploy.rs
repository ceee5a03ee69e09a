// ABOUTME: Orchestrator policy settings: publish retries, remote timeouts, rollback.
// ABOUTME: Also locates the deployment journal on disk.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::registry::RetryPolicy;

/// Base directory for hoist state files (XDG Base Directory compliant).
const STATE_DIR: &str = ".local/state/hoist";
const JOURNAL_FILE: &str = "deployments.jsonl";

#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    /// Upload attempts, including the first.
    #[serde(default = "default_max_publish_retries")]
    pub max_publish_retries: u32,

    #[serde(default = "default_remote_command_timeout_seconds")]
    pub remote_command_timeout_seconds: u64,

    #[serde(default = "default_rollback_on_failure")]
    pub rollback_on_failure: bool,

    /// Ceiling for a single upload attempt.
    #[serde(default = "default_publish_timeout", with = "humantime_serde")]
    pub publish_timeout: Duration,

    /// Delay before the first publish retry; doubles on each further retry.
    #[serde(default = "default_retry_delay", with = "humantime_serde")]
    pub retry_delay: Duration,

    #[serde(default = "default_max_retry_delay", with = "humantime_serde")]
    pub max_retry_delay: Duration,

    /// Where the deployment journal lives (default `~/.local/state/hoist`).
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

impl DeployConfig {
    pub fn remote_command_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_command_timeout_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_publish_retries)
            .base_delay(self.retry_delay)
            .max_delay(self.max_retry_delay)
    }

    /// Journal path, or `None` if neither `state_dir` nor `$HOME` is available.
    pub fn journal_path(&self) -> Option<PathBuf> {
        let dir = match &self.state_dir {
            Some(dir) => dir.clone(),
            None => PathBuf::from(std::env::var_os("HOME")?).join(STATE_DIR),
        };
        Some(dir.join(JOURNAL_FILE))
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        DeployConfig {
            max_publish_retries: default_max_publish_retries(),
            remote_command_timeout_seconds: default_remote_command_timeout_seconds(),
            rollback_on_failure: default_rollback_on_failure(),
            publish_timeout: default_publish_timeout(),
            retry_delay: default_retry_delay(),
            max_retry_delay: default_max_retry_delay(),
            state_dir: None,
        }
    }
}

fn default_max_publish_retries() -> u32 {
    3
}

fn default_remote_command_timeout_seconds() -> u64 {
    300
}

fn default_rollback_on_failure() -> bool {
    true
}

fn default_publish_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_retry_delay() -> Duration {
    Duration::from_secs(30)
}
