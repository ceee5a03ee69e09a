// ABOUTME: Post-start health verification settings.
// ABOUTME: Polls the new container until it is running and an optional host command passes.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct HealthcheckConfig {
    /// Command run on the target host after the container is up,
    /// e.g. `curl -fsS http://localhost:5000/`.
    #[serde(default)]
    pub cmd: Option<String>,

    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default, with = "humantime_serde")]
    pub start_period: Duration,
}

impl Default for HealthcheckConfig {
    fn default() -> Self {
        HealthcheckConfig {
            cmd: None,
            interval: default_interval(),
            retries: default_retries(),
            start_period: Duration::ZERO,
        }
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_retries() -> u32 {
    5
}
