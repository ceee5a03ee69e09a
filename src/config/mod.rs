// ABOUTME: Configuration types and parsing for hoist.yml.
// ABOUTME: Handles YAML parsing, file discovery, and defaults for every section.

mod build;
mod credentials;
mod deploy;
mod healthcheck;
mod init;
mod registry;
mod target;

pub use build::BuildConfig;
pub use credentials::{
    CredentialsError, CredentialsHandle, EnvSecretProvider, Secret, SecretProvider,
};
pub use deploy::DeployConfig;
pub use healthcheck::HealthcheckConfig;
pub use init::init_config;
pub use registry::RegistryCredentials;
pub use target::{DeploymentTarget, HostAddress, TargetKey};

use crate::build::BuildSpec;
use crate::error::{Error, Result};
use crate::types::{ContainerName, ImageReference, PortMapping};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "hoist.yml";
pub const CONFIG_FILENAME_ALT: &str = "hoist.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".hoist/config.yml";

/// Floor for how long a live journal record is trusted to still be running.
const MIN_STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// pull, stop, rm, run
const REPLACE_COMMANDS: u32 = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Image name with an optional default tag, e.g. `myuser/flask-app:latest`.
    #[serde(deserialize_with = "deserialize_image_ref")]
    pub image: ImageReference,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub registry: Option<RegistryCredentials>,

    pub target: DeploymentTarget,

    #[serde(default)]
    pub healthcheck: Option<HealthcheckConfig>,

    #[serde(default)]
    pub deploy: DeployConfig,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Build request for this config, with optional CLI overrides.
    pub fn build_spec(&self, tag: Option<&str>, context: Option<&Path>) -> Result<BuildSpec> {
        let context = context
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.build.context.clone());
        let tag = tag.unwrap_or(self.image.tag());

        BuildSpec::new(context, self.image.name(), tag)
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Longest one deployment can take before every stage has hit its
    /// timeout, a rollback included.
    pub fn deployment_ceiling(&self) -> Duration {
        let deploy = &self.deploy;

        // One extra publish timeout covers the registry login.
        let attempts = deploy.max_publish_retries.max(1);
        let publish = deploy
            .publish_timeout
            .saturating_mul(attempts + 1)
            .saturating_add(deploy.max_retry_delay.saturating_mul(attempts - 1));

        let mut commands = REPLACE_COMMANDS;
        let mut waits = Duration::ZERO;
        if let Some(health) = &self.healthcheck {
            let checks = 1 + u32::from(health.cmd.is_some());
            let polls = health.retries.max(1).saturating_mul(checks);
            commands = commands.saturating_add(polls);
            waits = health
                .start_period
                .saturating_add(health.interval.saturating_mul(polls));
        }
        let remote = crate::ssh::DEFAULT_CONNECT_TIMEOUT
            .saturating_add(deploy.remote_command_timeout().saturating_mul(commands))
            .saturating_add(waits);

        self.build
            .timeout
            .saturating_add(publish)
            .saturating_add(remote.saturating_mul(2))
    }

    /// How long a live journal record may go unfinished before it is
    /// failed as abandoned. Never less than an hour.
    pub fn stale_after(&self) -> Duration {
        self.deployment_ceiling().max(MIN_STALE_AFTER)
    }

    pub fn template() -> Self {
        let container = ContainerName::new("flask-app").expect("template container name is valid");
        let port = PortMapping::parse("5000:5000").expect("template port mapping is valid");

        Config {
            image: ImageReference::new("myuser/flask-app", "latest")
                .expect("template image is valid"),
            build: BuildConfig {
                entrypoint: Some(PathBuf::from("app.py")),
                manifest: Some(PathBuf::from("requirements.txt")),
                ..BuildConfig::default()
            },
            registry: Some(RegistryCredentials {
                server: None,
                username: "myuser".to_string(),
                password: CredentialsHandle::Env("DOCKERHUB_TOKEN".to_string()),
            }),
            target: DeploymentTarget::new("server.example.com", container)
                .user("ubuntu")
                .publish(port),
            healthcheck: Some(HealthcheckConfig {
                cmd: Some("curl -fsS http://localhost:5000/".to_string()),
                ..HealthcheckConfig::default()
            }),
            deploy: DeployConfig::default(),
        }
    }
}

fn deserialize_image_ref<'de, D>(deserializer: D) -> std::result::Result<ImageReference, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ImageReference::parse(&s).map_err(serde::de::Error::custom)
}
