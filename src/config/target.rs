// ABOUTME: Deployment target: the single remote host and the container it runs.
// ABOUTME: Parses host shorthands like "host", "user@host", "host:port", "user@host:port".

use crate::types::{ContainerName, PortMapping, RuntimeType};
use serde::{Deserialize, Serialize};

use super::CredentialsHandle;

/// Where a deployment lands. Read-only to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TargetConfig")]
pub struct DeploymentTarget {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub credentials: CredentialsHandle,
    pub container: ContainerName,
    pub ports: Vec<PortMapping>,
    pub runtime: RuntimeType,
    pub trust_first_connection: bool,
}

/// Identity used for mutual exclusion and "last deployed" lookups.
pub type TargetKey = String;

impl DeploymentTarget {
    pub fn new(host: impl Into<String>, container: ContainerName) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            user: None,
            credentials: CredentialsHandle::default(),
            container,
            ports: Vec::new(),
            runtime: RuntimeType::default(),
            trust_first_connection: false,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn credentials(mut self, credentials: CredentialsHandle) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn publish(mut self, mapping: PortMapping) -> Self {
        self.ports.push(mapping);
        self
    }

    pub fn runtime(mut self, runtime: RuntimeType) -> Self {
        self.runtime = runtime;
        self
    }

    /// `host:port/container`.
    pub fn key(&self) -> TargetKey {
        format!("{}:{}/{}", self.host, self.port, self.container)
    }

    /// Login user, falling back to `$USER` and then `root`.
    pub fn login_user(&self) -> String {
        self.user
            .clone()
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct TargetConfig {
    host: String,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    credentials: CredentialsHandle,
    container: ContainerName,
    #[serde(default)]
    ports: Vec<PortMapping>,
    #[serde(default)]
    runtime: RuntimeType,
    #[serde(default)]
    trust_first_connection: bool,
}

impl TryFrom<TargetConfig> for DeploymentTarget {
    type Error = String;

    fn try_from(config: TargetConfig) -> Result<Self, Self::Error> {
        let address = HostAddress::parse(&config.host)?;

        Ok(DeploymentTarget {
            host: address.host,
            port: config.port.or(address.port).unwrap_or_else(default_port),
            user: config.user.or(address.user),
            credentials: config.credentials,
            container: config.container,
            ports: config.ports,
            runtime: config.runtime,
            trust_first_connection: config.trust_first_connection,
        })
    }
}

fn default_port() -> u16 {
    22
}

/// A `[user@]host[:port]` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAddress {
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
}

impl HostAddress {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("server address cannot be empty".to_string());
        }

        let (user, rest) = match s.split_once('@') {
            Some((user, _)) if user.is_empty() => {
                return Err("user cannot be empty".to_string());
            }
            Some((user, rest)) => (Some(user.to_string()), rest),
            None => (None, s),
        };

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port_str)) => {
                let port = port_str
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port: {}", port_str))?;
                (host, Some(port))
            }
            None => (rest, None),
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        Ok(HostAddress {
            host: host.to_string(),
            port,
            user,
        })
    }
}
