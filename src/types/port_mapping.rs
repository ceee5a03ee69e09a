// ABOUTME: Host-to-container port bindings for the deployed container.
// ABOUTME: Parses forms like "80", "8080:80", "127.0.0.1:8080:80/udp".

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortMappingError {
    #[error("port mapping cannot be empty")]
    Empty,

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("unsupported protocol: {0}")]
    InvalidProtocol(String),

    #[error("invalid port mapping format: {0}")]
    InvalidFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortMapping {
    pub host_ip: Option<String>,
    pub host_port: Option<u16>,
    pub container_port: u16,
    pub protocol: Protocol,
}

impl PortMapping {
    pub fn parse(spec: &str) -> Result<Self, PortMappingError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(PortMappingError::Empty);
        }

        let (ports, protocol) = match spec.split_once('/') {
            Some((ports, "tcp")) => (ports, Protocol::Tcp),
            Some((ports, "udp")) => (ports, Protocol::Udp),
            Some((_, other)) => return Err(PortMappingError::InvalidProtocol(other.to_string())),
            None => (spec, Protocol::Tcp),
        };

        let parts: Vec<&str> = ports.split(':').collect();
        let (host_ip, host_port, container_port) = match parts.as_slice() {
            [container] => (None, None, parse_port(container)?),
            [host, container] => (None, Some(parse_port(host)?), parse_port(container)?),
            [ip, host, container] if !ip.is_empty() => (
                Some((*ip).to_string()),
                Some(parse_port(host)?),
                parse_port(container)?,
            ),
            _ => return Err(PortMappingError::InvalidFormat(spec.to_string())),
        };

        Ok(Self {
            host_ip,
            host_port,
            container_port,
            protocol,
        })
    }
}

fn parse_port(s: &str) -> Result<u16, PortMappingError> {
    match s.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(PortMappingError::InvalidPort(s.to_string())),
    }
}

/// Renders in the form accepted by `run --publish`.
impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref ip) = self.host_ip {
            write!(f, "{}:", ip)?;
        }
        if let Some(port) = self.host_port {
            write!(f, "{}:", port)?;
        }
        write!(f, "{}", self.container_port)?;
        if self.protocol == Protocol::Udp {
            write!(f, "/udp")?;
        }
        Ok(())
    }
}

impl Serialize for PortMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PortMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PortMapping::parse(&s).map_err(serde::de::Error::custom)
    }
}
