//!
//! # AppService Spec
//!
//! Desired state of an application: which image to run, how many copies and
//! which ports to expose.
//!
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

#[derive(Deserialize, Serialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppServiceSpec {
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<AppServicePort>,
}

impl AppServiceSpec {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    pub fn with_replicas(mut self, replicas: i32) -> Self {
        self.replicas = Some(replicas);
        self
    }

    pub fn with_port(mut self, port: AppServicePort) -> Self {
        self.ports.push(port);
        self
    }
}

/// Port exposed by the service and opened on the container
#[derive(Deserialize, Serialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppServicePort {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_port: Option<PortTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_port: Option<u16>,
}

impl AppServicePort {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    pub fn target(mut self, target: impl Into<PortTarget>) -> Self {
        self.target_port = Some(target.into());
        self
    }

    pub fn node_port(mut self, node_port: u16) -> Self {
        self.node_port = Some(node_port);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// port the container listens on.
    /// named targets refer to a container port by name, so the service port is used as number
    pub fn container_port(&self) -> u16 {
        match &self.target_port {
            Some(PortTarget::Number(number)) => *number,
            _ => self.port,
        }
    }
}

/// target port is either a number or the name of a container port
#[derive(Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
#[serde(untagged)]
pub enum PortTarget {
    Number(u16),
    Name(String),
}

impl From<u16> for PortTarget {
    fn from(number: u16) -> Self {
        Self::Number(number)
    }
}

impl From<&str> for PortTarget {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl fmt::Display for PortTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}
