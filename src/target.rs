use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::Ipv6Addr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_HTTP_PORTS: &[u16] = &[80, 443, 8080, 8443];

pub const DEFAULT_SECURE_PORTS: &[u16] = &[443, 8443];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn for_port(port: u16, secure_ports: &BTreeSet<u16>) -> Self {
        if secure_ports.contains(&port) {
            Self::Https
        } else {
            Self::Http
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds `{scheme}://{target}:{port}` for a port. Pure, no network access.
pub fn resolve_base_url(target: &str, port: u16, secure_ports: &BTreeSet<u16>) -> String {
    let scheme = Scheme::for_port(port, secure_ports);
    let host = target.trim();
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("{scheme}://[{host}]:{port}")
    } else {
        format!("{scheme}://{host}:{port}")
    }
}

pub fn default_secure_ports() -> BTreeSet<u16> {
    DEFAULT_SECURE_PORTS.iter().copied().collect()
}

/// One entry of the port map handed over by the service-discovery stage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub protocol: String,
}

impl ServiceInfo {
    pub fn is_web(&self) -> bool {
        matches!(
            self.name.trim().to_ascii_lowercase().as_str(),
            "http" | "https"
        )
    }
}

pub type ServiceMap = BTreeMap<u16, ServiceInfo>;

/// Ports whose service is `http`/`https`, ascending. Falls back to the common web ports.
pub fn candidate_http_ports(services: &ServiceMap) -> Vec<u16> {
    let ports: Vec<u16> = services
        .iter()
        .filter(|(_, svc)| svc.is_web())
        .map(|(port, _)| *port)
        .collect();
    if ports.is_empty() {
        DEFAULT_HTTP_PORTS.to_vec()
    } else {
        ports
    }
}

pub fn parse_service_map(json: &str) -> Result<ServiceMap, serde_json::Error> {
    serde_json::from_str(json)
}
