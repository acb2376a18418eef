//! Derived per-service metadata: parsed ports, volume mounts, flattened
//! environment and dependency names.

use super::model::{ComposeDocument, Environment, Service, scalar_to_string};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Some(Protocol::Tcp),
            "udp" => Some(Protocol::Udp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }

    /// Upper-case form used by Kubernetes port specs.
    pub fn kubernetes_name(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub host_port: u16,
    pub container_port: u16,
    pub protocol: Protocol,
}

/// Parses `[ip:][host:]container[/proto]`.
///
/// Returns `None` for anything that does not resolve to numeric ports, such as
/// ranges or unknown protocols.
pub fn parse_port(spec: &str) -> Option<PortMapping> {
    let spec = spec.trim();
    let (mapping, protocol) = match spec.rsplit_once('/') {
        Some((mapping, proto)) => (mapping, Protocol::parse(proto)?),
        None => (spec, Protocol::Tcp),
    };

    let parts: Vec<&str> = mapping.split(':').collect();
    let (host, container) = match parts.as_slice() {
        [container] => (*container, *container),
        [host, container] => (*host, *container),
        [_ip, host, container] => (*host, *container),
        _ => return None,
    };

    let container_port = container.trim().parse::<u16>().ok()?;
    // "127.0.0.1::80" leaves the host side to the engine
    let host_port = if host.trim().is_empty() {
        container_port
    } else {
        host.trim().parse::<u16>().ok()?
    };

    Some(PortMapping {
        host_port,
        container_port,
        protocol,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MountType {
    Bind,
    Volume,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    #[serde(rename = "type")]
    pub kind: MountType,
    pub source: String,
    pub target: String,
    pub read_only: bool,
}

impl VolumeMount {
    pub fn is_named(&self) -> bool {
        self.kind == MountType::Volume
    }
}

/// Parses `source:target[:mode]`. Anonymous volumes (a single path) yield `None`.
pub fn parse_volume(spec: &str) -> Option<VolumeMount> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() < 2 || parts[0].is_empty() || parts[1].is_empty() {
        return None;
    }

    let source = parts[0];
    let kind = if source.starts_with('/') || source.starts_with('.') {
        MountType::Bind
    } else {
        MountType::Volume
    };
    let read_only = parts
        .get(2)
        .is_some_and(|mode| mode.split(',').any(|flag| flag == "ro"));

    Some(VolumeMount {
        kind,
        source: source.to_string(),
        target: parts[1].to_string(),
        read_only,
    })
}

/// Flattens either environment form into `KEY -> VALUE`.
///
/// List entries split on the first `=`; later duplicates win.
pub fn flatten_environment(environment: &Environment) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    match environment {
        Environment::List(entries) => {
            for entry in entries {
                let (key, value) = match entry.split_once('=') {
                    Some((key, value)) => (key, value),
                    None => (entry.as_str(), ""),
                };
                if key.is_empty() {
                    continue;
                }
                vars.insert(key.to_string(), value.to_string());
            }
        }
        Environment::Map(map) => {
            for (key, value) in map {
                vars.insert(key.clone(), scalar_to_string(value));
            }
        }
    }
    vars
}

/// Read-only facts derived from one compose service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub ports: Vec<PortMapping>,
    pub volumes: Vec<VolumeMount>,
    pub environment_variables: BTreeMap<String, String>,
    pub depends_on: Vec<String>,
    pub has_health_check: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
}

impl ServiceMetadata {
    pub fn from_service(name: &str, service: &Service) -> Self {
        let ports = service
            .ports
            .iter()
            .filter_map(|spec| {
                let parsed = parse_port(spec);
                if parsed.is_none() {
                    log::debug!("Service '{}': dropping unparseable port '{}'", name, spec);
                }
                parsed
            })
            .collect();

        let volumes = service
            .volumes
            .iter()
            .filter_map(|spec| parse_volume(spec))
            .collect();

        Self {
            name: name.to_string(),
            image: service.image.clone(),
            ports,
            volumes,
            environment_variables: service
                .environment
                .as_ref()
                .map(flatten_environment)
                .unwrap_or_default(),
            depends_on: service
                .depends_on
                .as_ref()
                .map(|d| d.names())
                .unwrap_or_default(),
            has_health_check: service.healthcheck.is_some(),
            replicas: service.deploy.as_ref().and_then(|d| d.replicas),
        }
    }

    pub fn first_container_port(&self) -> Option<u16> {
        self.ports.first().map(|p| p.container_port)
    }
}

/// Metadata for a whole document.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeMetadata {
    pub services: Vec<ServiceMetadata>,
    pub volume_names: Vec<String>,
    pub network_names: Vec<String>,
}

impl ComposeMetadata {
    pub fn from_document(document: &ComposeDocument) -> Self {
        Self {
            services: document
                .services
                .iter()
                .map(|(name, service)| ServiceMetadata::from_service(name, service))
                .collect(),
            volume_names: document.volumes.keys().cloned().collect(),
            network_names: document.networks.keys().cloned().collect(),
        }
    }

    pub fn service(&self, name: &str) -> Option<&ServiceMetadata> {
        self.services.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port_forms() {
        assert_eq!(
            parse_port("8080:80"),
            Some(PortMapping {
                host_port: 8080,
                container_port: 80,
                protocol: Protocol::Tcp
            })
        );
        assert_eq!(
            parse_port("127.0.0.1:8080:80"),
            Some(PortMapping {
                host_port: 8080,
                container_port: 80,
                protocol: Protocol::Tcp
            })
        );
        assert_eq!(
            parse_port("80"),
            Some(PortMapping {
                host_port: 80,
                container_port: 80,
                protocol: Protocol::Tcp
            })
        );
        assert_eq!(
            parse_port("8080:80/udp"),
            Some(PortMapping {
                host_port: 8080,
                container_port: 80,
                protocol: Protocol::Udp
            })
        );
    }

    #[test]
    fn test_parse_port_drops_garbage() {
        assert_eq!(parse_port("abc"), None);
        assert_eq!(parse_port("8000-8010:8000-8010"), None);
        assert_eq!(parse_port("80/sctp"), None);
        assert_eq!(parse_port("70000:80"), None);
    }

    #[test]
    fn test_parse_port_empty_host_uses_container() {
        let port = parse_port("127.0.0.1::5432").unwrap();
        assert_eq!(port.host_port, 5432);
        assert_eq!(port.container_port, 5432);
    }

    #[test]
    fn test_parse_volume_kinds() {
        let bind = parse_volume("./data:/app/data").unwrap();
        assert_eq!(bind.kind, MountType::Bind);
        assert!(!bind.read_only);

        let abs = parse_volume("/etc/conf:/conf:ro").unwrap();
        assert_eq!(abs.kind, MountType::Bind);
        assert!(abs.read_only);

        let named = parse_volume("cache:/app/cache").unwrap();
        assert_eq!(named.kind, MountType::Volume);
        assert_eq!(named.source, "cache");
        assert_eq!(named.target, "/app/cache");

        assert_eq!(parse_volume("/anonymous"), None);
    }

    #[test]
    fn test_environment_list_keeps_extra_equals() {
        let env = Environment::List(vec![
            "DATABASE_URL=postgres://u:p@db/app?sslmode=disable&x=1".to_string(),
            "EMPTY".to_string(),
            "MODE=dev".to_string(),
            "MODE=prod".to_string(),
        ]);
        let vars = flatten_environment(&env);
        assert_eq!(
            vars["DATABASE_URL"],
            "postgres://u:p@db/app?sslmode=disable&x=1"
        );
        assert_eq!(vars["EMPTY"], "");
        assert_eq!(vars["MODE"], "prod");
    }

    #[test]
    fn test_environment_map_stringifies() {
        let env: Environment = serde_yaml::from_str("PORT: 8080\nDEBUG: true\nNAME: app\n").unwrap();
        let vars = flatten_environment(&env);
        assert_eq!(vars["PORT"], "8080");
        assert_eq!(vars["DEBUG"], "true");
        assert_eq!(vars["NAME"], "app");
    }
}
