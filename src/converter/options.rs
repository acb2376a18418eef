//! Conversion options shared by every projector.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlatform {
    Kubernetes,
    Swarm,
    #[default]
    Both,
}

impl TargetPlatform {
    pub fn includes_kubernetes(&self) -> bool {
        matches!(self, TargetPlatform::Kubernetes | TargetPlatform::Both)
    }

    pub fn includes_swarm(&self) -> bool {
        matches!(self, TargetPlatform::Swarm | TargetPlatform::Both)
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetPlatform::Kubernetes => "kubernetes",
            TargetPlatform::Swarm => "swarm",
            TargetPlatform::Both => "both",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    #[default]
    Traefik,
    Nginx,
    Caddy,
    None,
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProxyType::Traefik => "traefik",
            ProxyType::Nginx => "nginx",
            ProxyType::Caddy => "caddy",
            ProxyType::None => "none",
        };
        write!(f, "{}", name)
    }
}

/// Named CPU/memory tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResourceProfile {
    #[default]
    Small,
    Medium,
    Large,
    Custom,
}

impl fmt::Display for ResourceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceProfile::Small => "small",
            ResourceProfile::Medium => "medium",
            ResourceProfile::Large => "large",
            ResourceProfile::Custom => "custom",
        };
        write!(f, "{}", name)
    }
}

/// Options for one conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionOptions {
    pub target_platform: TargetPlatform,
    pub proxy_type: ProxyType,
    pub add_health_checks: bool,
    pub add_resource_limits: bool,
    pub resource_profile: Option<ResourceProfile>,
    pub add_security: bool,
    pub namespace: Option<String>,
    pub lets_encrypt_email: Option<String>,
    /// Service name → public host name, used by proxy generators
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_domains: BTreeMap<String, String>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            target_platform: TargetPlatform::Both,
            proxy_type: ProxyType::Traefik,
            add_health_checks: true,
            add_resource_limits: true,
            resource_profile: Some(ResourceProfile::Medium),
            add_security: true,
            namespace: None,
            lets_encrypt_email: None,
            custom_domains: BTreeMap::new(),
        }
    }
}

impl ConversionOptions {
    pub fn namespace(&self) -> &str {
        self.namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Profile used by the Kubernetes and Swarm projectors: `custom` or a
    /// missing profile fall back to `small`.
    pub fn projector_profile(&self) -> ResourceProfile {
        match self.resource_profile {
            Some(profile @ (ResourceProfile::Small | ResourceProfile::Medium | ResourceProfile::Large)) => {
                profile
            }
            Some(ResourceProfile::Custom) | None => ResourceProfile::Small,
        }
    }

    pub fn tls_enabled(&self) -> bool {
        self.lets_encrypt_email
            .as_deref()
            .is_some_and(|email| !email.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projector_profile_fallback() {
        let mut options = ConversionOptions::default();
        assert_eq!(options.projector_profile(), ResourceProfile::Medium);

        options.resource_profile = Some(ResourceProfile::Custom);
        assert_eq!(options.projector_profile(), ResourceProfile::Small);

        options.resource_profile = None;
        assert_eq!(options.projector_profile(), ResourceProfile::Small);
    }

    #[test]
    fn test_namespace_default() {
        let mut options = ConversionOptions::default();
        assert_eq!(options.namespace(), "default");
        options.namespace = Some("prod".to_string());
        assert_eq!(options.namespace(), "prod");
    }

    #[test]
    fn test_options_deserialize_camel_case() {
        let options: ConversionOptions = serde_json::from_str(
            r#"{"targetPlatform":"kubernetes","proxyType":"none","addSecurity":false,"resourceProfile":"large"}"#,
        )
        .unwrap();
        assert_eq!(options.target_platform, TargetPlatform::Kubernetes);
        assert_eq!(options.proxy_type, ProxyType::None);
        assert!(!options.add_security);
        assert!(options.add_health_checks);
        assert_eq!(options.resource_profile, Some(ResourceProfile::Large));
    }
}
