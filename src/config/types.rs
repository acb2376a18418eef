use crate::converter::{ConversionOptions, ProxyType, ResourceProfile, TargetPlatform};
use crate::validator::OutputFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub conversion: ConversionDefaults,
    pub validation: ValidationConfig,
    pub output: OutputConfig,
}

/// Defaults for the `convert` command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionDefaults {
    /// Name used for the Helm chart; defaults to the compose file's directory
    pub project_name: Option<String>,
    pub platform: TargetPlatform,
    pub proxy: ProxyType,
    pub health_checks: bool,
    pub resource_limits: bool,
    pub profile: ResourceProfile,
    pub security: bool,
    pub namespace: String,
    pub lets_encrypt_email: Option<String>,
    pub domains: BTreeMap<String, String>,
    /// Apply production optimizations to the Swarm stack
    pub optimize_swarm: bool,
}

impl Default for ConversionDefaults {
    fn default() -> Self {
        Self {
            project_name: None,
            platform: TargetPlatform::Both,
            proxy: ProxyType::Traefik,
            health_checks: true,
            resource_limits: true,
            profile: ResourceProfile::Medium,
            security: true,
            namespace: "default".to_string(),
            lets_encrypt_email: None,
            domains: BTreeMap::new(),
            optimize_swarm: false,
        }
    }
}

impl ConversionDefaults {
    pub fn to_options(&self) -> ConversionOptions {
        ConversionOptions {
            target_platform: self.platform,
            proxy_type: self.proxy,
            add_health_checks: self.health_checks,
            add_resource_limits: self.resource_limits,
            resource_profile: Some(self.profile),
            add_security: self.security,
            namespace: Some(self.namespace.clone()),
            lets_encrypt_email: self.lets_encrypt_email.clone(),
            custom_domains: self.domains.clone(),
        }
    }
}

/// Validation thresholds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_score: u8,
    pub fail_on_warnings: bool,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("deploy"),
            format: OutputFormat::Stylish,
        }
    }
}
