pub mod types;

pub use types::{Config, ConversionDefaults, OutputConfig, ValidationConfig};

use crate::error::{ConfigError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = ".compose-bridge.toml";

/// Get the global config file path (~/.compose-bridge.toml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
}

/// Get the local config file path (project/.compose-bridge.toml)
pub fn local_config_path(project_path: &Path) -> PathBuf {
    project_path.join(CONFIG_FILE_NAME)
}

/// Read and parse a config file, failing on any problem.
pub fn read_config(path: &Path) -> std::result::Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn read_implicit(path: &Path) -> Option<Config> {
    if !path.exists() {
        return None;
    }
    match read_config(path) {
        Ok(config) => {
            log::debug!("Loaded configuration from {}", path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("Ignoring configuration {}: {}", path.display(), e);
            None
        }
    }
}

/// Load configuration.
/// An explicit path must exist and parse. Otherwise checks local config
/// first, then global config, then falls back to defaults.
pub fn load_config(explicit: Option<&Path>, project_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return Ok(read_config(path)?);
    }

    if let Some(config) = project_path.and_then(|p| read_implicit(&local_config_path(p))) {
        return Ok(config);
    }

    if let Some(config) = global_config_path().and_then(|g| read_implicit(&g)) {
        return Ok(config);
    }

    Ok(Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{ProxyType, ResourceProfile, TargetPlatform};
    use crate::error::BridgeError;
    use crate::validator::OutputFormat;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            local_config_path(dir.path()),
            "[conversion]\nplatform = \"kubernetes\"\nprofile = \"large\"\n\n[validation]\nmin_score = 70\n",
        )
        .unwrap();

        let config = load_config(None, Some(dir.path())).unwrap();
        assert_eq!(config.conversion.platform, TargetPlatform::Kubernetes);
        assert_eq!(config.conversion.profile, ResourceProfile::Large);
        assert_eq!(config.conversion.proxy, ProxyType::Traefik);
        assert_eq!(config.validation.min_score, 70);
        assert_eq!(config.output.format, OutputFormat::Stylish);
        assert_eq!(config.output.directory, PathBuf::from("deploy"));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_config(Some(&missing), None).unwrap_err();
        assert!(matches!(err, BridgeError::Config(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_explicit_path_must_parse() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[conversion\n").unwrap();
        let err = load_config(Some(&path), None).unwrap_err();
        assert!(matches!(err, BridgeError::Config(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_defaults_to_options() {
        let options = Config::default().conversion.to_options();
        assert_eq!(options.target_platform, TargetPlatform::Both);
        assert_eq!(options.resource_profile, Some(ResourceProfile::Medium));
        assert_eq!(options.namespace(), "default");
        assert!(options.add_health_checks && options.add_resource_limits && options.add_security);
    }
}
