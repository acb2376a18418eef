//! Compose → Docker Swarm stack projector.
//!
//! The base pass works on a copy of the document and only adds what is
//! missing. [`convert_with_optimizations`] is a separate second pass over the
//! base output.

use super::options::{ConversionOptions, ResourceProfile};
use crate::compose::{
    ComposeDocument, Deploy, DeployResources, HealthCheck, Logging, NetworkSpec, Placement,
    ResourceSpec, RestartPolicy, Service, ServiceMetadata, StringOrList, UpdateConfig,
};
use crate::error::ConversionError;
use std::collections::BTreeMap;

pub const STACK_VERSION: &str = "3.8";
/// Oldest compose file format that supports `deploy`.
const MIN_STACK_VERSION: f64 = 3.3;
const DEFAULT_REPLICAS: u32 = 3;
const DEFAULT_HEALTH_PORT: u16 = 80;

/// Output of a Swarm conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmConversion {
    pub document: ComposeDocument,
    /// `docker-stack.yml` contents
    pub yaml: String,
    pub warnings: Vec<String>,
}

/// Converts a compose document into a Swarm-ready stack file.
pub fn convert(
    document: &ComposeDocument,
    options: &ConversionOptions,
) -> Result<SwarmConversion, ConversionError> {
    let mut stack = document.clone();
    let mut warnings = Vec::new();

    let outdated = match stack.version.as_deref() {
        None => true,
        Some(version) => version
            .trim()
            .parse::<f64>()
            .is_ok_and(|v| v < MIN_STACK_VERSION),
    };
    if outdated {
        stack.version = Some(STACK_VERSION.to_string());
        warnings.push(format!(
            "Updated version to {} for Docker Swarm compatibility",
            STACK_VERSION
        ));
    }

    for (name, service) in stack.services.iter_mut() {
        let metadata = ServiceMetadata::from_service(name, service);

        apply_deploy_defaults(service, options);

        if options.add_health_checks && service.healthcheck.is_none() {
            let port = metadata.first_container_port().unwrap_or(DEFAULT_HEALTH_PORT);
            service.healthcheck = Some(default_healthcheck(port));
        }

        if service.build.take().is_some() {
            warnings.push(format!(
                "Service '{}' has 'build' context which is not supported in Docker Stack. Please build and push the image first.",
                name
            ));
        }
        if service.image.is_none() {
            warnings.push(format!(
                "Service '{}' is missing 'image' field. This is required for Docker Stack deployment.",
                name
            ));
        }
    }

    apply_overlay_networks(&mut stack);

    let yaml = serde_yaml::to_string(&stack)
        .map_err(|e| ConversionError::serialization("docker-stack.yml", e))?;

    Ok(SwarmConversion {
        document: stack,
        yaml,
        warnings,
    })
}

/// Runs [`convert`], then re-reads its output and applies production tweaks:
/// log rotation, a stop grace period, removal of `restart` and, with security
/// enabled, tmpfs mounts and `no-new-privileges`.
pub fn convert_with_optimizations(
    document: &ComposeDocument,
    options: &ConversionOptions,
) -> Result<SwarmConversion, ConversionError> {
    let base = convert(document, options)?;

    let mut stack: ComposeDocument = serde_yaml::from_str(&base.yaml)
        .map_err(|e| ConversionError::InvalidInput(format!("stack output did not re-parse: {}", e)))?;

    for service in stack.services.values_mut() {
        optimize_for_production(service);
        if options.add_security {
            add_security_best_practices(service);
        }
    }

    let yaml = serde_yaml::to_string(&stack)
        .map_err(|e| ConversionError::serialization("docker-stack.yml", e))?;

    Ok(SwarmConversion {
        document: stack,
        yaml,
        warnings: base.warnings,
    })
}

/// Swarm resources for a profile, in `cpus`/`memory` units.
pub fn profile_resources(profile: ResourceProfile) -> DeployResources {
    let ((limit_cpus, limit_memory), (reserve_cpus, reserve_memory)) = match profile {
        ResourceProfile::Small | ResourceProfile::Custom => (("0.50", "512M"), ("0.10", "128M")),
        ResourceProfile::Medium => (("1.00", "1G"), ("0.25", "256M")),
        ResourceProfile::Large => (("2.00", "2G"), ("0.50", "512M")),
    };
    let spec = |cpus: &str, memory: &str| ResourceSpec {
        cpus: Some(cpus.to_string()),
        memory: Some(memory.to_string()),
        extra: BTreeMap::new(),
    };
    DeployResources {
        limits: Some(spec(limit_cpus, limit_memory)),
        reservations: Some(spec(reserve_cpus, reserve_memory)),
        extra: BTreeMap::new(),
    }
}

fn apply_deploy_defaults(service: &mut Service, options: &ConversionOptions) {
    let deploy = service.deploy.get_or_insert_with(Deploy::default);

    if deploy.replicas.is_none() && deploy.mode.as_deref() != Some("global") {
        deploy.replicas = Some(DEFAULT_REPLICAS);
    }

    deploy.placement.get_or_insert_with(|| Placement {
        constraints: vec!["node.role == worker".to_string()],
        extra: BTreeMap::new(),
    });

    deploy.restart_policy.get_or_insert_with(|| RestartPolicy {
        condition: Some("on-failure".to_string()),
        delay: Some("5s".to_string()),
        max_attempts: Some(3),
        window: Some("120s".to_string()),
        extra: BTreeMap::new(),
    });

    deploy.update_config.get_or_insert_with(|| UpdateConfig {
        parallelism: Some(2),
        delay: Some("10s".to_string()),
        failure_action: Some("rollback".to_string()),
        order: Some("start-first".to_string()),
        extra: BTreeMap::new(),
    });

    deploy.rollback_config.get_or_insert_with(|| UpdateConfig {
        parallelism: Some(0),
        order: Some("stop-first".to_string()),
        ..Default::default()
    });

    if options.add_resource_limits && deploy.resources.is_none() {
        deploy.resources = Some(profile_resources(options.projector_profile()));
    }
}

fn default_healthcheck(port: u16) -> HealthCheck {
    HealthCheck {
        test: Some(StringOrList::List(vec![
            "CMD-SHELL".to_string(),
            format!("curl -f http://localhost:{}/health || exit 1", port),
        ])),
        interval: Some("30s".to_string()),
        timeout: Some("10s".to_string()),
        retries: Some(3),
        start_period: Some("40s".to_string()),
        ..Default::default()
    }
}

fn apply_overlay_networks(stack: &mut ComposeDocument) {
    if stack.networks.is_empty() {
        stack.networks.insert(
            "default".to_string(),
            Some(NetworkSpec {
                driver: Some("overlay".to_string()),
                attachable: Some(true),
                ..Default::default()
            }),
        );
        return;
    }

    for (name, network) in stack.networks.iter_mut() {
        let spec = network.get_or_insert_with(NetworkSpec::default);
        if spec.is_external() {
            log::debug!("Leaving external network '{}' untouched", name);
            continue;
        }
        spec.driver.get_or_insert_with(|| "overlay".to_string());
        spec.attachable.get_or_insert(true);
    }
}

/// Log rotation, stop grace period and no `restart` key.
pub fn optimize_for_production(service: &mut Service) {
    service.logging.get_or_insert_with(|| Logging {
        driver: Some("json-file".to_string()),
        options: BTreeMap::from([
            ("max-size".to_string(), "10m".to_string()),
            ("max-file".to_string(), "3".to_string()),
        ]),
        extra: BTreeMap::new(),
    });
    service
        .stop_grace_period
        .get_or_insert_with(|| "30s".to_string());
    // deploy.restart_policy replaces it in swarm mode
    service.restart = None;
}

/// tmpfs for scratch directories and `no-new-privileges`.
pub fn add_security_best_practices(service: &mut Service) {
    service.tmpfs.get_or_insert_with(|| {
        StringOrList::List(vec!["/tmp".to_string(), "/run".to_string()])
    });
    if service.security_opt.is_empty() {
        service.security_opt = vec!["no-new-privileges:true".to_string()];
    }
}

/// Problems that block or degrade `docker stack deploy` for one service.
pub fn validate_service(name: &str, service: &Service) -> Vec<String> {
    let mut errors = Vec::new();
    if service.image.is_none() {
        errors.push(format!(
            "Service '{}' must have 'image' field for Docker Stack deployment",
            name
        ));
    }
    if service.build.is_some() {
        errors.push(format!(
            "Service '{}' has 'build' context which is not supported in Docker Stack",
            name
        ));
    }
    if service.container_name.is_some() {
        errors.push(format!(
            "Service '{}' has 'container_name' which is not supported in Docker Swarm mode",
            name
        ));
    }
    if !service.links.is_empty() {
        errors.push(format!(
            "Service '{}' uses 'links' which are deprecated. Use service names for DNS resolution instead",
            name
        ));
    }
    errors
}
