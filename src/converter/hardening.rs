//! Production hardening for Deployments.
//!
//! Every function takes an existing [`Deployment`] and returns a hardened copy;
//! the input is never modified. The Kubernetes projector builds its probes,
//! resources and security contexts through the same helpers with default
//! options.

use super::options::ResourceProfile;
use crate::k8s::quantity::{MEBIBYTE, parse_cpu_millicores, parse_memory_bytes};
use crate::k8s::{
    Capabilities, Container, Deployment, HttpGetAction, IntOrString, PodSecurityContext, Probe,
    ResourceList, ResourceRequirements, SeccompProfile, SecurityContext, TcpSocketAction,
};
use serde::{Deserialize, Serialize};

/// Port probed when a container declares none.
pub const DEFAULT_PROBE_PORT: u16 = 8080;

// ============================================================================
// Resource profiles
// ============================================================================

/// Requests/limits for a named profile. `custom` has no table entry and
/// resolves to `small`.
pub fn profile_resources(profile: ResourceProfile) -> ResourceRequirements {
    let (requests, limits) = match profile {
        ResourceProfile::Small | ResourceProfile::Custom => {
            (("100m", "128Mi"), ("500m", "512Mi"))
        }
        ResourceProfile::Medium => (("250m", "256Mi"), ("1000m", "1Gi")),
        ResourceProfile::Large => (("500m", "512Mi"), ("2000m", "2Gi")),
    };
    ResourceRequirements {
        requests: Some(ResourceList::new(requests.0, requests.1)),
        limits: Some(ResourceList::new(limits.0, limits.1)),
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceLimitOptions {
    pub profile: ResourceProfile,
    /// Used verbatim instead of the profile table when set
    pub custom: Option<ResourceRequirements>,
}

impl ResourceLimitOptions {
    pub fn profile(profile: ResourceProfile) -> Self {
        Self {
            profile,
            custom: None,
        }
    }

    fn resolve(&self) -> ResourceRequirements {
        if let Some(custom) = &self.custom {
            return custom.clone();
        }
        if self.profile == ResourceProfile::Custom {
            log::warn!("Resource profile 'custom' given without custom values, using 'small'");
        }
        profile_resources(self.profile)
    }
}

pub fn add_resource_limits(deployment: &Deployment, options: &ResourceLimitOptions) -> Deployment {
    let resources = options.resolve();
    let mut hardened = deployment.clone();
    for container in hardened.containers_mut() {
        container.resources = Some(resources.clone());
    }
    hardened
}

// ============================================================================
// Health probes
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct ProbeTiming {
    initial_delay: u32,
    period: u32,
    timeout: u32,
    failure_threshold: u32,
}

const LIVENESS_TIMING: ProbeTiming = ProbeTiming {
    initial_delay: 30,
    period: 10,
    timeout: 5,
    failure_threshold: 3,
};

const READINESS_TIMING: ProbeTiming = ProbeTiming {
    initial_delay: 10,
    period: 5,
    timeout: 3,
    failure_threshold: 3,
};

/// Probe settings. Timing overrides apply to both probes; unset values keep
/// the per-probe defaults (liveness 30/10/5/3, readiness 10/5/3/3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthCheckOptions {
    pub liveness_path: String,
    pub readiness_path: String,
    pub port: Option<u16>,
    pub initial_delay_seconds: Option<u32>,
    pub period_seconds: Option<u32>,
    pub timeout_seconds: Option<u32>,
    pub failure_threshold: Option<u32>,
    pub use_tcp: bool,
}

impl Default for HealthCheckOptions {
    fn default() -> Self {
        Self {
            liveness_path: "/health".to_string(),
            readiness_path: "/ready".to_string(),
            port: None,
            initial_delay_seconds: None,
            period_seconds: None,
            timeout_seconds: None,
            failure_threshold: None,
            use_tcp: false,
        }
    }
}

impl HealthCheckOptions {
    fn timed(&self, defaults: ProbeTiming) -> Probe {
        Probe {
            initial_delay_seconds: Some(self.initial_delay_seconds.unwrap_or(defaults.initial_delay)),
            period_seconds: Some(self.period_seconds.unwrap_or(defaults.period)),
            timeout_seconds: Some(self.timeout_seconds.unwrap_or(defaults.timeout)),
            failure_threshold: Some(self.failure_threshold.unwrap_or(defaults.failure_threshold)),
            ..Default::default()
        }
    }
}

/// Liveness and readiness HTTP GET probes on `port`.
pub fn http_probes(port: u16, options: &HealthCheckOptions) -> (Probe, Probe) {
    let http = |path: &str| {
        Some(HttpGetAction {
            path: path.to_string(),
            port: IntOrString::Int(port),
            scheme: Some("HTTP".to_string()),
        })
    };
    let liveness = Probe {
        http_get: http(&options.liveness_path),
        ..options.timed(LIVENESS_TIMING)
    };
    let readiness = Probe {
        http_get: http(&options.readiness_path),
        ..options.timed(READINESS_TIMING)
    };
    (liveness, readiness)
}

/// Liveness and readiness TCP socket probes on `port`.
pub fn tcp_probes(port: u16, options: &HealthCheckOptions) -> (Probe, Probe) {
    let tcp = || {
        Some(TcpSocketAction {
            port: IntOrString::Int(port),
        })
    };
    let liveness = Probe {
        tcp_socket: tcp(),
        ..options.timed(LIVENESS_TIMING)
    };
    let readiness = Probe {
        tcp_socket: tcp(),
        ..options.timed(READINESS_TIMING)
    };
    (liveness, readiness)
}

fn probes_for(container: &Container, options: &HealthCheckOptions) -> (Probe, Probe) {
    let declared = container.ports.first().map(|p| p.container_port);
    match options.port.or(declared) {
        Some(port) if !options.use_tcp => http_probes(port, options),
        port => tcp_probes(port.unwrap_or(DEFAULT_PROBE_PORT), options),
    }
}

/// Adds liveness/readiness probes to every container. Containers without a
/// known port get TCP probes on 8080.
pub fn add_health_checks(deployment: &Deployment, options: &HealthCheckOptions) -> Deployment {
    let mut hardened = deployment.clone();
    for container in hardened.containers_mut() {
        let (liveness, readiness) = probes_for(container, options);
        container.liveness_probe = Some(liveness);
        container.readiness_probe = Some(readiness);
    }
    hardened
}

// ============================================================================
// Security contexts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityOptions {
    pub run_as_user: i64,
    pub fs_group: i64,
    /// Off by default; many images write to their root filesystem
    pub read_only_root_filesystem: bool,
    pub allow_privilege_escalation: bool,
    pub drop_capabilities: bool,
}

impl Default for SecurityOptions {
    fn default() -> Self {
        Self {
            run_as_user: 1000,
            fs_group: 1000,
            read_only_root_filesystem: false,
            allow_privilege_escalation: false,
            drop_capabilities: true,
        }
    }
}

pub fn container_security_context(options: &SecurityOptions) -> SecurityContext {
    SecurityContext {
        run_as_user: Some(options.run_as_user),
        run_as_non_root: Some(true),
        read_only_root_filesystem: Some(options.read_only_root_filesystem),
        allow_privilege_escalation: Some(options.allow_privilege_escalation),
        capabilities: options.drop_capabilities.then(|| Capabilities {
            drop: vec!["ALL".to_string()],
            add: Vec::new(),
        }),
    }
}

pub fn pod_security_context(options: &SecurityOptions) -> PodSecurityContext {
    PodSecurityContext {
        fs_group: Some(options.fs_group),
        run_as_non_root: Some(true),
        seccomp_profile: Some(SeccompProfile {
            profile_type: "RuntimeDefault".to_string(),
        }),
    }
}

pub fn add_security_best_practices(deployment: &Deployment, options: &SecurityOptions) -> Deployment {
    let mut hardened = deployment.clone();
    for container in hardened.containers_mut() {
        container.security_context = Some(container_security_context(options));
    }
    hardened.spec.template.spec.security_context = Some(pod_security_context(options));
    hardened
}

// ============================================================================
// Combined pass
// ============================================================================

/// How one hardening stage runs inside [`apply_all_optimizations`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Stage<T> {
    Skip,
    #[default]
    Defaults,
    Custom(T),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HardeningPlan {
    pub health_checks: Stage<HealthCheckOptions>,
    /// `Defaults` uses the `medium` profile
    pub resource_limits: Stage<ResourceLimitOptions>,
    pub security: Stage<SecurityOptions>,
}

pub fn apply_all_optimizations(deployment: &Deployment, plan: &HardeningPlan) -> Deployment {
    let mut hardened = deployment.clone();

    match &plan.health_checks {
        Stage::Skip => {}
        Stage::Defaults => hardened = add_health_checks(&hardened, &HealthCheckOptions::default()),
        Stage::Custom(options) => hardened = add_health_checks(&hardened, options),
    }

    match &plan.resource_limits {
        Stage::Skip => {}
        Stage::Defaults => {
            hardened = add_resource_limits(
                &hardened,
                &ResourceLimitOptions::profile(ResourceProfile::Medium),
            )
        }
        Stage::Custom(options) => hardened = add_resource_limits(&hardened, options),
    }

    match &plan.security {
        Stage::Skip => {}
        Stage::Defaults => {
            hardened = add_security_best_practices(&hardened, &SecurityOptions::default())
        }
        Stage::Custom(options) => hardened = add_security_best_practices(&hardened, options),
    }

    hardened
}

// ============================================================================
// Checks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceLimitCheck {
    pub valid: bool,
    pub warnings: Vec<String>,
}

/// Heuristic sanity checks on a container's resources.
pub fn validate_resource_limits(resources: Option<&ResourceRequirements>) -> ResourceLimitCheck {
    let Some(resources) = resources else {
        return ResourceLimitCheck {
            valid: false,
            warnings: vec!["No resource limits defined".to_string()],
        };
    };

    let mut warnings = Vec::new();
    let requests = resources.requests.as_ref();
    let limits = resources.limits.as_ref();

    let request_cpu = requests.and_then(|r| r.cpu.as_deref());
    let request_memory = requests.and_then(|r| r.memory.as_deref());

    if let Some(cpu) = request_cpu {
        if parse_cpu_millicores(cpu).is_some_and(|m| m < 10.0) {
            warnings.push(format!(
                "CPU request ({}) seems very low, may cause throttling",
                cpu
            ));
        }
    }
    if let Some(memory) = request_memory {
        if parse_memory_bytes(memory).is_some_and(|b| b < 64.0 * MEBIBYTE) {
            warnings.push(format!(
                "Memory request ({}) seems very low, may cause OOM",
                memory
            ));
        }
    }

    if let (Some(requests), Some(limits)) = (requests, limits) {
        let below = |limit: Option<f64>, request: Option<f64>| match (limit, request) {
            (Some(l), Some(r)) => l > 0.0 && r > 0.0 && l < r,
            _ => false,
        };
        if below(
            limits.cpu.as_deref().and_then(parse_cpu_millicores),
            requests.cpu.as_deref().and_then(parse_cpu_millicores),
        ) {
            warnings.push("CPU limit is lower than request".to_string());
        }
        if below(
            limits.memory.as_deref().and_then(parse_memory_bytes),
            requests.memory.as_deref().and_then(parse_memory_bytes),
        ) {
            warnings.push("Memory limit is lower than request".to_string());
        }
    }

    ResourceLimitCheck {
        valid: warnings.is_empty(),
        warnings,
    }
}

/// Quick remediation list for a Deployment.
pub fn generate_recommendations(deployment: &Deployment) -> Vec<String> {
    let mut recommendations = Vec::new();

    for (index, container) in deployment.containers().iter().enumerate() {
        let name = if container.name.is_empty() {
            format!("container-{}", index)
        } else {
            container.name.clone()
        };

        if container.liveness_probe.is_none() {
            recommendations.push(format!("Add liveness probe to container '{}'", name));
        }
        if container.readiness_probe.is_none() {
            recommendations.push(format!("Add readiness probe to container '{}'", name));
        }

        match &container.resources {
            None => recommendations.push(format!("Define resource limits for container '{}'", name)),
            Some(resources) => {
                if resources.requests.is_none() {
                    recommendations
                        .push(format!("Define resource requests for container '{}'", name));
                }
                if resources.limits.is_none() {
                    recommendations.push(format!("Define resource limits for container '{}'", name));
                }
            }
        }

        match &container.security_context {
            None => recommendations.push(format!("Add security context to container '{}'", name)),
            Some(context) => {
                if context.run_as_non_root != Some(true) {
                    recommendations.push(format!("Set runAsNonRoot=true for container '{}'", name));
                }
                if context.allow_privilege_escalation != Some(false) {
                    recommendations.push(format!(
                        "Set allowPrivilegeEscalation=false for container '{}'",
                        name
                    ));
                }
            }
        }
    }

    if deployment.spec.template.spec.security_context.is_none() {
        recommendations.push("Add pod security context".to_string());
    }

    recommendations
}
