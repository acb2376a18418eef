//! Best-practice checks run against every manifest.
//!
//! Most checks only look at Deployments and pass for other kinds.

use super::rules::lookup;
use super::types::Severity;
use serde_yaml::Value;

/// A best-practice check.
#[derive(Debug, Clone, Copy)]
pub struct BestPracticeCheck {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub recommendation: &'static str,
    check: fn(&Value) -> bool,
}

impl BestPracticeCheck {
    /// `true` when the manifest satisfies the check.
    pub fn passes(&self, manifest: &Value) -> bool {
        (self.check)(manifest)
    }
}

fn is_deployment(manifest: &Value) -> bool {
    manifest.get("kind").and_then(Value::as_str) == Some("Deployment")
}

fn containers(manifest: &Value) -> &[Value] {
    lookup(manifest, "spec.template.spec.containers")
        .and_then(Value::as_sequence)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Non-Deployments pass; Deployments pass when every container satisfies `f`.
fn every_container(manifest: &Value, f: impl Fn(&Value) -> bool) -> bool {
    !is_deployment(manifest) || containers(manifest).iter().all(f)
}

fn has(value: &Value, path: &str) -> bool {
    lookup(value, path).is_some_and(|v| !matches!(v, Value::Bool(false)))
}

fn resource_limits(manifest: &Value) -> bool {
    every_container(manifest, |c| has(c, "resources.limits"))
}

fn resource_requests(manifest: &Value) -> bool {
    every_container(manifest, |c| has(c, "resources.requests"))
}

fn liveness_probe(manifest: &Value) -> bool {
    every_container(manifest, |c| has(c, "livenessProbe"))
}

fn readiness_probe(manifest: &Value) -> bool {
    every_container(manifest, |c| has(c, "readinessProbe"))
}

fn pod_security_context(manifest: &Value) -> bool {
    !is_deployment(manifest) || has(manifest, "spec.template.spec.securityContext")
}

fn run_as_non_root(manifest: &Value) -> bool {
    every_container(manifest, |c| {
        lookup(c, "securityContext.runAsNonRoot").and_then(Value::as_bool) == Some(true)
    })
}

fn explicit_image_tag(manifest: &Value) -> bool {
    every_container(manifest, |c| {
        let image = c.get("image").and_then(Value::as_str).unwrap_or("");
        image.contains(':') && !image.ends_with(":latest")
    })
}

fn multiple_replicas(manifest: &Value) -> bool {
    if !is_deployment(manifest) {
        return true;
    }
    // Unset or zero counts as one replica
    let replicas = lookup(manifest, "spec.replicas")
        .and_then(Value::as_f64)
        .filter(|r| *r != 0.0)
        .unwrap_or(1.0);
    replicas >= 2.0
}

fn labels_defined(manifest: &Value) -> bool {
    lookup(manifest, "metadata.labels")
        .and_then(Value::as_mapping)
        .is_some_and(|labels| labels.len() >= 2)
}

/// Selector matching needs the whole document set; the reference pass covers it.
fn selector_matches(_manifest: &Value) -> bool {
    true
}

pub static CHECKS: [BestPracticeCheck; 10] = [
    BestPracticeCheck {
        id: "bp-001",
        name: "Resource Limits Defined",
        description: "Containers should have resource limits defined",
        severity: Severity::Warning,
        recommendation: "Define resource limits to prevent resource exhaustion",
        check: resource_limits,
    },
    BestPracticeCheck {
        id: "bp-002",
        name: "Resource Requests Defined",
        description: "Containers should have resource requests defined",
        severity: Severity::Warning,
        recommendation: "Define resource requests for proper scheduling",
        check: resource_requests,
    },
    BestPracticeCheck {
        id: "bp-003",
        name: "Liveness Probe Configured",
        description: "Containers should have liveness probes",
        severity: Severity::Info,
        recommendation: "Add liveness probes to detect and restart unhealthy containers",
        check: liveness_probe,
    },
    BestPracticeCheck {
        id: "bp-004",
        name: "Readiness Probe Configured",
        description: "Containers should have readiness probes",
        severity: Severity::Info,
        recommendation: "Add readiness probes to ensure traffic is sent only to ready pods",
        check: readiness_probe,
    },
    BestPracticeCheck {
        id: "bp-005",
        name: "Security Context Defined",
        description: "Pods should have security context defined",
        severity: Severity::Warning,
        recommendation: "Define security context to follow security best practices",
        check: pod_security_context,
    },
    BestPracticeCheck {
        id: "bp-006",
        name: "Run As Non-Root",
        description: "Containers should run as non-root user",
        severity: Severity::Warning,
        recommendation: "Configure containers to run as non-root for better security",
        check: run_as_non_root,
    },
    BestPracticeCheck {
        id: "bp-007",
        name: "Image Tag Specified",
        description: "Container images should have explicit tags (not :latest)",
        severity: Severity::Warning,
        recommendation: "Use explicit image tags instead of :latest for reproducibility",
        check: explicit_image_tag,
    },
    BestPracticeCheck {
        id: "bp-008",
        name: "Multiple Replicas",
        description: "Production deployments should have multiple replicas",
        severity: Severity::Info,
        recommendation: "Use at least 2 replicas for high availability",
        check: multiple_replicas,
    },
    BestPracticeCheck {
        id: "bp-009",
        name: "Labels Defined",
        description: "Resources should have meaningful labels",
        severity: Severity::Info,
        recommendation: "Add labels for better resource organization and selection",
        check: labels_defined,
    },
    BestPracticeCheck {
        id: "bp-010",
        name: "Service Selector Matches Deployment",
        description: "Service selector should match deployment labels",
        severity: Severity::Error,
        recommendation: "Ensure service selector matches deployment pod labels",
        check: selector_matches,
    },
];
