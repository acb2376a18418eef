//! Client-side manifest validation.
//!
//! Approximates `kubectl --dry-run` and `helm lint` without a cluster:
//! naming and label rules, per-kind field rules, best-practice checks and
//! cross-resource references, summarised as a [`ValidationResult`] with a
//! 0-100 quality score.
//!
//! # Example
//!
//! ```rust
//! use compose_bridge::validator::validate_kubernetes_manifests;
//!
//! let result = validate_kubernetes_manifests("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: web-config\n");
//! assert!(result.valid);
//! ```

pub mod best_practices;
pub mod formatter;
pub mod kubernetes;
pub mod references;
pub mod report;
pub mod rules;
pub mod stack;
pub mod types;

pub use formatter::{OutputFormat, format_reports};
pub use kubernetes::{parse_documents, validate_kubernetes_manifests, validate_manifest};
pub use stack::validate_docker_stack;
pub use types::{Severity, ValidationIssue, ValidationResult, ValidationSummary};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;

/// What a validated input contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    Kubernetes,
    Stack,
    Helm,
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ManifestKind::Kubernetes => "kubernetes",
            ManifestKind::Stack => "stack",
            ManifestKind::Helm => "helm",
        };
        write!(f, "{}", name)
    }
}

/// Guesses whether YAML text is a compose/stack file or Kubernetes manifests.
/// A top-level `services` mapping without `kind` means compose.
pub fn detect_kind(text: &str) -> ManifestKind {
    match serde_yaml::from_str::<Value>(text) {
        Ok(Value::Mapping(root))
            if root.get("services").is_some_and(Value::is_mapping) && root.get("kind").is_none() =>
        {
            ManifestKind::Stack
        }
        _ => ManifestKind::Kubernetes,
    }
}

/// Validates YAML text as `kind`. Helm charts are directories and are
/// validated through [`crate::converter::validate_helm_chart`] instead.
pub fn validate_text(kind: ManifestKind, text: &str) -> ValidationResult {
    match kind {
        ManifestKind::Stack => validate_docker_stack(text),
        ManifestKind::Kubernetes | ManifestKind::Helm => validate_kubernetes_manifests(text),
    }
}

/// A validation result tied to its input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub source: String,
    pub kind: ManifestKind,
    pub result: ValidationResult,
}

impl FileReport {
    /// Whether the report passes an optional minimum score.
    pub fn passes(&self, min_score: u32) -> bool {
        self.result.valid && self.result.score >= min_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_kind() {
        assert_eq!(detect_kind("version: '3.8'\nservices:\n  web: {image: nginx}\n"), ManifestKind::Stack);
        assert_eq!(detect_kind("apiVersion: v1\nkind: Service\n"), ManifestKind::Kubernetes);
        assert_eq!(detect_kind("a: 1\n---\nb: 2\n"), ManifestKind::Kubernetes);
    }

    #[test]
    fn test_report_passes() {
        let report = FileReport {
            source: "stack.yml".to_string(),
            kind: ManifestKind::Stack,
            result: validate_docker_stack("services:\n  web:\n    image: nginx\n"),
        };
        assert!(report.passes(0));
        assert!(!report.passes(100));
    }
}
