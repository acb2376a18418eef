//! Core validator types.
//!
//! - `Severity` - issue severity, ordered `Error > Warning > Info`
//! - `ValidationIssue` - a single finding against one resource
//! - `ValidationResult` - the report shared by every validation path

use super::report;
use crate::converter::HelmValidation;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Makes the result invalid
    Error,
    /// Should usually be fixed
    Warning,
    /// Best-practice hint
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    /// Points subtracted from the quality score per issue.
    pub fn penalty(&self) -> u32 {
        match self {
            Self::Error => 15,
            Self::Warning => 5,
            Self::Info => 2,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Warning => 1,
            Self::Info => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lower rank is more severe
        other.rank().cmp(&self.rank())
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A finding against one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Resource name, e.g. `web` or `docker-stack.yml`
    pub resource: String,
    /// Resource kind, e.g. `Deployment`
    pub kind: String,
    /// Dotted field path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
    /// 1-based line where the resource's document starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Best-practice rule id, e.g. `bp-001`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        resource: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            resource: resource.into(),
            kind: kind.into(),
            field: None,
            message: message.into(),
            line: None,
            suggestion: None,
            rule: None,
        }
    }

    pub fn error(resource: impl Into<String>, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, resource, kind, message)
    }

    pub fn warning(resource: impl Into<String>, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, resource, kind, message)
    }

    pub fn info(resource: impl Into<String>, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, resource, kind, message)
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total_resources: usize,
    pub valid_resources: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

/// Validation report shared by the Kubernetes, Docker Stack and Helm paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// `true` iff there are no errors
    pub valid: bool,
    /// Quality score, 0-100
    pub score: u32,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub info: Vec<ValidationIssue>,
    pub suggestions: Vec<String>,
    pub summary: ValidationSummary,
}

impl ValidationResult {
    /// Builds a result from issues in discovery order, computing the score,
    /// suggestions and summary.
    pub fn from_issues(
        total_resources: usize,
        valid_resources: usize,
        issues: Vec<ValidationIssue>,
    ) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut info = Vec::new();
        for issue in issues {
            match issue.severity {
                Severity::Error => errors.push(issue),
                Severity::Warning => warnings.push(issue),
                Severity::Info => info.push(issue),
            }
        }

        let score = report::quality_score(total_resources, errors.len(), warnings.len(), info.len());
        let suggestions = report::suggestions(&errors, &warnings, &info);
        let summary = ValidationSummary {
            total_resources,
            valid_resources,
            error_count: errors.len(),
            warning_count: warnings.len(),
            info_count: info.len(),
        };

        Self {
            valid: errors.is_empty(),
            score,
            errors,
            warnings,
            info,
            suggestions,
            summary,
        }
    }

    /// A result for input that could not be validated at all: one error,
    /// score 0, no resources.
    pub fn fatal(issue: ValidationIssue, suggestion: impl Into<String>) -> Self {
        Self {
            valid: false,
            score: 0,
            errors: vec![issue],
            warnings: Vec::new(),
            info: Vec::new(),
            suggestions: vec![suggestion.into()],
            summary: ValidationSummary {
                total_resources: 0,
                valid_resources: 0,
                error_count: 1,
                warning_count: 0,
                info_count: 0,
            },
        }
    }

    /// All issues, most severe first.
    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .chain(self.info.iter())
    }

    pub fn issue_count(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.info.len()
    }
}

pub const HELM_RESOURCE: &str = "Helm Chart";
pub const HELM_KIND: &str = "Chart";

impl From<&HelmValidation> for ValidationResult {
    fn from(helm: &HelmValidation) -> Self {
        let issues = helm
            .errors
            .iter()
            .map(|message| ValidationIssue::error(HELM_RESOURCE, HELM_KIND, message.as_str()))
            .chain(
                helm.warnings
                    .iter()
                    .map(|message| ValidationIssue::warning(HELM_RESOURCE, HELM_KIND, message.as_str())),
            )
            .collect();
        let valid_resources = usize::from(helm.errors.is_empty());
        Self::from_issues(1, valid_resources, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        let mut severities = vec![Severity::Info, Severity::Error, Severity::Warning];
        severities.sort_by(|a, b| b.cmp(a));
        assert_eq!(severities, vec![Severity::Error, Severity::Warning, Severity::Info]);
    }

    #[test]
    fn test_from_issues_splits_by_severity() {
        let result = ValidationResult::from_issues(
            2,
            1,
            vec![
                ValidationIssue::warning("web", "Deployment", "w"),
                ValidationIssue::error("web", "Deployment", "e"),
                ValidationIssue::info("web", "Deployment", "i"),
            ],
        );
        assert!(!result.valid);
        assert_eq!(result.score, 100 - 15 - 5 - 2);
        assert_eq!(result.summary.error_count, 1);
        assert_eq!(result.summary.warning_count, 1);
        assert_eq!(result.summary.info_count, 1);
        assert_eq!(result.summary.valid_resources, 1);
    }

    #[test]
    fn test_fatal_result() {
        let result = ValidationResult::fatal(
            ValidationIssue::error("N/A", "N/A", "boom"),
            "Fix YAML syntax errors and try again",
        );
        assert!(!result.valid);
        assert_eq!(result.score, 0);
        assert_eq!(result.summary.error_count, 1);
        assert_eq!(result.summary.total_resources, 0);
    }

    #[test]
    fn test_helm_adapter() {
        let helm = HelmValidation {
            valid: true,
            errors: vec![],
            warnings: vec!["No deployment template found".to_string()],
        };
        let result = ValidationResult::from(&helm);
        assert!(result.valid);
        assert_eq!(result.score, 95);
        assert_eq!(result.warnings[0].kind, HELM_KIND);
        assert_eq!(result.summary.total_resources, 1);
        assert_eq!(result.summary.valid_resources, 1);

        let broken = HelmValidation {
            valid: false,
            errors: vec!["Chart.yaml: name is required".to_string()],
            warnings: vec![],
        };
        let result = ValidationResult::from(&broken);
        assert!(!result.valid);
        assert_eq!(result.summary.valid_resources, 0);
        assert_eq!(result.score, 85);
    }

    #[test]
    fn test_json_is_camel_case() {
        let result = ValidationResult::from_issues(
            1,
            1,
            vec![ValidationIssue::info("web", "Deployment", "hint").with_field("spec.replicas")],
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["summary"]["totalResources"], 1);
        assert_eq!(json["info"][0]["severity"], "info");
        assert_eq!(json["info"][0]["field"], "spec.replicas");
        assert!(json["info"][0].get("line").is_none());
    }
}
