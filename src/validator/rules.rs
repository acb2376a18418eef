//! Kubernetes naming rules and per-kind field rule tables.

use super::types::{Severity, ValidationIssue};
use crate::compose::schema::type_name;
use regex::Regex;
use serde_yaml::Value;
use std::sync::LazyLock;

/// DNS-1123 subdomain.
static DNS_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("valid regex")
});

/// DNS-1123 label.
static DNS_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));

static LABEL_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?$").expect("valid regex")
});

pub const MAX_NAME_LENGTH: usize = 253;
pub const MAX_LABEL_LENGTH: usize = 63;

pub fn is_dns_subdomain(s: &str) -> bool {
    DNS_SUBDOMAIN.is_match(s)
}

pub fn is_dns_label(s: &str) -> bool {
    DNS_LABEL.is_match(s)
}

/// Resource names must be DNS-1123 subdomains of at most 253 characters.
pub fn validate_resource_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Resource name cannot be empty");
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err("Resource name must be no more than 253 characters");
    }
    if !is_dns_subdomain(name) {
        return Err(
            "Resource name must consist of lower case alphanumeric characters, \"-\" or \".\", and must start and end with an alphanumeric character",
        );
    }
    Ok(())
}

/// Namespaces must be DNS-1123 labels.
pub fn validate_namespace(namespace: &str) -> Result<(), &'static str> {
    if namespace.len() > MAX_LABEL_LENGTH {
        return Err("Namespace must be no more than 63 characters");
    }
    if !is_dns_label(namespace) {
        return Err(
            "Namespace must consist of lower case alphanumeric characters or \"-\", and must start and end with an alphanumeric character",
        );
    }
    Ok(())
}

/// Checks a label key (`[prefix/]name`) and value.
pub fn validate_label(key: &str, value: &str) -> Result<(), &'static str> {
    let parts: Vec<&str> = key.split('/').collect();
    match parts.as_slice() {
        [prefix, name] => {
            if prefix.len() > MAX_NAME_LENGTH {
                return Err("Label key prefix must be no more than 253 characters");
            }
            if !is_dns_subdomain(prefix) {
                return Err("Label key prefix must be a valid DNS subdomain");
            }
            if name.is_empty() || name.len() > MAX_LABEL_LENGTH {
                return Err("Label key name must be 1-63 characters");
            }
            if !is_dns_label(name) {
                return Err("Label key name must be a valid DNS label");
            }
        }
        [name] => {
            if name.is_empty() || name.len() > MAX_LABEL_LENGTH {
                return Err("Label key must be 1-63 characters");
            }
            if !is_dns_label(name) {
                return Err("Label key must be a valid DNS label");
            }
        }
        _ => return Err("Label key can have at most one \"/\" separator"),
    }

    if value.len() > MAX_LABEL_LENGTH {
        return Err("Label value must be no more than 63 characters");
    }
    if !value.is_empty() && !LABEL_VALUE.is_match(value) {
        return Err(
            "Label value must be empty or consist of alphanumeric characters, \"-\", \"_\" or \".\", and must start and end with an alphanumeric character",
        );
    }
    Ok(())
}

/// Expected JSON-ish type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Object,
    Array,
}

impl FieldType {
    fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePattern {
    DnsSubdomain,
    DnsLabel,
}

impl NamePattern {
    fn matches(&self, s: &str) -> bool {
        match self {
            NamePattern::DnsSubdomain => is_dns_subdomain(s),
            NamePattern::DnsLabel => is_dns_label(s),
        }
    }
}

/// A check on one dotted field path.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub required: bool,
    pub field_type: Option<FieldType>,
    pub pattern: Option<NamePattern>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub message: &'static str,
    pub severity: Severity,
}

impl FieldRule {
    const fn new(field: &'static str, message: &'static str, severity: Severity) -> Self {
        Self {
            field,
            required: false,
            field_type: None,
            pattern: None,
            min_length: None,
            max_length: None,
            min: None,
            max: None,
            message,
            severity,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn typed(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    const fn name(mut self, pattern: NamePattern) -> Self {
        self.field_type = Some(FieldType::String);
        self.pattern = Some(pattern);
        if let NamePattern::DnsSubdomain = pattern {
            self.min_length = Some(1);
            self.max_length = Some(MAX_NAME_LENGTH);
        }
        self
    }

    const fn at_least(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Applies the rule to `manifest`. Missing optional fields pass.
    pub fn check(&self, manifest: &Value, resource: &str, kind: &str) -> Vec<ValidationIssue> {
        let issue = |message: String| {
            ValidationIssue::new(self.severity, resource, kind, message).with_field(self.field)
        };

        let value = match lookup(manifest, self.field) {
            Some(value) => value,
            None if self.required => return vec![issue(self.message.to_string())],
            None => return Vec::new(),
        };

        if let Some(expected) = self.field_type {
            let actual = type_name(value);
            if actual != expected.as_str() {
                return vec![issue(format!(
                    "{} must be of type {}, got {}",
                    self.field,
                    expected.as_str(),
                    actual
                ))];
            }
        }

        let mut issues = Vec::new();
        if let Some(s) = value.as_str() {
            if let Some(min) = self.min_length.filter(|min| s.len() < *min) {
                issues.push(issue(format!("{} must be at least {} characters", self.field, min)));
            }
            if let Some(max) = self.max_length.filter(|max| s.len() > *max) {
                issues.push(issue(format!(
                    "{} must be no more than {} characters",
                    self.field, max
                )));
            }
            if self.pattern.is_some_and(|p| !p.matches(s)) {
                issues.push(issue(self.message.to_string()));
            }
        }
        if let Some(n) = value.as_f64() {
            if let Some(min) = self.min.filter(|min| n < *min) {
                issues.push(issue(format!("{} must be at least {}", self.field, min)));
            }
            if let Some(max) = self.max.filter(|max| n > *max) {
                issues.push(issue(format!("{} must be no more than {}", self.field, max)));
            }
        }
        issues
    }
}

/// Required fields and field rules for one resource kind.
#[derive(Debug)]
pub struct ResourceRules {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub required_fields: &'static [&'static str],
    pub metadata_rules: &'static [FieldRule],
    pub spec_rules: &'static [FieldRule],
}

impl ResourceRules {
    pub fn rules(&self) -> impl Iterator<Item = &FieldRule> {
        self.metadata_rules.iter().chain(self.spec_rules.iter())
    }
}

const WITH_SPEC: &[&str] = &["apiVersion", "kind", "metadata", "spec"];

static DEPLOYMENT: ResourceRules = ResourceRules {
    api_version: "apps/v1",
    kind: "Deployment",
    required_fields: WITH_SPEC,
    metadata_rules: &[
        FieldRule::new(
            "metadata.name",
            "Deployment name must be a valid DNS subdomain",
            Severity::Error,
        )
        .required()
        .name(NamePattern::DnsSubdomain),
        FieldRule::new(
            "metadata.namespace",
            "Namespace must be a valid DNS label",
            Severity::Error,
        )
        .name(NamePattern::DnsLabel),
    ],
    spec_rules: &[
        FieldRule::new(
            "spec.replicas",
            "Replicas must be a non-negative integer",
            Severity::Error,
        )
        .typed(FieldType::Number)
        .at_least(0.0),
        FieldRule::new("spec.selector", "Deployment must have a selector", Severity::Error)
            .required()
            .typed(FieldType::Object),
        FieldRule::new("spec.template", "Deployment must have a pod template", Severity::Error)
            .required()
            .typed(FieldType::Object),
    ],
};

static SERVICE: ResourceRules = ResourceRules {
    api_version: "v1",
    kind: "Service",
    required_fields: WITH_SPEC,
    metadata_rules: &[FieldRule::new(
        "metadata.name",
        "Service name must be a valid DNS subdomain",
        Severity::Error,
    )
    .required()
    .name(NamePattern::DnsSubdomain)],
    spec_rules: &[
        FieldRule::new(
            "spec.selector",
            "Service should have a selector (except for headless services)",
            Severity::Warning,
        )
        .typed(FieldType::Object),
        FieldRule::new("spec.ports", "Service must define at least one port", Severity::Error)
            .required()
            .typed(FieldType::Array),
    ],
};

static CONFIG_MAP: ResourceRules = ResourceRules {
    api_version: "v1",
    kind: "ConfigMap",
    required_fields: &["apiVersion", "kind", "metadata"],
    metadata_rules: &[FieldRule::new(
        "metadata.name",
        "ConfigMap name must be a valid DNS subdomain",
        Severity::Error,
    )
    .required()
    .name(NamePattern::DnsSubdomain)],
    spec_rules: &[],
};

static PVC: ResourceRules = ResourceRules {
    api_version: "v1",
    kind: "PersistentVolumeClaim",
    required_fields: WITH_SPEC,
    metadata_rules: &[FieldRule::new(
        "metadata.name",
        "PVC name must be a valid DNS subdomain",
        Severity::Error,
    )
    .required()
    .name(NamePattern::DnsSubdomain)],
    spec_rules: &[
        FieldRule::new("spec.accessModes", "PVC must define access modes", Severity::Error)
            .required()
            .typed(FieldType::Array),
        FieldRule::new(
            "spec.resources",
            "PVC must define resource requirements",
            Severity::Error,
        )
        .required()
        .typed(FieldType::Object),
    ],
};

static INGRESS: ResourceRules = ResourceRules {
    api_version: "networking.k8s.io/v1",
    kind: "Ingress",
    required_fields: WITH_SPEC,
    metadata_rules: &[FieldRule::new(
        "metadata.name",
        "Ingress name must be a valid DNS subdomain",
        Severity::Error,
    )
    .required()
    .name(NamePattern::DnsSubdomain)],
    spec_rules: &[FieldRule::new(
        "spec.rules",
        "Ingress should define routing rules",
        Severity::Warning,
    )
    .typed(FieldType::Array)],
};

/// Rule table for a kind, if it has one.
pub fn rules_for(kind: &str) -> Option<&'static ResourceRules> {
    match kind {
        "Deployment" => Some(&DEPLOYMENT),
        "Service" => Some(&SERVICE),
        "ConfigMap" => Some(&CONFIG_MAP),
        "PersistentVolumeClaim" => Some(&PVC),
        "Ingress" => Some(&INGRESS),
        _ => None,
    }
}

/// Follows a dotted path. Null counts as absent.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, key| current.get(key))
        .filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_resource_names() {
        assert!(validate_resource_name("web-app.v1").is_ok());
        assert!(validate_resource_name("").is_err());
        assert!(validate_resource_name("Web").is_err());
        assert!(validate_resource_name("-web").is_err());
        assert!(validate_resource_name(&"a".repeat(254)).is_err());
    }

    #[test]
    fn test_namespace_is_a_label() {
        assert!(validate_namespace("prod").is_ok());
        assert!(validate_namespace("team.prod").is_err());
        assert!(validate_namespace(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_labels() {
        assert!(validate_label("app", "web").is_ok());
        assert!(validate_label("app.kubernetes.io/name", "web").is_ok());
        assert!(validate_label("tier", "").is_ok());
        assert_eq!(
            validate_label("a/b/c", "x"),
            Err("Label key can have at most one \"/\" separator")
        );
        assert_eq!(
            validate_label("Example.com/name", "x"),
            Err("Label key prefix must be a valid DNS subdomain")
        );
        assert_eq!(validate_label("", "x"), Err("Label key must be 1-63 characters"));
        assert!(validate_label("app", "-bad").is_err());
        assert!(validate_label("app", &"v".repeat(64)).is_err());
    }

    #[test]
    fn test_lookup() {
        let doc = yaml("spec:\n  replicas: 2\n  selector: ~\n");
        assert_eq!(lookup(&doc, "spec.replicas").and_then(Value::as_u64), Some(2));
        assert!(lookup(&doc, "spec.selector").is_none());
        assert!(lookup(&doc, "spec.template.spec").is_none());
    }

    #[test]
    fn test_negative_replicas() {
        let doc = yaml("spec:\n  replicas: -1\n");
        let rule = &rules_for("Deployment").unwrap().spec_rules[0];
        let issues = rule.check(&doc, "web", "Deployment");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "spec.replicas must be at least 0");
    }

    #[test]
    fn test_type_mismatch() {
        let doc = yaml("spec:\n  ports: 80\n");
        let rule = &rules_for("Service").unwrap().spec_rules[1];
        let issues = rule.check(&doc, "web", "Service");
        assert_eq!(issues[0].message, "spec.ports must be of type array, got number");
    }

    #[test]
    fn test_missing_required() {
        let doc = yaml("spec: {}\n");
        let rule = &rules_for("PersistentVolumeClaim").unwrap().spec_rules[0];
        let issues = rule.check(&doc, "data", "PersistentVolumeClaim");
        assert_eq!(issues[0].message, "PVC must define access modes");
        assert_eq!(issues[0].field.as_deref(), Some("spec.accessModes"));
    }
}
