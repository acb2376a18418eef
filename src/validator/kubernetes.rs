//! Client-side validation of Kubernetes manifest streams.

use super::best_practices::CHECKS;
use super::references::{ResourceIndex, extract_references};
use super::rules::{lookup, rules_for, validate_label, validate_namespace, validate_resource_name};
use super::types::{ValidationIssue, ValidationResult};
use crate::compose::model::scalar_to_string;
use serde_yaml::Value;

const UNKNOWN: &str = "unknown";

/// One YAML document of a stream and the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub line: usize,
    pub value: Value,
}

fn is_separator(line: &str) -> bool {
    line == "---" || line.starts_with("--- ") || line.starts_with("---\t")
}

fn is_content(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

/// Splits a `---` separated stream into parsed documents, keeping only
/// mappings. The line of each document is its first content line.
pub fn parse_documents(text: &str) -> Result<Vec<SourceDocument>, String> {
    let mut chunks: Vec<(usize, String)> = vec![(1, String::new())];
    for (idx, line) in text.lines().enumerate() {
        if is_separator(line.trim_end()) {
            chunks.push((idx + 2, String::new()));
            continue;
        }
        if let Some((_, chunk)) = chunks.last_mut() {
            chunk.push_str(line);
            chunk.push('\n');
        }
    }

    let mut documents = Vec::new();
    for (start, chunk) in chunks {
        let Some(offset) = chunk.lines().position(is_content) else {
            continue;
        };
        let value: Value = serde_yaml::from_str(&chunk).map_err(|e| match e.location() {
            Some(location) => format!(
                "YAML parsing error at line {}: {}",
                start + location.line() - 1,
                e
            ),
            None => format!("YAML parsing error: {}", e),
        })?;
        if value.is_mapping() {
            documents.push(SourceDocument {
                line: start + offset,
                value,
            });
        }
    }
    Ok(documents)
}

fn str_at<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    lookup(value, path).and_then(Value::as_str)
}

/// Validates one manifest on its own, without cross-resource checks.
pub fn validate_manifest(manifest: &Value) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let kind = manifest
        .get("kind")
        .and_then(Value::as_str)
        .filter(|k| !k.is_empty());
    let kind_label = kind.unwrap_or(UNKNOWN);
    let name = str_at(manifest, "metadata.name").filter(|n| !n.is_empty());
    let resource = name.unwrap_or(UNKNOWN);

    if lookup(manifest, "apiVersion").is_none() {
        issues.push(
            ValidationIssue::error(resource, kind_label, "Missing required field: apiVersion")
                .with_field("apiVersion"),
        );
    }
    if kind.is_none() {
        issues.push(
            ValidationIssue::error(resource, UNKNOWN, "Missing required field: kind").with_field("kind"),
        );
    }
    let Some(metadata) = lookup(manifest, "metadata") else {
        issues.push(
            ValidationIssue::error(resource, kind_label, "Missing required field: metadata")
                .with_field("metadata"),
        );
        return issues;
    };

    match name {
        None => issues.push(
            ValidationIssue::error("unnamed", kind_label, "Missing required field: metadata.name")
                .with_field("metadata.name"),
        ),
        Some(name) => {
            if let Err(message) = validate_resource_name(name) {
                issues.push(
                    ValidationIssue::error(name, kind_label, message).with_field("metadata.name"),
                );
            }
        }
    }

    if let Some(namespace) = str_at(manifest, "metadata.namespace").filter(|ns| !ns.is_empty()) {
        if let Err(message) = validate_namespace(namespace) {
            issues.push(
                ValidationIssue::error(resource, kind_label, message).with_field("metadata.namespace"),
            );
        }
    }

    if let Some(labels) = metadata.get("labels").and_then(Value::as_mapping) {
        for (key, value) in labels {
            let key = scalar_to_string(key);
            if let Err(message) = validate_label(&key, &scalar_to_string(value)) {
                issues.push(
                    ValidationIssue::error(resource, kind_label, message)
                        .with_field(format!("metadata.labels.{}", key)),
                );
            }
        }
    }

    if let Some(rules) = kind.and_then(rules_for) {
        // Fields already reported above are not reported twice
        let reported = |issues: &[ValidationIssue], field: &str| {
            issues.iter().any(|i| i.field.as_deref() == Some(field))
        };
        for field in rules.required_fields {
            if lookup(manifest, field).is_none() && !reported(&issues, field) {
                issues.push(
                    ValidationIssue::error(resource, rules.kind, format!("Missing required field: {}", field))
                        .with_field(*field),
                );
            }
        }
        for rule in rules.rules() {
            if reported(&issues, rule.field) {
                continue;
            }
            issues.extend(rule.check(manifest, resource, rules.kind));
        }
    }

    for check in CHECKS.iter().filter(|c| !c.passes(manifest)) {
        issues.push(
            ValidationIssue::new(check.severity, resource, kind_label, check.description)
                .with_suggestion(check.recommendation)
                .with_rule(check.id),
        );
    }
    issues
}

/// Validates a multi-document manifest stream.
///
/// Never fails: unparseable input yields a single error and score 0.
pub fn validate_kubernetes_manifests(text: &str) -> ValidationResult {
    let documents = match parse_documents(text) {
        Ok(documents) => documents,
        Err(message) => {
            log::debug!("Manifest stream did not parse: {}", message);
            return ValidationResult::fatal(
                ValidationIssue::error("N/A", "N/A", message),
                "Fix YAML syntax errors and try again",
            );
        }
    };

    if documents.is_empty() {
        return ValidationResult::fatal(
            ValidationIssue::error("N/A", "N/A", "No valid manifests found in YAML"),
            "Ensure your YAML contains valid Kubernetes resource definitions",
        );
    }

    let mut issues = Vec::new();
    let mut valid_resources = 0;
    for doc in &documents {
        let manifest_issues = validate_manifest(&doc.value);
        if manifest_issues.iter().all(|i| i.severity != super::Severity::Error) {
            valid_resources += 1;
        }
        issues.extend(manifest_issues.into_iter().map(|i| i.with_line(doc.line)));
    }

    let index = ResourceIndex::build(documents.iter().map(|d| &d.value));
    for doc in &documents {
        for reference in extract_references(&doc.value) {
            if index.contains(reference.kind, &reference.name) {
                continue;
            }
            issues.push(
                ValidationIssue::warning(
                    reference.referenced_by.as_str(),
                    reference.kind,
                    format!(
                        "Referenced {} \"{}\" not found in manifests",
                        reference.kind, reference.name
                    ),
                )
                .with_field(reference.field)
                .with_line(doc.line)
                .with_suggestion(format!(
                    "Create a {} resource named \"{}\" or ensure it exists in your cluster",
                    reference.kind, reference.name
                )),
            );
        }
    }

    log::info!(
        "Validated {} manifests: {} issues",
        documents.len(),
        issues.len()
    );
    ValidationResult::from_issues(documents.len(), valid_resources, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Severity;

    const HARDENED: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: default
  labels:
    app: web
    app.kubernetes.io/name: web
spec:
  replicas: 3
  selector:
    matchLabels:
      app: web
  template:
    metadata:
      labels:
        app: web
    spec:
      securityContext:
        fsGroup: 1000
      containers:
      - name: web
        image: nginx:1.25
        resources:
          limits: {cpu: 500m, memory: 512Mi}
          requests: {cpu: 100m, memory: 128Mi}
        livenessProbe: {httpGet: {path: /health, port: 80}}
        readinessProbe: {httpGet: {path: /ready, port: 80}}
        securityContext: {runAsNonRoot: true}
---
apiVersion: v1
kind: Service
metadata:
  name: web
  labels:
    app: web
    app.kubernetes.io/name: web
spec:
  selector:
    app: web
  ports:
  - port: 80
"#;

    #[test]
    fn test_parse_documents_tracks_lines() {
        let docs = parse_documents("# header\n---\nkind: A\n---\n\n\nkind: B\n---\n").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].line, 3);
        assert_eq!(docs[1].line, 7);
    }

    #[test]
    fn test_parse_documents_error_location() {
        let err = parse_documents("kind: A\n---\nkind: B\nmetadata: [unclosed\n").unwrap_err();
        assert!(err.starts_with("YAML parsing error"), "{}", err);
    }

    #[test]
    fn test_hardened_manifests_are_clean() {
        let result = validate_kubernetes_manifests(HARDENED);
        assert!(result.valid, "{:?}", result.errors);
        assert_eq!(result.score, 100, "{:?}", result);
        assert_eq!(result.summary.total_resources, 2);
        assert_eq!(result.summary.valid_resources, 2);
    }

    #[test]
    fn test_invalid_yaml_is_fatal() {
        let result = validate_kubernetes_manifests("kind: [unclosed");
        assert!(!result.valid);
        assert_eq!(result.score, 0);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.suggestions, vec!["Fix YAML syntax errors and try again"]);
    }

    #[test]
    fn test_empty_stream() {
        let result = validate_kubernetes_manifests("# nothing\n---\n");
        assert!(!result.valid);
        assert_eq!(result.errors[0].message, "No valid manifests found in YAML");
    }

    #[test]
    fn test_missing_metadata_stops_checks() {
        let issues = validate_manifest(&serde_yaml::from_str("kind: Deployment\n").unwrap());
        let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Missing required field: apiVersion", "Missing required field: metadata"]
        );
    }

    #[test]
    fn test_invalid_name_reported_once() {
        let issues = validate_manifest(
            &serde_yaml::from_str("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: Web_Config\n")
                .unwrap(),
        );
        let name_issues: Vec<_> = issues
            .iter()
            .filter(|i| i.field.as_deref() == Some("metadata.name"))
            .collect();
        assert_eq!(name_issues.len(), 1);
        assert_eq!(name_issues[0].severity, Severity::Error);
    }

    #[test]
    fn test_missing_reference_is_warning() {
        let text = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: db
spec:
  selector: {matchLabels: {app: db}}
  template:
    spec:
      containers:
      - name: db
        image: postgres:15
      volumes:
      - name: data
        persistentVolumeClaim: {claimName: db-pgdata}
"#;
        let result = validate_kubernetes_manifests(text);
        assert!(result.valid);
        let warning = result
            .warnings
            .iter()
            .find(|w| w.kind == "PersistentVolumeClaim")
            .unwrap();
        assert_eq!(
            warning.message,
            "Referenced PersistentVolumeClaim \"db-pgdata\" not found in manifests"
        );
        assert_eq!(warning.resource, "db (Deployment)");
        assert_eq!(warning.line, Some(1));
    }

    #[test]
    fn test_service_without_ports() {
        let result = validate_kubernetes_manifests(
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n  labels: {a: b, c: d}\nspec:\n  selector: {app: web}\n",
        );
        assert!(!result.valid);
        assert_eq!(result.errors[0].message, "Service must define at least one port");
        assert_eq!(result.summary.valid_resources, 0);
        assert_eq!(result.score, 85);
    }
}
