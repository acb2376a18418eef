//! Docker Stack (Swarm compose) validation.

use super::types::{Severity, ValidationIssue, ValidationResult};
use crate::compose::model::scalar_to_string;
use serde_yaml::{Mapping, Value};

pub const STACK_RESOURCE: &str = "docker-stack.yml";
const STACK_KIND: &str = "DockerCompose";
const SERVICE_KIND: &str = "Service";

fn service_issues(name: &str, service: &Value) -> Vec<ValidationIssue> {
    let empty = Mapping::new();
    let service = service.as_mapping().unwrap_or(&empty);
    let present = |key: &str| service.get(key).is_some_and(|v| !v.is_null());
    let mut issues = Vec::new();

    if !present("image") && !present("build") {
        issues.push(
            ValidationIssue::error(name, SERVICE_KIND, "Service must define either image or build")
                .with_field("image"),
        );
    }

    match service.get("deploy").filter(|d| !d.is_null()) {
        None => issues.push(
            ValidationIssue::info(name, SERVICE_KIND, "No deploy configuration specified")
                .with_field("deploy")
                .with_suggestion("Add deploy section with replicas, resources, and restart_policy"),
        ),
        Some(deploy) => {
            if deploy.get("replicas").is_none() {
                issues.push(
                    ValidationIssue::info(name, SERVICE_KIND, "Replicas not specified (defaults to 1)")
                        .with_field("deploy.replicas")
                        .with_suggestion("Specify replicas for production deployments"),
                );
            }
            if deploy.get("resources").is_none_or(Value::is_null) {
                issues.push(
                    ValidationIssue::warning(name, SERVICE_KIND, "No resource limits defined")
                        .with_field("deploy.resources")
                        .with_suggestion("Define resource limits to prevent resource exhaustion"),
                );
            }
        }
    }

    if !present("healthcheck") {
        issues.push(
            ValidationIssue::info(name, SERVICE_KIND, "No healthcheck defined")
                .with_suggestion("Add healthcheck for better reliability"),
        );
    }
    issues
}

/// Validates a single compose document meant for `docker stack deploy`.
///
/// Never fails: unparseable input yields a single error and score 0. A
/// document without services is reported through the regular scoring path
/// with zero resources, so its score is 0 as well.
pub fn validate_docker_stack(text: &str) -> ValidationResult {
    let config = match serde_yaml::from_str::<Value>(text) {
        Ok(config) => config,
        Err(e) => {
            return ValidationResult::fatal(
                ValidationIssue::error(STACK_RESOURCE, STACK_KIND, format!("YAML parsing error: {}", e)),
                "Fix YAML syntax errors",
            );
        }
    };
    let Some(root) = config.as_mapping() else {
        return ValidationResult::fatal(
            ValidationIssue::error(STACK_RESOURCE, STACK_KIND, "Invalid Docker Compose YAML"),
            "Check YAML syntax",
        );
    };

    let mut issues = Vec::new();
    let has_version = root
        .get("version")
        .is_some_and(|v| !v.is_null() && !scalar_to_string(v).is_empty());
    if !has_version {
        issues.push(
            ValidationIssue::warning(STACK_RESOURCE, STACK_KIND, "Docker Compose version not specified")
                .with_field("version")
                .with_suggestion("Add version: \"3.8\" or higher"),
        );
    }

    let services = root
        .get("services")
        .and_then(Value::as_mapping)
        .filter(|s| !s.is_empty());
    let Some(services) = services else {
        issues.push(
            ValidationIssue::error(STACK_RESOURCE, STACK_KIND, "No services defined").with_field("services"),
        );
        return ValidationResult::from_issues(0, 0, issues);
    };

    let mut valid_resources = 0;
    for (name, service) in services {
        let service_issues = service_issues(&scalar_to_string(name), service);
        if service_issues.iter().all(|i| i.severity != Severity::Error) {
            valid_resources += 1;
        }
        issues.extend(service_issues);
    }

    log::info!("Validated stack with {} services", services.len());
    ValidationResult::from_issues(services.len(), valid_resources, issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_stack() {
        let result = validate_docker_stack(
            r#"
version: "3.8"
services:
  web:
    image: nginx:1.25
    deploy:
      replicas: 3
      resources:
        limits: {cpus: "0.5", memory: 512M}
    healthcheck:
      test: ["CMD", "curl", "-f", "http://localhost"]
"#,
        );
        assert!(result.valid);
        assert_eq!(result.score, 100);
        assert_eq!(result.summary.total_resources, 1);
        assert_eq!(result.summary.valid_resources, 1);
    }

    #[test]
    fn test_bare_service() {
        let result = validate_docker_stack("services:\n  web:\n    build: .\n");
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.info.len(), 2);
        assert_eq!(result.score, 100 - 5 - 2 * 2);
    }

    #[test]
    fn test_missing_image_and_resources() {
        let result = validate_docker_stack(
            "version: '3.8'\nservices:\n  worker:\n    deploy:\n      mode: global\n",
        );
        assert!(!result.valid);
        assert_eq!(result.errors[0].message, "Service must define either image or build");
        let messages: Vec<&str> = result.issues().map(|i| i.message.as_str()).collect();
        assert!(messages.contains(&"Replicas not specified (defaults to 1)"));
        assert!(messages.contains(&"No resource limits defined"));
        assert_eq!(result.summary.valid_resources, 0);
    }

    #[test]
    fn test_no_services_has_consistent_shape() {
        let result = validate_docker_stack("version: '3.8'\nservices: {}\n");
        assert!(!result.valid);
        assert_eq!(result.score, 0);
        assert_eq!(result.summary.total_resources, 0);
        assert_eq!(result.summary.error_count, 1);
        assert_eq!(result.suggestions, vec!["Fix 1 critical error before deploying"]);
    }

    #[test]
    fn test_invalid_inputs() {
        let result = validate_docker_stack("services: [unclosed");
        assert_eq!(result.score, 0);
        assert!(result.errors[0].message.starts_with("YAML parsing error"));

        let result = validate_docker_stack("- just\n- a list\n");
        assert_eq!(result.errors[0].message, "Invalid Docker Compose YAML");
        assert_eq!(result.suggestions, vec!["Check YAML syntax"]);
    }
}
