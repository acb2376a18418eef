//! Compose text → document model.

use super::metadata::ComposeMetadata;
use super::model::ComposeDocument;
use super::schema::{type_name, validate_structure};
use crate::error::{ParseError, SchemaViolation};
use serde_yaml::Value;
use std::path::Path;

/// A successfully parsed compose file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCompose {
    pub document: ComposeDocument,
    pub metadata: ComposeMetadata,
    /// Non-fatal findings such as services without image or build
    pub warnings: Vec<String>,
}

impl ParsedCompose {
    pub fn service_count(&self) -> usize {
        self.document.services.len()
    }
}

/// Parses and structurally validates compose YAML.
pub fn parse_compose(text: &str) -> Result<ParsedCompose, ParseError> {
    let root: Value = serde_yaml::from_str(text).map_err(|e| ParseError::from_yaml(&e))?;

    let Value::Mapping(mapping) = &root else {
        return Err(ParseError::NotAnObject(type_name(&root).to_string()));
    };

    let violations = validate_structure(mapping);
    if !violations.is_empty() {
        return Err(ParseError::Schema(violations));
    }

    let document: ComposeDocument = serde_yaml::from_value(root)
        .map_err(|e| ParseError::Schema(vec![SchemaViolation::new("document", e.to_string())]))?;

    let mut warnings = Vec::new();
    if document.services.is_empty() {
        warnings.push("No services defined in Docker Compose file".to_string());
    }
    for (name, service) in &document.services {
        if !service.has_image_or_build() {
            warnings.push(format!(
                "Service '{}' has neither 'image' nor 'build' specified",
                name
            ));
        }
    }

    let metadata = ComposeMetadata::from_document(&document);
    log::debug!(
        "Parsed compose document with {} services, {} volumes, {} networks",
        metadata.services.len(),
        metadata.volume_names.len(),
        metadata.network_names.len()
    );

    Ok(ParsedCompose {
        document,
        metadata,
        warnings,
    })
}

/// Reads and parses a compose file from disk.
pub fn parse_compose_file(path: &Path) -> crate::Result<ParsedCompose> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_compose(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SERVICES: &str = r#"
version: "3.8"
services:
  web:
    image: nginx
    ports:
      - "80:80"
  db:
    image: postgres:15
    volumes:
      - pgdata:/var/lib/postgresql/data
volumes:
  pgdata:
"#;

    #[test]
    fn test_parse_two_services() {
        let parsed = parse_compose(TWO_SERVICES).unwrap();
        assert_eq!(parsed.service_count(), 2);
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.metadata.volume_names, vec!["pgdata"]);

        let web = parsed.metadata.service("web").unwrap();
        assert_eq!(web.ports.len(), 1);
        assert_eq!(web.ports[0].container_port, 80);
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let first = parse_compose(TWO_SERVICES).unwrap();
        let second = parse_compose(TWO_SERVICES).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_yaml_reports_location() {
        let err = parse_compose("services:\n  web: [unclosed\n").unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("YAML parsing error"), "{text}");
    }

    #[test]
    fn test_non_object_root() {
        let err = parse_compose("- a\n- b\n").unwrap_err();
        assert_eq!(err, ParseError::NotAnObject("array".to_string()));
        assert_eq!(
            err.to_string(),
            "Invalid YAML: Expected an object but got array"
        );
    }

    #[test]
    fn test_schema_failure_is_numbered() {
        let err = parse_compose("services:\n  web:\n    ports: 80\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed:\n  1. Field 'services.web.ports': Expected array but got number"
        );
    }

    #[test]
    fn test_warnings_for_empty_and_imageless() {
        let parsed = parse_compose("services: {}\n").unwrap();
        assert_eq!(
            parsed.warnings,
            vec!["No services defined in Docker Compose file"]
        );

        let parsed = parse_compose("services:\n  worker:\n    command: run\n").unwrap();
        assert_eq!(
            parsed.warnings,
            vec!["Service 'worker' has neither 'image' nor 'build' specified"]
        );
        // metadata is still computed
        assert_eq!(parsed.metadata.services.len(), 1);
    }
}
