//! Error types for compose-bridge.
//!
//! Parse errors stop the pipeline for a given input. Conversion warnings and
//! validation issues are not errors and travel inside successful results.

use std::path::PathBuf;
use thiserror::Error;

/// A single structural schema violation found in a compose document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Dotted path to the offending field, e.g. `services.web.ports.0`
    pub path: String,
    /// Human readable reason
    pub reason: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Field '{}': {}", self.path, self.reason)
    }
}

fn format_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .enumerate()
        .map(|(i, v)| format!("  {}. {}", i + 1, v))
        .collect::<Vec<_>>()
        .join("\n")
}

fn megabytes(bytes: &u64) -> String {
    format!("{:.2}", *bytes as f64 / (1024.0 * 1024.0))
}

/// Errors raised while parsing a compose document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// YAML syntax error with a 1-based location
    #[error("YAML parsing error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// YAML syntax error the parser could not locate
    #[error("YAML parsing error: {0}")]
    SyntaxUnlocated(String),

    /// The document parsed but is not a mapping
    #[error("Invalid YAML: Expected an object but got {0}")]
    NotAnObject(String),

    /// Structural schema violations, rendered as a numbered list
    #[error("Validation failed:\n{}", format_violations(.0))]
    Schema(Vec<SchemaViolation>),
}

impl ParseError {
    /// Builds a syntax error from a `serde_yaml` error, keeping its location when known.
    pub fn from_yaml(err: &serde_yaml::Error) -> Self {
        match err.location() {
            Some(location) => ParseError::Syntax {
                line: location.line(),
                column: location.column(),
                message: err.to_string(),
            },
            None => ParseError::SyntaxUnlocated(err.to_string()),
        }
    }
}

/// Errors raised inside a projector. Projectors never panic; any internal
/// failure is reported through this type.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Failed to serialize {artifact}: {message}")]
    Serialization { artifact: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ConversionError {
    pub fn serialization(artifact: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ConversionError::Serialization {
            artifact: artifact.into(),
            message: err.to_string(),
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse configuration {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Project store errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Project not found: {0}")]
    NotFound(String),

    #[error(
        "Storage limit exceeded ({}MB / {}MB used). Delete unused projects to free space",
        megabytes(.used),
        megabytes(.limit)
    )]
    QuotaExceeded { used: u64, limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Top level error type of the crate.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),
}

/// Result type alias using BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_numbers_violations() {
        let err = ParseError::Schema(vec![
            SchemaViolation::new("services.web.ports", "Expected array but got string"),
            SchemaViolation::new("services.db.restart", "Invalid enum value"),
        ]);
        let text = err.to_string();
        assert!(text.starts_with("Validation failed:\n"));
        assert!(text.contains("  1. Field 'services.web.ports': Expected array but got string"));
        assert!(text.contains("  2. Field 'services.db.restart': Invalid enum value"));
    }

    #[test]
    fn test_syntax_error_carries_location() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("a: [1, 2").unwrap_err();
        match ParseError::from_yaml(&yaml_err) {
            ParseError::Syntax { line, .. } => assert!(line >= 1),
            ParseError::SyntaxUnlocated(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_quota_message_in_megabytes() {
        let err = StorageError::QuotaExceeded {
            used: 5 * 1024 * 1024,
            limit: 5 * 1024 * 1024,
        };
        assert!(err.to_string().contains("5.00MB / 5.00MB"));
    }
}
