//! Output formatters for validation reports.
//!
//! - Stylish - coloured terminal output grouped by severity (default)
//! - JSON - pretty-printed reports for machines

pub mod json;
pub mod stylish;

use super::FileReport;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Stylish,
    Json,
}

impl OutputFormat {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "stylish" => Some(Self::Stylish),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Formats reports according to `format`.
pub fn format_reports(reports: &[FileReport], format: OutputFormat) -> String {
    match format {
        OutputFormat::Stylish => stylish::format(reports),
        OutputFormat::Json => json::format(reports),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("stylish"), Some(OutputFormat::Stylish));
        assert_eq!(OutputFormat::parse("sarif"), None);
    }
}
