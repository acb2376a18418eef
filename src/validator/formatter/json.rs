//! JSON output formatter.

use crate::validator::FileReport;
use serde_json::json;

pub fn format(reports: &[FileReport]) -> String {
    let output: Vec<serde_json::Value> = reports
        .iter()
        .map(|report| {
            json!({
                "source": report.source,
                "kind": report.kind,
                "result": report.result,
            })
        })
        .collect();

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{ManifestKind, validate_docker_stack};

    #[test]
    fn test_json_format() {
        let report = FileReport {
            source: "docker-stack.yml".to_string(),
            kind: ManifestKind::Stack,
            result: validate_docker_stack("services:\n  web:\n    image: nginx\n"),
        };
        let output = format(&[report]);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        let first = &parsed.as_array().unwrap()[0];
        assert_eq!(first["source"], "docker-stack.yml");
        assert_eq!(first["kind"], "stack");
        assert_eq!(first["result"]["valid"], true);
        assert_eq!(first["result"]["summary"]["totalResources"], 1);
    }
}
