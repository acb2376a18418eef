use crate::cli::KindArg;
use crate::config::Config;
use crate::converter::{HelmChart, validate_helm_chart};
use crate::validator::{
    FileReport, ManifestKind, OutputFormat, ValidationResult, detect_kind, format_reports, validate_text,
};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const CHART_FILE: &str = "Chart.yaml";

#[derive(Debug, Clone, PartialEq)]
enum Input {
    File(PathBuf),
    Chart(PathBuf),
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

fn is_chart(dir: &Path) -> bool {
    dir.join(CHART_FILE).is_file()
}

/// Expands paths into validation inputs. Directories are walked; chart
/// directories are validated as a whole unless `kind` forces plain manifests.
fn collect_inputs(paths: &[PathBuf], kind: KindArg) -> Vec<Input> {
    let charts_allowed = matches!(kind, KindArg::Auto | KindArg::Helm);
    let mut inputs = Vec::new();

    for path in paths {
        if !path.is_dir() {
            inputs.push(Input::File(path.clone()));
            continue;
        }
        let mut walker = WalkDir::new(path).sort_by_file_name().into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let entry_path = entry.path();
            if entry.file_type().is_dir() {
                if charts_allowed && is_chart(entry_path) {
                    inputs.push(Input::Chart(entry_path.to_path_buf()));
                    walker.skip_current_dir();
                }
                continue;
            }
            if is_yaml(entry_path) {
                inputs.push(Input::File(entry_path.to_path_buf()));
            }
        }
    }
    inputs
}

fn validate_input(input: &Input, kind: KindArg) -> crate::Result<FileReport> {
    match input {
        Input::Chart(dir) => {
            let chart = HelmChart::load(dir)?;
            Ok(FileReport {
                source: dir.display().to_string(),
                kind: ManifestKind::Helm,
                result: ValidationResult::from(&validate_helm_chart(&chart)),
            })
        }
        Input::File(path) => {
            let text = fs::read_to_string(path)?;
            let kind = match kind {
                KindArg::Auto => detect_kind(&text),
                KindArg::Kubernetes | KindArg::Helm => ManifestKind::Kubernetes,
                KindArg::Stack => ManifestKind::Stack,
            };
            Ok(FileReport {
                source: path.display().to_string(),
                kind,
                result: validate_text(kind, &text),
            })
        }
    }
}

/// Validates every input in parallel. Returns `false` when any report is
/// invalid or below the minimum score.
pub fn handle_validate(
    paths: &[PathBuf],
    kind: KindArg,
    format: Option<OutputFormat>,
    min_score: Option<u8>,
    config: &Config,
) -> crate::Result<bool> {
    let inputs = collect_inputs(paths, kind);
    if inputs.is_empty() {
        return Err(crate::error::BridgeError::Usage(
            "No YAML files or Helm charts found to validate".to_string(),
        ));
    }
    log::info!("Validating {} inputs", inputs.len());

    let reports = inputs
        .par_iter()
        .map(|input| validate_input(input, kind))
        .collect::<crate::Result<Vec<_>>>()?;

    let format = format.unwrap_or(config.output.format);
    println!("{}", format_reports(&reports, format));

    let min_score = u32::from(min_score.unwrap_or(config.validation.min_score));
    let fail_on_warnings = config.validation.fail_on_warnings;
    Ok(reports.iter().all(|report| {
        report.passes(min_score) && !(fail_on_warnings && !report.result.warnings.is_empty())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_inputs_finds_charts_and_manifests() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("helm/shop/templates")).unwrap();
        fs::write(root.join("helm/shop/Chart.yaml"), "apiVersion: v2\n").unwrap();
        fs::write(root.join("helm/shop/templates/web-deployment.yaml"), "kind: Deployment\n").unwrap();
        fs::create_dir_all(root.join("kubernetes")).unwrap();
        fs::write(root.join("kubernetes/deployment-web.yaml"), "kind: Deployment\n").unwrap();
        fs::write(root.join("README.md"), "# docs\n").unwrap();

        let inputs = collect_inputs(&[root.to_path_buf()], KindArg::Auto);
        assert_eq!(
            inputs,
            vec![
                Input::Chart(root.join("helm/shop")),
                Input::File(root.join("kubernetes/deployment-web.yaml")),
            ]
        );

        let inputs = collect_inputs(&[root.to_path_buf()], KindArg::Kubernetes);
        assert_eq!(inputs.len(), 3);
    }

    #[test]
    fn test_validate_input_detects_stack() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docker-stack.yml");
        fs::write(&path, "version: '3.8'\nservices:\n  web:\n    image: nginx:1.25\n").unwrap();
        let report = validate_input(&Input::File(path), KindArg::Auto).unwrap();
        assert_eq!(report.kind, ManifestKind::Stack);
        assert!(report.result.valid);
    }
}
