use super::open_store;
use super::parse::print_warnings;
use crate::cli::ConvertArgs;
use crate::compose::parse_compose;
use crate::config::Config;
use crate::converter::{ConversionBundle, ConversionOptions, convert_all, validate_helm_chart};
use crate::storage::{Project, ProjectStore};
use crate::validator::{
    FileReport, ManifestKind, ValidationResult, format_reports, validate_docker_stack,
    validate_kubernetes_manifests,
};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

const FALLBACK_PROJECT_NAME: &str = "compose-app";

/// Applies command-line flags on top of configured defaults.
pub fn resolve_options(args: &ConvertArgs, config: &Config) -> ConversionOptions {
    let mut options = config.conversion.to_options();
    if let Some(platform) = args.platform {
        options.target_platform = platform;
    }
    if let Some(proxy) = args.proxy {
        options.proxy_type = proxy;
    }
    if let Some(profile) = args.profile {
        options.resource_profile = Some(profile);
    }
    if args.no_health_checks {
        options.add_health_checks = false;
    }
    if args.no_resource_limits {
        options.add_resource_limits = false;
    }
    if args.no_security {
        options.add_security = false;
    }
    if let Some(namespace) = &args.namespace {
        options.namespace = Some(namespace.clone());
    }
    if let Some(email) = &args.email {
        options.lets_encrypt_email = Some(email.clone());
    }
    for (service, host) in &args.domains {
        options.custom_domains.insert(service.clone(), host.clone());
    }
    options
}

/// `--name`, then the configured name, then the compose file's directory.
pub fn project_name(args: &ConvertArgs, config: &Config) -> String {
    args.name
        .clone()
        .or_else(|| config.conversion.project_name.clone())
        .or_else(|| {
            let dir = args.file.canonicalize().ok()?.parent()?.to_path_buf();
            dir.file_name()?.to_str().map(str::to_string)
        })
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_PROJECT_NAME.to_string())
}

/// Validates every generated artifact.
pub fn validate_bundle(bundle: &ConversionBundle) -> Vec<FileReport> {
    let mut reports = Vec::new();
    if let Some(k8s) = &bundle.kubernetes {
        reports.push(FileReport {
            source: "kubernetes/".to_string(),
            kind: ManifestKind::Kubernetes,
            result: validate_kubernetes_manifests(&k8s.to_multi_document()),
        });
    }
    if let Some(swarm) = &bundle.swarm {
        reports.push(FileReport {
            source: "swarm/docker-stack.yml".to_string(),
            kind: ManifestKind::Stack,
            result: validate_docker_stack(&swarm.yaml),
        });
    }
    if let Some(chart) = &bundle.helm {
        reports.push(FileReport {
            source: format!("helm/{}/", chart.name),
            kind: ManifestKind::Helm,
            result: ValidationResult::from(&validate_helm_chart(chart)),
        });
    }
    reports
}

fn write_files(root: &Path, bundle: &ConversionBundle) -> crate::Result<usize> {
    let files = bundle.files();
    for (relative, content) in &files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        log::debug!("Wrote {}", path.display());
    }
    Ok(files.len())
}

/// Returns `false` when a projector failed or validation did not pass.
pub fn handle_convert(args: ConvertArgs, config: &Config, store_dir: Option<&Path>) -> crate::Result<bool> {
    let content = fs::read_to_string(&args.file)?;
    let parsed = parse_compose(&content)?;
    let options = resolve_options(&args, config);
    let name = project_name(&args, config);

    println!(
        "🔄 Converting {} ({} services) as '{}' for {}",
        args.file.display(),
        parsed.service_count(),
        name,
        options.target_platform
    );

    let bundle = convert_all(&name, &parsed.document, &options, args.optimize || config.conversion.optimize_swarm);
    let mut warnings = parsed.warnings.clone();
    warnings.extend(bundle.warnings.iter().cloned());
    print_warnings(&warnings);
    for error in &bundle.errors {
        eprintln!("{} {}", "❌".red(), error);
    }

    let output: PathBuf = args.output.clone().unwrap_or_else(|| config.output.directory.clone());
    if args.dry_run {
        println!("\n--- files (dry run, {}) ---", output.display());
        for path in bundle.files().keys() {
            println!("{}", output.join(path).display());
        }
    } else {
        let count = write_files(&output, &bundle)?;
        println!("\n✅ Wrote {} files to {}", count, output.display());
    }

    let mut passed = bundle.is_success();

    if args.validate {
        let reports = validate_bundle(&bundle);
        println!("{}", format_reports(&reports, config.output.format));
        let min_score = u32::from(config.validation.min_score);
        for report in &reports {
            let warned = config.validation.fail_on_warnings && !report.result.warnings.is_empty();
            if !report.passes(min_score) || warned {
                passed = false;
            }
        }
    }

    if args.save {
        let filename = args
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("docker-compose.yml")
            .to_string();
        let project = Project::new(name, filename, content, options);
        let id = project.id;
        let mut store = open_store(store_dir);
        store.set(project)?;
        let usage = store.usage()?;
        println!("💾 Saved project {} ({:.1}% of storage used)", id, usage.usage_percentage);
        if usage.near_limit {
            println!("{} Project storage is nearly full", "⚠️".yellow());
        }
    }

    Ok(passed)
}
