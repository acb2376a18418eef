//! Projectors from the compose model to deployment artifacts.
//!
//! [`convert_all`] runs every projector selected by the options and gathers
//! their output into a [`ConversionBundle`].

pub mod hardening;
pub mod helm;
pub mod kubernetes;
pub mod naming;
pub mod options;
pub mod proxy;
pub mod swarm;

pub use helm::{ChartOptions, HelmChart, HelmValidation, generate_helm_chart, validate_helm_chart};
pub use kubernetes::KubernetesConversion;
pub use options::{ConversionOptions, ProxyType, ResourceProfile, TargetPlatform};
pub use proxy::ProxyArtifacts;
pub use swarm::SwarmConversion;

use crate::compose::ComposeDocument;
use crate::error::ConversionError;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Stack file name inside `swarm/`.
pub const STACK_FILE: &str = "docker-stack.yml";

/// Everything produced by one conversion run.
#[derive(Debug, Clone, Default)]
pub struct ConversionBundle {
    pub kubernetes: Option<KubernetesConversion>,
    pub swarm: Option<SwarmConversion>,
    pub helm: Option<HelmChart>,
    pub proxy: Option<ProxyArtifacts>,
    pub warnings: Vec<String>,
    /// Projectors that failed, as `<target>: <message>`
    pub errors: Vec<String>,
}

impl ConversionBundle {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Relative path → contents for every generated artifact.
    pub fn files(&self) -> BTreeMap<PathBuf, String> {
        let mut files = BTreeMap::new();

        if let Some(k8s) = &self.kubernetes {
            for (name, yaml) in &k8s.yaml {
                files.insert(
                    PathBuf::from("kubernetes").join(kubernetes_dir(name)).join(name),
                    yaml.clone(),
                );
            }
        }
        if let Some(proxy) = &self.proxy {
            for (name, yaml) in &proxy.ingress_routes {
                files.insert(
                    PathBuf::from("kubernetes").join("ingress").join(name),
                    yaml.clone(),
                );
            }
            for (name, text) in &proxy.files {
                files.insert(PathBuf::from("proxy").join(name), text.clone());
            }
        }
        if let Some(swarm) = &self.swarm {
            files.insert(PathBuf::from("swarm").join(STACK_FILE), swarm.yaml.clone());
        }
        if let Some(chart) = &self.helm {
            let root = PathBuf::from("helm").join(&chart.name);
            files.insert(root.join("Chart.yaml"), chart.chart_yaml.clone());
            files.insert(root.join("values.yaml"), chart.values_yaml.clone());
            for (name, text) in &chart.templates {
                files.insert(root.join("templates").join(name), text.clone());
            }
        }
        files
    }
}

fn kubernetes_dir(file: &str) -> &'static str {
    match file.split('-').next() {
        Some("deployment") => "deployments",
        Some("service") => "services",
        Some("configmap") => "configmaps",
        Some("pvc") => "pvcs",
        _ => "ingress",
    }
}

fn record<T>(
    target: &str,
    result: Result<T, ConversionError>,
    errors: &mut Vec<String>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::error!("{} conversion failed: {}", target, e);
            errors.push(format!("{}: {}", target, e));
            None
        }
    }
}

/// Runs the projectors selected by `options.target_platform` in parallel.
///
/// The Helm chart is always generated. A failing projector is recorded in
/// `errors` and does not stop the others.
pub fn convert_all(
    project_name: &str,
    document: &ComposeDocument,
    options: &ConversionOptions,
    optimize_swarm: bool,
) -> ConversionBundle {
    let platform = options.target_platform;
    log::info!(
        "Converting '{}' ({} services) for {}",
        project_name,
        document.services.len(),
        platform
    );

    let ((k8s, swarm), (helm, proxy)) = rayon::join(
        || {
            rayon::join(
                || {
                    platform
                        .includes_kubernetes()
                        .then(|| kubernetes::convert(document, options))
                },
                || {
                    platform.includes_swarm().then(|| {
                        if optimize_swarm {
                            swarm::convert_with_optimizations(document, options)
                        } else {
                            swarm::convert(document, options)
                        }
                    })
                },
            )
        },
        || {
            rayon::join(
                || {
                    let meta = ChartOptions {
                        namespace: options.namespace.clone(),
                        ..ChartOptions::default()
                    };
                    generate_helm_chart(project_name, document, &meta)
                },
                || proxy::generate(document, options),
            )
        },
    );

    let mut bundle = ConversionBundle::default();
    if let Some(result) = k8s {
        bundle.kubernetes = record("Kubernetes", result, &mut bundle.errors);
    }
    if let Some(result) = swarm {
        bundle.swarm = record("Docker Swarm", result, &mut bundle.errors);
    }
    bundle.helm = record("Helm", helm, &mut bundle.errors);
    bundle.proxy = record("Proxy", proxy, &mut bundle.errors).flatten();

    if let Some(k8s) = &bundle.kubernetes {
        bundle.warnings.extend(k8s.warnings.iter().cloned());
    }
    if let Some(swarm) = &bundle.swarm {
        bundle.warnings.extend(swarm.warnings.iter().cloned());
    }
    if matches!(options.proxy_type, ProxyType::Nginx | ProxyType::Caddy) {
        bundle.warnings.push(format!(
            "No {} configuration generator available; configure the proxy manually",
            options.proxy_type
        ));
    }
    bundle
}
