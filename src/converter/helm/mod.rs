//! Compose → Helm chart projector.
//!
//! The chart is emitted as text: `Chart.yaml`, `values.yaml` with one key per
//! service and Go templates that a Helm renderer consumes later.

pub mod templates;

use super::naming::{kube_name, unique_kube_name, unique_values_key, values_key};
use crate::compose::{ComposeDocument, ServiceMetadata};
use crate::error::ConversionError;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;
use templates::TemplateContext;

pub const CHART_API_VERSION: &str = "v2";
pub const DEFAULT_CHART_VERSION: &str = "0.1.0";
pub const DEFAULT_APP_VERSION: &str = "1.0.0";
/// `replicaCount` when the service does not set `deploy.replicas`.
pub const DEFAULT_REPLICA_COUNT: u32 = 1;
/// `service.port` when the service publishes nothing.
pub const DEFAULT_SERVICE_PORT: u16 = 80;
/// Top-level values keys the chart itself reads.
const RESERVED_VALUES_KEYS: [&str; 3] = ["global", "nameOverride", "fullnameOverride"];

/// Optional chart metadata overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartOptions {
    pub version: Option<String>,
    pub app_version: Option<String>,
    pub description: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,
    pub email: String,
}

/// `Chart.yaml` contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub api_version: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub chart_type: String,
    pub version: String,
    pub app_version: String,
    pub keywords: Vec<String>,
    pub maintainers: Vec<Maintainer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageValues {
    repository: String,
    tag: String,
    pull_policy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ServicePortValues {
    #[serde(rename = "type")]
    service_type: String,
    port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct QuantityValues {
    cpu: String,
    memory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ResourceValues {
    limits: QuantityValues,
    requests: QuantityValues,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct AutoscalingValues {
    enabled: bool,
    min_replicas: u32,
    max_replicas: u32,
    #[serde(rename = "targetCPUUtilizationPercentage")]
    target_cpu_utilization_percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngressPath {
    path: String,
    path_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct IngressHost {
    host: String,
    paths: Vec<IngressPath>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngressValues {
    enabled: bool,
    class_name: String,
    annotations: BTreeMap<String, String>,
    hosts: Vec<IngressHost>,
    tls: Vec<Value>,
}

/// Values block for one service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceValues {
    enabled: bool,
    replica_count: u32,
    image: ImageValues,
    service: ServicePortValues,
    resources: ResourceValues,
    autoscaling: AutoscalingValues,
    ingress: IngressValues,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct GlobalValues {
    storage_class: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ChartValues {
    #[serde(flatten)]
    services: BTreeMap<String, ServiceValues>,
    global: GlobalValues,
}

/// A generated chart. Templates are keyed by file name under `templates/`.
#[derive(Debug, Clone, PartialEq)]
pub struct HelmChart {
    pub name: String,
    pub chart_yaml: String,
    pub values_yaml: String,
    pub templates: BTreeMap<String, String>,
}

impl HelmChart {
    /// Reads a chart directory. Missing `Chart.yaml` or `values.yaml` load as
    /// empty text so linting reports them instead of failing here.
    pub fn load(dir: &Path) -> io::Result<Self> {
        let read = |name: &str| -> io::Result<String> {
            let path = dir.join(name);
            if path.is_file() {
                fs::read_to_string(path)
            } else {
                Ok(String::new())
            }
        };

        let mut templates = BTreeMap::new();
        let templates_dir = dir.join("templates");
        if templates_dir.is_dir() {
            for entry in fs::read_dir(&templates_dir)? {
                let path = entry?.path();
                if !path.is_file() {
                    continue;
                }
                if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
                    templates.insert(file_name.to_string(), fs::read_to_string(&path)?);
                }
            }
        }

        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("chart")
            .to_string();
        Ok(Self {
            name,
            chart_yaml: read("Chart.yaml")?,
            values_yaml: read("values.yaml")?,
            templates,
        })
    }
}

/// Outcome of [`validate_helm_chart`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HelmValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Splits `repo[:tag]` at the last `:` after the last `/`, so registry ports
/// stay in the repository part.
fn split_image(image: &str) -> (String, String) {
    let name_start = image.rfind('/').map(|i| i + 1).unwrap_or(0);
    match image[name_start..].rfind(':') {
        Some(offset) => {
            let at = name_start + offset;
            (image[..at].to_string(), image[at + 1..].to_string())
        }
        None => (image.to_string(), "latest".to_string()),
    }
}

fn service_values(app: &str, metadata: &ServiceMetadata) -> ServiceValues {
    let (repository, tag) = split_image(metadata.image.as_deref().unwrap_or("nginx"));
    ServiceValues {
        enabled: true,
        replica_count: metadata.replicas.unwrap_or(DEFAULT_REPLICA_COUNT),
        image: ImageValues {
            repository,
            tag,
            pull_policy: "IfNotPresent".to_string(),
        },
        service: ServicePortValues {
            service_type: "ClusterIP".to_string(),
            port: metadata
                .first_container_port()
                .unwrap_or(DEFAULT_SERVICE_PORT),
        },
        resources: ResourceValues {
            limits: QuantityValues {
                cpu: "500m".to_string(),
                memory: "512Mi".to_string(),
            },
            requests: QuantityValues {
                cpu: "100m".to_string(),
                memory: "128Mi".to_string(),
            },
        },
        autoscaling: AutoscalingValues {
            enabled: false,
            min_replicas: 1,
            max_replicas: 10,
            target_cpu_utilization_percentage: 80,
        },
        ingress: IngressValues {
            enabled: false,
            class_name: "nginx".to_string(),
            annotations: BTreeMap::new(),
            hosts: vec![IngressHost {
                host: format!("{}.example.com", app),
                paths: vec![IngressPath {
                    path: "/".to_string(),
                    path_type: "Prefix".to_string(),
                }],
            }],
            tls: Vec::new(),
        },
        env: metadata.environment_variables.clone(),
    }
}

fn chart_metadata(chart_name: &str, project_name: &str, meta: &ChartOptions) -> ChartMetadata {
    ChartMetadata {
        api_version: CHART_API_VERSION.to_string(),
        name: chart_name.to_string(),
        description: meta
            .description
            .clone()
            .unwrap_or_else(|| format!("Helm chart for {}", project_name)),
        chart_type: "application".to_string(),
        version: meta
            .version
            .clone()
            .unwrap_or_else(|| DEFAULT_CHART_VERSION.to_string()),
        app_version: meta
            .app_version
            .clone()
            .unwrap_or_else(|| DEFAULT_APP_VERSION.to_string()),
        keywords: vec![
            "docker-compose".to_string(),
            "kubernetes".to_string(),
            "deployment".to_string(),
        ],
        maintainers: vec![Maintainer {
            name: "DevOps Team".to_string(),
            email: "devops@example.com".to_string(),
        }],
    }
}

/// Generates a Helm chart for `document`.
///
/// Every service gets a Deployment and an Ingress template; a Service
/// template is emitted only when the service publishes ports.
pub fn generate_helm_chart(
    name: &str,
    document: &ComposeDocument,
    meta: &ChartOptions,
) -> Result<HelmChart, ConversionError> {
    let chart_name = kube_name(name);
    log::info!(
        "Generating Helm chart '{}' for {} services",
        chart_name,
        document.services.len()
    );

    let mut services = BTreeMap::new();
    let mut contexts = Vec::new();
    let mut taken_keys: BTreeSet<String> =
        RESERVED_VALUES_KEYS.iter().map(|k| k.to_string()).collect();
    let mut taken_names = BTreeSet::new();
    for (service_name, service) in &document.services {
        let metadata = ServiceMetadata::from_service(service_name, service);
        let key = unique_values_key(service_name, &mut taken_keys);
        if key != values_key(service_name) {
            log::warn!(
                "Service '{}' would use taken values key '{}'; using '{}'",
                service_name,
                values_key(service_name),
                key
            );
        }
        let app = unique_kube_name(service_name, &mut taken_names);
        services.insert(key.clone(), service_values(&app, &metadata));
        contexts.push((key, app, !metadata.ports.is_empty()));
    }

    let chart_yaml = serde_yaml::to_string(&chart_metadata(&chart_name, name, meta))
        .map_err(|e| ConversionError::serialization("Chart.yaml", e))?;
    let values = ChartValues {
        services,
        global: GlobalValues {
            storage_class: "standard".to_string(),
        },
    };
    let values_yaml = serde_yaml::to_string(&values)
        .map_err(|e| ConversionError::serialization("values.yaml", e))?;

    let mut rendered = BTreeMap::new();
    rendered.insert("_helpers.tpl".to_string(), templates::helpers(&chart_name));
    let all: Vec<TemplateContext<'_>> = contexts
        .iter()
        .map(|(key, service, _)| TemplateContext {
            chart: &chart_name,
            key,
            service,
        })
        .collect();
    rendered.insert("NOTES.txt".to_string(), templates::notes(&all, meta.namespace.as_deref()));

    for (ctx, (_, _, publishes)) in all.iter().zip(&contexts) {
        rendered.insert(
            format!("{}-deployment.yaml", ctx.service),
            templates::deployment(ctx),
        );
        if *publishes {
            rendered.insert(
                format!("{}-service.yaml", ctx.service),
                templates::service(ctx),
            );
        }
        rendered.insert(
            format!("{}-ingress.yaml", ctx.service),
            templates::ingress(ctx),
        );
    }

    Ok(HelmChart {
        name: chart_name,
        chart_yaml,
        values_yaml,
        templates: rendered,
    })
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(_) => true,
    }
}

/// Lints a generated chart: required `Chart.yaml` fields are errors, missing
/// or empty templates are warnings.
pub fn validate_helm_chart(chart: &HelmChart) -> HelmValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let parsed = serde_yaml::from_str::<Value>(&chart.chart_yaml)
        .and_then(|chart_obj| serde_yaml::from_str::<Value>(&chart.values_yaml).map(|_| chart_obj));

    match parsed {
        Ok(chart_obj) => {
            for field in ["apiVersion", "name", "version"] {
                if !is_present(chart_obj.get(field)) {
                    errors.push(format!("Chart.yaml: {} is required", field));
                }
            }
            if chart_obj.get("apiVersion").and_then(Value::as_str) != Some(CHART_API_VERSION) {
                warnings.push("Chart.yaml: apiVersion should be v2 for Helm 3".to_string());
            }

            for (filename, content) in &chart.templates {
                if content.trim().is_empty() {
                    warnings.push(format!("Template {} is empty", filename));
                }
            }
            if !chart.templates.keys().any(|k| k.contains("deployment")) {
                warnings.push("No deployment template found".to_string());
            }
            if !chart.templates.contains_key("_helpers.tpl") {
                warnings.push("_helpers.tpl not found - recommended for label management".to_string());
            }
        }
        Err(e) => errors.push(format!("YAML parsing error: {}", e)),
    }

    HelmValidation {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}
