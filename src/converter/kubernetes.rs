//! Compose → Kubernetes projector.
//!
//! Each compose service becomes a Deployment, plus a Service when it publishes
//! ports, a ConfigMap when it has environment variables and one
//! PersistentVolumeClaim per named volume it mounts.

use super::hardening::{self, HealthCheckOptions, SecurityOptions};
use super::naming::{claim_name, kube_name, kube_names};
use super::options::ConversionOptions;
use crate::compose::{
    ComposeDocument, MountType, Service as ComposeService, ServiceMetadata, StringOrList,
};
use crate::error::ConversionError;
use crate::k8s::{
    ConfigMap, Container, ContainerPort, Deployment, DeploymentSpec, EmptyDirSource, EnvVar,
    EnvVarSource, IntOrString, KeySelector, KubernetesManifests, LabelSelector, Labels,
    ObjectMeta, PersistentVolumeClaim, PersistentVolumeClaimSource, PersistentVolumeClaimSpec,
    PodSpec, PodTemplateMeta, PodTemplateSpec, Service, ServicePort, ServiceSpec, Volume,
    VolumeMount, VolumeResourceRequirements,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Replicas when the compose service does not set `deploy.replicas`.
pub const DEFAULT_REPLICAS: u32 = 3;
/// Image used for services that only declare a `build` context.
pub const PLACEHOLDER_IMAGE: &str = "nginx:latest";
/// Probe port for services that publish nothing.
pub const DEFAULT_CONTAINER_PORT: u16 = 8080;
const DEFAULT_STORAGE: &str = "1Gi";

/// Output of a Kubernetes conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct KubernetesConversion {
    pub manifests: KubernetesManifests,
    /// File name → YAML document
    pub yaml: BTreeMap<String, String>,
    pub warnings: Vec<String>,
}

impl KubernetesConversion {
    /// All documents joined into one `---` separated stream.
    pub fn to_multi_document(&self) -> String {
        self.yaml
            .values()
            .map(|doc| doc.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n---\n")
            + "\n"
    }
}

/// Converts a compose document into Kubernetes manifests.
pub fn convert(
    document: &ComposeDocument,
    options: &ConversionOptions,
) -> Result<KubernetesConversion, ConversionError> {
    let namespace = options.namespace();
    let mut manifests = KubernetesManifests::default();
    let mut warnings = Vec::new();
    let names = kube_names(document.services.keys());

    for (service_name, service) in &document.services {
        let app = names[service_name].clone();
        let sanitized = kube_name(service_name);
        if app != sanitized {
            warnings.push(format!(
                "Service '{}' maps to Kubernetes name '{}', which is already taken; using '{}'",
                service_name, sanitized, app
            ));
        }

        let metadata = ServiceMetadata::from_service(service_name, service);
        log::debug!("Projecting service '{}' as '{}'", service_name, app);

        if service.image.is_none() {
            warnings.push(format!(
                "Service '{}' has no image; using placeholder '{}'",
                service_name, PLACEHOLDER_IMAGE
            ));
        }
        if metadata.volumes.iter().any(|v| v.kind == MountType::Bind) {
            warnings.push(format!(
                "Service '{}' uses bind mounts, which are replaced by emptyDir volumes",
                service_name
            ));
        }

        manifests.deployments.push(create_deployment(
            &app, service, &metadata, namespace, options,
        ));

        if !metadata.ports.is_empty() {
            manifests
                .services
                .push(create_service(&app, &metadata, namespace));
        }

        if !metadata.environment_variables.is_empty() {
            manifests
                .config_maps
                .push(create_config_map(&app, &metadata, namespace));
        }

        manifests
            .persistent_volume_claims
            .extend(create_claims(&app, &metadata, namespace));
    }

    let yaml = render_files(&manifests)?;

    Ok(KubernetesConversion {
        manifests,
        yaml,
        warnings,
    })
}

fn app_labels(app: &str) -> Labels {
    Labels::from([
        ("app".to_string(), app.to_string()),
        ("app.kubernetes.io/name".to_string(), app.to_string()),
        ("app.kubernetes.io/component".to_string(), "service".to_string()),
    ])
}

fn resource_labels(app: &str) -> Labels {
    Labels::from([
        ("app".to_string(), app.to_string()),
        ("app.kubernetes.io/name".to_string(), app.to_string()),
    ])
}

fn selector(app: &str) -> Labels {
    Labels::from([("app".to_string(), app.to_string())])
}

fn object_meta(name: String, namespace: &str, labels: Labels) -> ObjectMeta {
    ObjectMeta {
        name,
        namespace: Some(namespace.to_string()),
        labels,
        annotations: BTreeMap::new(),
    }
}

fn config_map_name(app: &str) -> String {
    format!("{}-config", app)
}

fn container_command(command: &StringOrList) -> Vec<String> {
    match command {
        StringOrList::List(args) => args.clone(),
        StringOrList::String(line) => vec!["/bin/sh".to_string(), "-c".to_string(), line.clone()],
    }
}

pub fn create_deployment(
    app: &str,
    service: &ComposeService,
    metadata: &ServiceMetadata,
    namespace: &str,
    options: &ConversionOptions,
) -> Deployment {
    let (volume_mounts, volumes) = wire_volumes(app, metadata);

    let mut container = Container {
        name: app.to_string(),
        image: service
            .image
            .clone()
            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
        command: service
            .command
            .as_ref()
            .map(container_command)
            .unwrap_or_default(),
        working_dir: service.working_dir.clone(),
        ports: metadata
            .ports
            .iter()
            .map(|p| ContainerPort {
                container_port: p.container_port,
                name: None,
                protocol: Some(p.protocol.kubernetes_name().to_string()),
            })
            .collect(),
        env: metadata
            .environment_variables
            .keys()
            .map(|key| EnvVar {
                name: key.clone(),
                value: None,
                value_from: Some(EnvVarSource {
                    config_map_key_ref: Some(KeySelector {
                        name: config_map_name(app),
                        key: key.clone(),
                    }),
                    secret_key_ref: None,
                }),
            })
            .collect(),
        volume_mounts,
        ..Default::default()
    };

    if options.add_resource_limits {
        container.resources = Some(hardening::profile_resources(options.projector_profile()));
    }

    if options.add_health_checks {
        let port = metadata
            .first_container_port()
            .unwrap_or(DEFAULT_CONTAINER_PORT);
        let (liveness, readiness) = hardening::http_probes(port, &HealthCheckOptions::default());
        container.liveness_probe = Some(liveness);
        container.readiness_probe = Some(readiness);
    }

    let security = SecurityOptions::default();
    if options.add_security {
        container.security_context = Some(hardening::container_security_context(&security));
    }

    let labels = app_labels(app);
    Deployment::new(
        object_meta(app.to_string(), namespace, labels.clone()),
        DeploymentSpec {
            replicas: Some(metadata.replicas.unwrap_or(DEFAULT_REPLICAS)),
            selector: LabelSelector {
                match_labels: selector(app),
            },
            template: PodTemplateSpec {
                metadata: PodTemplateMeta {
                    labels,
                    annotations: BTreeMap::new(),
                },
                spec: PodSpec {
                    containers: vec![container],
                    volumes,
                    security_context: options
                        .add_security
                        .then(|| hardening::pod_security_context(&security)),
                },
            },
        },
    )
}

/// Container mounts and pod volumes. Named volumes reference a claim with the
/// same name the PVC gets; bind mounts become emptyDir volumes.
fn wire_volumes(app: &str, metadata: &ServiceMetadata) -> (Vec<VolumeMount>, Vec<Volume>) {
    let mut mounts = Vec::new();
    let mut volumes = Vec::new();
    let mut declared = BTreeSet::new();
    let mut bind_index = 0;

    for mount in &metadata.volumes {
        let name = match mount.kind {
            MountType::Volume => kube_name(&mount.source),
            MountType::Bind => {
                let name = format!("host-volume-{}", bind_index);
                bind_index += 1;
                name
            }
        };

        mounts.push(VolumeMount {
            name: name.clone(),
            mount_path: mount.target.clone(),
            read_only: mount.read_only,
        });

        if !declared.insert(name.clone()) {
            continue;
        }
        volumes.push(match mount.kind {
            MountType::Volume => Volume {
                name,
                persistent_volume_claim: Some(PersistentVolumeClaimSource {
                    claim_name: claim_name(app, &mount.source),
                }),
                empty_dir: None,
            },
            MountType::Bind => Volume {
                name,
                persistent_volume_claim: None,
                empty_dir: Some(EmptyDirSource {}),
            },
        });
    }

    (mounts, volumes)
}

pub fn create_service(app: &str, metadata: &ServiceMetadata, namespace: &str) -> Service {
    Service::new(
        object_meta(app.to_string(), namespace, resource_labels(app)),
        ServiceSpec {
            service_type: "ClusterIP".to_string(),
            selector: selector(app),
            ports: metadata
                .ports
                .iter()
                .enumerate()
                .map(|(index, p)| ServicePort {
                    name: format!("port-{}", index),
                    protocol: p.protocol.kubernetes_name().to_string(),
                    port: p.host_port,
                    target_port: IntOrString::Int(p.container_port),
                })
                .collect(),
        },
    )
}

pub fn create_config_map(app: &str, metadata: &ServiceMetadata, namespace: &str) -> ConfigMap {
    ConfigMap::new(
        object_meta(config_map_name(app), namespace, resource_labels(app)),
        metadata.environment_variables.clone(),
    )
}

pub fn create_claims(
    app: &str,
    metadata: &ServiceMetadata,
    namespace: &str,
) -> Vec<PersistentVolumeClaim> {
    let mut seen = BTreeSet::new();
    metadata
        .volumes
        .iter()
        .filter(|mount| mount.is_named())
        .map(|mount| claim_name(app, &mount.source))
        .filter(|name| seen.insert(name.clone()))
        .map(|name| {
            PersistentVolumeClaim::new(
                object_meta(name, namespace, resource_labels(app)),
                PersistentVolumeClaimSpec {
                    access_modes: vec!["ReadWriteOnce".to_string()],
                    resources: VolumeResourceRequirements {
                        requests: BTreeMap::from([(
                            "storage".to_string(),
                            DEFAULT_STORAGE.to_string(),
                        )]),
                    },
                    storage_class_name: None,
                },
            )
        })
        .collect()
}

fn to_yaml<T: Serialize>(file: &str, object: &T) -> Result<String, ConversionError> {
    serde_yaml::to_string(object).map_err(|e| ConversionError::serialization(file, e))
}

fn insert_file<T: Serialize>(
    files: &mut BTreeMap<String, String>,
    file: String,
    object: &T,
) -> Result<(), ConversionError> {
    if files.contains_key(&file) {
        return Err(ConversionError::InvalidInput(format!(
            "two resources render to the same file '{}'",
            file
        )));
    }
    let yaml = to_yaml(&file, object)?;
    files.insert(file, yaml);
    Ok(())
}

fn render_files(manifests: &KubernetesManifests) -> Result<BTreeMap<String, String>, ConversionError> {
    let mut files = BTreeMap::new();
    for deployment in &manifests.deployments {
        let file = format!("deployment-{}.yaml", deployment.metadata.name);
        insert_file(&mut files, file, deployment)?;
    }
    for service in &manifests.services {
        let file = format!("service-{}.yaml", service.metadata.name);
        insert_file(&mut files, file, service)?;
    }
    for config_map in &manifests.config_maps {
        let file = format!("configmap-{}.yaml", config_map.metadata.name);
        insert_file(&mut files, file, config_map)?;
    }
    for claim in &manifests.persistent_volume_claims {
        let file = format!("pvc-{}.yaml", claim.metadata.name);
        insert_file(&mut files, file, claim)?;
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::parse_compose;
    use crate::converter::options::ResourceProfile;

    fn convert_yaml(yaml: &str, options: &ConversionOptions) -> KubernetesConversion {
        let parsed = parse_compose(yaml).unwrap();
        convert(&parsed.document, options).unwrap()
    }

    #[test]
    fn test_default_replicas_is_three() {
        let result = convert_yaml("services:\n  web:\n    image: nginx\n", &ConversionOptions::default());
        assert_eq!(result.manifests.deployments[0].spec.replicas, Some(3));
        assert!(result.yaml["deployment-web.yaml"].contains("replicas: 3"));
    }

    #[test]
    fn test_explicit_replicas_kept() {
        let result = convert_yaml(
            "services:\n  web:\n    image: nginx\n    deploy:\n      replicas: 0\n",
            &ConversionOptions::default(),
        );
        assert_eq!(result.manifests.deployments[0].spec.replicas, Some(0));
    }

    #[test]
    fn test_names_are_consistent() {
        let result = convert_yaml(
            "services:\n  My_API:\n    image: api:1\n    ports: [\"8080:80\"]\n    environment:\n      - A=1\n",
            &ConversionOptions::default(),
        );
        let deployment = &result.manifests.deployments[0];
        assert_eq!(deployment.metadata.name, "my-api");
        assert_eq!(deployment.containers()[0].name, "my-api");
        assert_eq!(deployment.spec.selector.match_labels["app"], "my-api");
        assert_eq!(result.manifests.services[0].metadata.name, "my-api");
        assert_eq!(result.manifests.services[0].spec.selector["app"], "my-api");
        assert_eq!(result.manifests.config_maps[0].metadata.name, "my-api-config");
        assert!(result.yaml.contains_key("configmap-my-api-config.yaml"));

        let env = &deployment.containers()[0].env[0];
        let reference = env.value_from.as_ref().unwrap().config_map_key_ref.as_ref().unwrap();
        assert_eq!(reference.name, "my-api-config");
        assert_eq!(reference.key, "A");
    }

    #[test]
    fn test_colliding_names_get_suffix() {
        let result = convert_yaml(
            "services:\n  web_app:\n    image: a:1\n    ports: [\"80\"]\n    environment: [A=1]\n  web-app:\n    image: b:1\n    ports: [\"81\"]\n    environment: [B=2]\n",
            &ConversionOptions::default(),
        );
        assert_eq!(result.manifests.deployments.len(), 2);
        let files: Vec<&str> = result.yaml.keys().map(String::as_str).collect();
        for file in [
            "deployment-web-app.yaml",
            "deployment-web-app-2.yaml",
            "service-web-app.yaml",
            "service-web-app-2.yaml",
            "configmap-web-app-config.yaml",
            "configmap-web-app-2-config.yaml",
        ] {
            assert!(files.contains(&file), "missing {} in {:?}", file, files);
        }

        // `web-app` sorts before `web_app`, so the second one is renamed
        let renamed = &result.manifests.deployments[1];
        assert_eq!(renamed.metadata.name, "web-app-2");
        assert_eq!(renamed.spec.selector.match_labels["app"], "web-app-2");
        assert_eq!(renamed.containers()[0].image, "a:1");
        assert_eq!(result.manifests.services[1].spec.selector["app"], "web-app-2");
        assert!(result.warnings.iter().any(|w| w.contains("using 'web-app-2'")));

        let validation = crate::validator::validate_kubernetes_manifests(&result.to_multi_document());
        assert!(validation.valid, "{:?}", validation.errors);
    }

    #[test]
    fn test_long_names_fit_label_values() {
        let name = "x".repeat(70);
        let result = convert_yaml(
            &format!("services:\n  {}:\n    image: nginx:1.25\n    ports: [\"80\"]\n", name),
            &ConversionOptions::default(),
        );
        let deployment = &result.manifests.deployments[0];
        assert_eq!(deployment.metadata.name.len(), 63);
        let validation = crate::validator::validate_kubernetes_manifests(&result.to_multi_document());
        assert!(validation.valid, "{:?}", validation.errors);
    }

    #[test]
    fn test_colliding_claims_are_rejected() {
        let parsed = parse_compose(
            "services:\n  web:\n    image: a:1\n    volumes: [\"a-b:/data\"]\n  web-a:\n    image: b:1\n    volumes: [\"b:/data\"]\nvolumes:\n  a-b: {}\n  b: {}\n",
        )
        .unwrap();
        let err = convert(&parsed.document, &ConversionOptions::default()).unwrap_err();
        assert!(err.to_string().contains("pvc-web-a-b.yaml"), "{}", err);
    }

    #[test]
    fn test_service_ports_map_host_to_container() {
        let result = convert_yaml(
            "services:\n  dns:\n    image: dns:1\n    ports: [\"5353:53/udp\", \"8080:80\"]\n",
            &ConversionOptions::default(),
        );
        let ports = &result.manifests.services[0].spec.ports;
        assert_eq!(ports[0].name, "port-0");
        assert_eq!(ports[0].protocol, "UDP");
        assert_eq!(ports[0].port, 5353);
        assert_eq!(ports[0].target_port, IntOrString::Int(53));
        assert_eq!(ports[1].port, 8080);
    }

    #[test]
    fn test_bind_mounts_never_produce_claims() {
        let result = convert_yaml(
            "services:\n  app:\n    image: app:1\n    volumes:\n      - ./data:/app/data\n      - cache:/app/cache:ro\n",
            &ConversionOptions::default(),
        );
        let claims = &result.manifests.persistent_volume_claims;
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].metadata.name, "app-cache");

        let pod = &result.manifests.deployments[0].spec.template.spec;
        let cache = pod.volumes.iter().find(|v| v.name == "cache").unwrap();
        assert_eq!(
            cache.persistent_volume_claim.as_ref().unwrap().claim_name,
            "app-cache"
        );
        let mounts = &pod.containers[0].volume_mounts;
        assert!(mounts.iter().any(|m| m.name == "cache" && m.read_only));
        // every mount has a matching pod volume
        for mount in mounts {
            assert!(pod.volumes.iter().any(|v| v.name == mount.name));
        }
        assert!(result.warnings.iter().any(|w| w.contains("bind mounts")));
    }

    #[test]
    fn test_toggles_off() {
        let options = ConversionOptions {
            add_health_checks: false,
            add_resource_limits: false,
            add_security: false,
            ..Default::default()
        };
        let result = convert_yaml("services:\n  web:\n    image: nginx\n", &options);
        let deployment = &result.manifests.deployments[0];
        let container = &deployment.containers()[0];
        assert!(container.resources.is_none());
        assert!(container.liveness_probe.is_none());
        assert!(container.security_context.is_none());
        assert!(deployment.spec.template.spec.security_context.is_none());
    }

    #[test]
    fn test_profile_and_probe_defaults() {
        let options = ConversionOptions {
            resource_profile: Some(ResourceProfile::Large),
            ..Default::default()
        };
        let result = convert_yaml("services:\n  worker:\n    image: w:1\n", &options);
        let container = &result.manifests.deployments[0].containers()[0];
        let limits = container.resources.as_ref().unwrap().limits.as_ref().unwrap();
        assert_eq!(limits.cpu.as_deref(), Some("2000m"));
        let http = container.liveness_probe.as_ref().unwrap().http_get.as_ref().unwrap();
        assert_eq!(http.port, IntOrString::Int(DEFAULT_CONTAINER_PORT));
    }

    #[test]
    fn test_string_command_runs_through_shell() {
        let result = convert_yaml(
            "services:\n  job:\n    image: busybox:1\n    command: echo hi\n    working_dir: /work\n",
            &ConversionOptions::default(),
        );
        let container = &result.manifests.deployments[0].containers()[0];
        assert_eq!(container.command, vec!["/bin/sh", "-c", "echo hi"]);
        assert_eq!(container.working_dir.as_deref(), Some("/work"));
    }

    #[test]
    fn test_build_only_service_uses_placeholder() {
        let result = convert_yaml("services:\n  app:\n    build: .\n", &ConversionOptions::default());
        assert_eq!(result.manifests.deployments[0].containers()[0].image, PLACEHOLDER_IMAGE);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_namespace_applied() {
        let options = ConversionOptions {
            namespace: Some("prod".to_string()),
            ..Default::default()
        };
        let result = convert_yaml("services:\n  web:\n    image: nginx\n", &options);
        assert_eq!(
            result.manifests.deployments[0].metadata.namespace.as_deref(),
            Some("prod")
        );
    }
}
