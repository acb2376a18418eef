use compose_bridge::compose::parse_compose;
use compose_bridge::converter::{
    ChartOptions, ConversionOptions, ProxyType, ResourceProfile, TargetPlatform, convert_all,
    generate_helm_chart, kubernetes, swarm,
};
use compose_bridge::validator::{ValidationIssue, ValidationResult, validate_kubernetes_manifests};
use serde_yaml::Value;

const TWO_SERVICES: &str = r#"
services:
  web:
    image: nginx
    ports: ["80:80"]
  db:
    image: postgres:15
    volumes: ["pgdata:/var/lib/postgresql/data"]
volumes:
  pgdata:
"#;

fn kubernetes_options(profile: ResourceProfile) -> ConversionOptions {
    ConversionOptions {
        target_platform: TargetPlatform::Kubernetes,
        proxy_type: ProxyType::None,
        add_health_checks: true,
        add_resource_limits: true,
        resource_profile: Some(profile),
        add_security: true,
        ..Default::default()
    }
}

fn doc(yaml: &str) -> Value {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn two_service_compose_projects_to_expected_kubernetes_set() {
    let parsed = parse_compose(TWO_SERVICES).unwrap();
    let result = kubernetes::convert(&parsed.document, &kubernetes_options(ResourceProfile::Small)).unwrap();

    assert_eq!(result.manifests.deployments.len(), 2);
    assert_eq!(result.manifests.services.len(), 1);
    assert_eq!(result.manifests.services[0].metadata.name, "web");
    assert!(result.manifests.config_maps.is_empty());
    assert_eq!(result.manifests.persistent_volume_claims.len(), 1);
    assert!(result.yaml.contains_key("pvc-db-pgdata.yaml"));

    let web = doc(&result.yaml["deployment-web.yaml"]);
    let container = &web["spec"]["template"]["spec"]["containers"][0];
    assert_eq!(container["livenessProbe"]["httpGet"]["port"], Value::from(80));
    assert_eq!(container["readinessProbe"]["httpGet"]["port"], Value::from(80));

    for name in ["deployment-web.yaml", "deployment-db.yaml"] {
        let deployment = doc(&result.yaml[name]);
        let containers = deployment["spec"]["template"]["spec"]["containers"].as_sequence().unwrap();
        for container in containers {
            assert_eq!(container["securityContext"]["runAsNonRoot"], Value::Bool(true), "{}", name);
        }
    }
}

#[test]
fn replica_defaults_differ_between_kubernetes_and_helm() {
    let parsed = parse_compose("services:\n  web:\n    image: nginx\n").unwrap();

    let k8s = kubernetes::convert(&parsed.document, &ConversionOptions::default()).unwrap();
    assert!(k8s.yaml["deployment-web.yaml"].contains("replicas: 3"));

    let chart = generate_helm_chart("web", &parsed.document, &ChartOptions::default()).unwrap();
    assert!(chart.values_yaml.contains("replicaCount: 1"));
}

#[test]
fn bind_mounts_never_become_claims() {
    let parsed = parse_compose(
        "services:\n  app:\n    image: busybox\n    volumes: [\"./data:/app/data\", \"cache:/app/cache\"]\n",
    )
    .unwrap();
    let result = kubernetes::convert(&parsed.document, &ConversionOptions::default()).unwrap();

    let claims = &result.manifests.persistent_volume_claims;
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].metadata.name, "app-cache");
    assert!(result.warnings.iter().any(|w| w.contains("bind mounts")));
}

#[test]
fn swarm_reports_build_once_and_drops_it() {
    let parsed = parse_compose(
        "version: '3.8'\nservices:\n  api:\n    build: ./api\n    image: shop/api:1.0\n  web:\n    image: nginx\n",
    )
    .unwrap();
    let result = swarm::convert(&parsed.document, &ConversionOptions::default()).unwrap();

    let build_warnings: Vec<&String> = result
        .warnings
        .iter()
        .filter(|w| w.contains("not supported"))
        .collect();
    assert_eq!(build_warnings.len(), 1);
    assert!(build_warnings[0].contains("api"));

    let stack = doc(&result.yaml);
    assert!(stack["services"]["api"].get("build").is_none());
    assert_eq!(stack["services"]["api"]["image"], Value::from("shop/api:1.0"));
}

#[test]
fn generated_kubernetes_output_validates_without_errors() {
    let text = std::fs::read_to_string("tests/fixtures/compose/shop.yml").unwrap();
    let parsed = parse_compose(&text).unwrap();
    let result = kubernetes::convert(&parsed.document, &kubernetes_options(ResourceProfile::Medium)).unwrap();

    let report = validate_kubernetes_manifests(&result.to_multi_document());
    assert!(report.valid, "{:#?}", report.errors);
    assert_eq!(report.summary.total_resources, report.summary.valid_resources);
    assert!(report.score > 0);
}

#[test]
fn conversion_and_validation_are_deterministic() {
    let text = std::fs::read_to_string("tests/fixtures/compose/shop.yml").unwrap();
    let first = parse_compose(&text).unwrap();
    let second = parse_compose(&text).unwrap();
    assert_eq!(first, second);

    let options = ConversionOptions::default();
    let a = convert_all("shop", &first.document, &options, true);
    let b = convert_all("shop", &second.document, &options, true);
    assert_eq!(a.files(), b.files());

    let k8s = a.kubernetes.as_ref().unwrap().to_multi_document();
    assert_eq!(validate_kubernetes_manifests(&k8s), validate_kubernetes_manifests(&k8s));
}

#[test]
fn score_drops_by_fixed_penalties() {
    let base = ValidationResult::from_issues(1, 1, Vec::new());
    assert_eq!(base.score, 100);

    let one_error = ValidationResult::from_issues(
        1,
        0,
        vec![ValidationIssue::error("web", "Deployment", "broken")],
    );
    assert_eq!(base.score - one_error.score, 15);

    let one_warning = ValidationResult::from_issues(
        1,
        1,
        vec![ValidationIssue::warning("web", "Deployment", "risky")],
    );
    assert_eq!(base.score - one_warning.score, 5);

    let floored = ValidationResult::from_issues(
        1,
        0,
        (0..10)
            .map(|i| ValidationIssue::error("web", "Deployment", format!("broken {}", i)))
            .collect(),
    );
    assert_eq!(floored.score, 0);
}

#[test]
fn bundle_layout_covers_every_target() {
    let parsed = parse_compose(TWO_SERVICES).unwrap();
    let options = ConversionOptions {
        lets_encrypt_email: Some("ops@example.com".to_string()),
        ..Default::default()
    };
    let bundle = convert_all("Two Tier", &parsed.document, &options, false);
    assert!(bundle.is_success(), "{:?}", bundle.errors);

    let paths: Vec<String> = bundle
        .files()
        .keys()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect();
    for expected in [
        "kubernetes/deployments/deployment-web.yaml",
        "kubernetes/deployments/deployment-db.yaml",
        "kubernetes/services/service-web.yaml",
        "kubernetes/pvcs/pvc-db-pgdata.yaml",
        "kubernetes/ingress/ingressroute-web.yaml",
        "swarm/docker-stack.yml",
        "proxy/traefik.yml",
        "helm/two-tier/Chart.yaml",
        "helm/two-tier/values.yaml",
        "helm/two-tier/templates/_helpers.tpl",
        "helm/two-tier/templates/web-deployment.yaml",
        "helm/two-tier/templates/web-service.yaml",
    ] {
        assert!(paths.iter().any(|p| p == expected), "missing {} in {:?}", expected, paths);
    }
    assert!(!paths.iter().any(|p| p == "helm/two-tier/templates/db-service.yaml"));
}

#[test]
fn awkward_service_names_keep_every_artifact() {
    let parsed = parse_compose(
        r#"
services:
  global:
    image: nginx:1.25
  web-app:
    image: acme/web:1
    ports: ["8080:80"]
  web_app:
    image: acme/admin:1
    ports: ["8081:80"]
"#,
    )
    .unwrap();
    let bundle = convert_all("Shop", &parsed.document, &ConversionOptions::default(), false);
    assert!(bundle.is_success(), "{:?}", bundle.errors);

    let k8s = bundle.kubernetes.as_ref().unwrap();
    assert_eq!(k8s.manifests.deployments.len(), 3);
    assert!(k8s.yaml.contains_key("deployment-web-app.yaml"));
    assert!(k8s.yaml.contains_key("deployment-web-app-2.yaml"));
    let result = validate_kubernetes_manifests(&k8s.to_multi_document());
    assert!(result.valid, "{:?}", result.errors);

    let routes = &bundle.proxy.as_ref().unwrap().ingress_routes;
    assert!(routes.contains_key("ingressroute-web-app.yaml"));
    assert!(routes.contains_key("ingressroute-web-app-2.yaml"));

    let chart = bundle.helm.as_ref().unwrap();
    let helm = compose_bridge::converter::validate_helm_chart(chart);
    assert!(helm.valid, "{:?}", helm.errors);
    let values = doc(&chart.values_yaml);
    for key in ["global2", "webapp", "webapp2"] {
        assert!(values.get(key).is_some(), "missing values key {}", key);
    }
    assert!(chart.templates.contains_key("web-app-2-deployment.yaml"));
}
