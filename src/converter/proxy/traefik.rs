//! Traefik v2 configuration for Docker and Kubernetes.

use super::ProxyRoute;
use crate::compose::{ComposeDocument, Service, StringOrList};
use crate::converter::naming::kube_name;
use crate::error::ConversionError;
use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

pub const TRAEFIK_IMAGE: &str = "traefik:v2.10";
pub const CERT_RESOLVER: &str = "letsencrypt";
pub const ACME_STORAGE: &str = "/letsencrypt/acme.json";
const INGRESS_ROUTE_API: &str = "traefik.containo.us/v1alpha1";

/// Settings shared by the Traefik generators.
#[derive(Debug, Clone, PartialEq)]
pub struct TraefikOptions {
    /// ACME account email; enables TLS when set
    pub email: Option<String>,
    pub dashboard: bool,
    /// Service name → host name
    pub domains: BTreeMap<String, String>,
}

impl Default for TraefikOptions {
    fn default() -> Self {
        Self {
            email: None,
            dashboard: true,
            domains: BTreeMap::new(),
        }
    }
}

impl TraefikOptions {
    pub fn tls_enabled(&self) -> bool {
        self.email.is_some()
    }
}

fn host_rule(domain: &str) -> String {
    format!("Host(`{}`)", domain)
}

/// Router, service and (with TLS) redirect labels for one compose service.
pub fn docker_labels(service: &str, domain: &str, port: u16, tls: bool) -> BTreeMap<String, String> {
    let router = kube_name(service);
    let mut labels = BTreeMap::new();
    labels.insert("traefik.enable".to_string(), "true".to_string());
    labels.insert(
        format!("traefik.http.routers.{}.rule", router),
        host_rule(domain),
    );
    labels.insert(
        format!("traefik.http.routers.{}.entrypoints", router),
        if tls { "websecure" } else { "web" }.to_string(),
    );
    labels.insert(
        format!("traefik.http.services.{}-service.loadbalancer.server.port", router),
        port.to_string(),
    );

    if tls {
        labels.insert(format!("traefik.http.routers.{}.tls", router), "true".to_string());
        labels.insert(
            format!("traefik.http.routers.{}.tls.certresolver", router),
            CERT_RESOLVER.to_string(),
        );
        labels.insert(
            format!("traefik.http.routers.{}-http.rule", router),
            host_rule(domain),
        );
        labels.insert(
            format!("traefik.http.routers.{}-http.entrypoints", router),
            "web".to_string(),
        );
        labels.insert(
            format!("traefik.http.routers.{}-http.middlewares", router),
            format!("{}-https-redirect", router),
        );
        labels.insert(
            format!("traefik.http.middlewares.{}-https-redirect.redirectscheme.scheme", router),
            "https".to_string(),
        );
        labels.insert(
            format!("traefik.http.middlewares.{}-https-redirect.redirectscheme.permanent", router),
            "true".to_string(),
        );
    }
    labels
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngressRoute {
    api_version: &'static str,
    kind: &'static str,
    metadata: IngressRouteMeta,
    spec: IngressRouteSpec,
}

#[derive(Debug, Serialize)]
struct IngressRouteMeta {
    name: String,
    namespace: String,
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IngressRouteSpec {
    entry_points: Vec<String>,
    routes: Vec<RouteRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tls: Option<RouteTls>,
}

#[derive(Debug, Serialize)]
struct RouteRule {
    #[serde(rename = "match")]
    matcher: String,
    kind: &'static str,
    services: Vec<RouteService>,
}

#[derive(Debug, Serialize)]
struct RouteService {
    name: String,
    port: u16,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteTls {
    cert_resolver: String,
}

/// An `IngressRoute` CRD routing `domain` to the service's Kubernetes Service.
pub fn kubernetes_ingress_route(
    service: &str,
    domain: &str,
    port: u16,
    namespace: &str,
    tls: bool,
) -> Result<String, ConversionError> {
    let app = kube_name(service);
    let route = IngressRoute {
        api_version: INGRESS_ROUTE_API,
        kind: "IngressRoute",
        metadata: IngressRouteMeta {
            name: format!("{}-ingressroute", app),
            namespace: namespace.to_string(),
            labels: BTreeMap::from([("app".to_string(), app.clone())]),
        },
        spec: IngressRouteSpec {
            entry_points: vec![if tls { "websecure" } else { "web" }.to_string()],
            routes: vec![RouteRule {
                matcher: host_rule(domain),
                kind: "Rule",
                services: vec![RouteService { name: app.clone(), port }],
            }],
            tls: tls.then(|| RouteTls {
                cert_resolver: CERT_RESOLVER.to_string(),
            }),
        },
    };
    serde_yaml::to_string(&route)
        .map_err(|e| ConversionError::serialization(format!("IngressRoute {}", app), e))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StaticConfig {
    api: ApiConfig,
    entry_points: BTreeMap<String, EntryPoint>,
    certificates_resolvers: BTreeMap<String, CertResolver>,
    providers: Providers,
    log: LogConfig,
    access_log: Toggle,
}

#[derive(Debug, Serialize)]
struct ApiConfig {
    dashboard: bool,
    insecure: bool,
}

#[derive(Debug, Serialize)]
struct EntryPoint {
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    http: Option<EntryPointHttp>,
}

#[derive(Debug, Serialize)]
struct EntryPointHttp {
    redirections: Redirections,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Redirections {
    entry_point: RedirectTarget,
}

#[derive(Debug, Serialize)]
struct RedirectTarget {
    to: String,
    scheme: String,
    permanent: bool,
}

#[derive(Debug, Serialize)]
struct CertResolver {
    acme: Acme,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Acme {
    email: String,
    storage: String,
    http_challenge: HttpChallenge,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HttpChallenge {
    entry_point: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Providers {
    docker: DockerProvider,
    #[serde(rename = "kubernetesCRD")]
    kubernetes_crd: Toggle,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DockerProvider {
    exposed_by_default: bool,
}

#[derive(Debug, Serialize)]
struct Toggle {
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct LogConfig {
    level: String,
}

/// `traefik.yml`. With an email the `web` entry point redirects to HTTPS and
/// a Let's Encrypt resolver is configured.
pub fn static_config(options: &TraefikOptions) -> Result<String, ConversionError> {
    let mut web = EntryPoint {
        address: ":80".to_string(),
        http: None,
    };
    let mut resolvers = BTreeMap::new();

    if let Some(email) = &options.email {
        web.http = Some(EntryPointHttp {
            redirections: Redirections {
                entry_point: RedirectTarget {
                    to: "websecure".to_string(),
                    scheme: "https".to_string(),
                    permanent: true,
                },
            },
        });
        resolvers.insert(
            CERT_RESOLVER.to_string(),
            CertResolver {
                acme: Acme {
                    email: email.clone(),
                    storage: ACME_STORAGE.to_string(),
                    http_challenge: HttpChallenge {
                        entry_point: "web".to_string(),
                    },
                },
            },
        );
    }

    let config = StaticConfig {
        api: ApiConfig {
            dashboard: options.dashboard,
            insecure: false,
        },
        entry_points: BTreeMap::from([
            ("web".to_string(), web),
            (
                "websecure".to_string(),
                EntryPoint {
                    address: ":443".to_string(),
                    http: None,
                },
            ),
        ]),
        certificates_resolvers: resolvers,
        providers: Providers {
            docker: DockerProvider {
                exposed_by_default: false,
            },
            kubernetes_crd: Toggle { enabled: true },
        },
        log: LogConfig {
            level: "INFO".to_string(),
        },
        access_log: Toggle { enabled: true },
    };
    serde_yaml::to_string(&config).map_err(|e| ConversionError::serialization("traefik.yml", e))
}

#[derive(Debug, Serialize)]
struct DynamicConfig {
    http: DynamicHttp,
}

#[derive(Debug, Serialize)]
struct DynamicHttp {
    routers: BTreeMap<String, DynamicRouter>,
    services: BTreeMap<String, DynamicService>,
    middlewares: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DynamicRouter {
    rule: String,
    service: String,
    entry_points: Vec<String>,
    tls: RouteTls,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DynamicService {
    load_balancer: LoadBalancer,
}

#[derive(Debug, Serialize)]
struct LoadBalancer {
    servers: Vec<Server>,
}

#[derive(Debug, Serialize)]
struct Server {
    url: String,
}

/// File-provider routers and services, one pair per route.
pub fn dynamic_config(routes: &[ProxyRoute]) -> Result<String, ConversionError> {
    let mut http = DynamicHttp {
        routers: BTreeMap::new(),
        services: BTreeMap::new(),
        middlewares: BTreeMap::new(),
    };
    for route in routes {
        let router = kube_name(&route.service);
        http.routers.insert(
            router.clone(),
            DynamicRouter {
                rule: host_rule(&route.domain),
                service: router.clone(),
                entry_points: vec!["websecure".to_string()],
                tls: RouteTls {
                    cert_resolver: CERT_RESOLVER.to_string(),
                },
            },
        );
        http.services.insert(
            router,
            DynamicService {
                load_balancer: LoadBalancer {
                    servers: vec![Server {
                        url: format!("http://{}:{}", route.service, route.port),
                    }],
                },
            },
        );
    }
    serde_yaml::to_string(&DynamicConfig { http })
        .map_err(|e| ConversionError::serialization("dynamic.yml", e))
}

fn traefik_service(options: &TraefikOptions) -> Service {
    let mut command = vec![
        format!("--api.dashboard={}", options.dashboard),
        "--providers.docker=true".to_string(),
        "--providers.docker.exposedbydefault=false".to_string(),
        "--entrypoints.web.address=:80".to_string(),
        "--entrypoints.websecure.address=:443".to_string(),
    ];
    if let Some(email) = &options.email {
        command.extend([
            "--certificatesresolvers.letsencrypt.acme.httpchallenge=true".to_string(),
            "--certificatesresolvers.letsencrypt.acme.httpchallenge.entrypoint=web".to_string(),
            format!("--certificatesresolvers.letsencrypt.acme.email={}", email),
            format!("--certificatesresolvers.letsencrypt.acme.storage={}", ACME_STORAGE),
            "--entrypoints.web.http.redirections.entrypoint.to=websecure".to_string(),
            "--entrypoints.web.http.redirections.entrypoint.scheme=https".to_string(),
            "--entrypoints.web.http.redirections.entrypoint.permanent=true".to_string(),
        ]);
    }

    Service {
        image: Some(TRAEFIK_IMAGE.to_string()),
        container_name: Some("traefik".to_string()),
        restart: Some("unless-stopped".to_string()),
        command: Some(StringOrList::List(command)),
        ports: vec![
            "80:80".to_string(),
            "443:443".to_string(),
            "8080:8080".to_string(),
        ],
        volumes: vec![
            "/var/run/docker.sock:/var/run/docker.sock:ro".to_string(),
            "./letsencrypt:/letsencrypt".to_string(),
        ],
        labels: BTreeMap::from([
            ("traefik.enable".to_string(), "true".to_string()),
            (
                "traefik.http.routers.dashboard.rule".to_string(),
                host_rule("traefik.localhost"),
            ),
            (
                "traefik.http.routers.dashboard.service".to_string(),
                "api@internal".to_string(),
            ),
            (
                "traefik.http.routers.dashboard.entrypoints".to_string(),
                "web".to_string(),
            ),
        ]),
        ..Service::default()
    }
}

/// Returns a copy of `document` with a `traefik` service added and routing
/// labels merged into every service that has a domain.
pub fn add_to_compose(document: &ComposeDocument, options: &TraefikOptions) -> ComposeDocument {
    let mut compose = document.clone();
    if compose.services.contains_key("traefik") {
        log::warn!("Replacing existing 'traefik' service with the generated proxy service");
    }
    compose
        .services
        .insert("traefik".to_string(), traefik_service(options));

    for (service_name, domain) in &options.domains {
        let Some(service) = compose.services.get_mut(service_name) else {
            log::debug!("Domain for unknown service '{}' ignored", service_name);
            continue;
        };
        let port = super::service_port(service);
        let labels = docker_labels(service_name, domain, port, options.tls_enabled());
        service.labels.extend(labels);
    }
    compose
}

/// `ingressroute-<service>.yaml` for every route. `names` maps compose
/// services to the Kubernetes names their Services were created under.
pub fn kubernetes_setup(
    routes: &[ProxyRoute],
    names: &BTreeMap<String, String>,
    namespace: &str,
    options: &TraefikOptions,
) -> Result<BTreeMap<String, String>, ConversionError> {
    routes
        .iter()
        .map(|route| {
            let app = names
                .get(&route.service)
                .cloned()
                .unwrap_or_else(|| kube_name(&route.service));
            let yaml = kubernetes_ingress_route(
                &app,
                &route.domain,
                route.port,
                namespace,
                options.tls_enabled(),
            )?;
            Ok((format!("ingressroute-{}.yaml", app), yaml))
        })
        .collect()
}

/// Result of [`validate_static_config`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraefikValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Checks a static configuration for entry points, providers and a complete
/// ACME resolver.
pub fn validate_static_config(text: &str) -> TraefikValidation {
    let mut errors = Vec::new();
    match serde_yaml::from_str::<Value>(text) {
        Ok(config) => {
            if config.get("entryPoints").is_none_or(Value::is_null) {
                errors.push("Missing entryPoints configuration".to_string());
            }
            if config.get("providers").is_none_or(Value::is_null) {
                errors.push("Missing providers configuration".to_string());
            }
            if let Some(resolver) = config
                .get("certificatesResolvers")
                .and_then(|r| r.get(CERT_RESOLVER))
            {
                let acme = resolver.get("acme");
                let missing = |field: &str| {
                    acme.and_then(|a| a.get(field))
                        .and_then(Value::as_str)
                        .is_none_or(str::is_empty)
                };
                if missing("email") {
                    errors.push("Let's Encrypt email is required".to_string());
                }
                if missing("storage") {
                    errors.push("ACME storage path is required".to_string());
                }
            }
        }
        Err(e) => errors.push(format!("YAML parsing error: {}", e)),
    }
    TraefikValidation {
        valid: errors.is_empty(),
        errors,
    }
}
