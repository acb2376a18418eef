//! Reverse proxy configuration.
//!
//! Only Traefik has a generator. Nginx and Caddy are accepted as options but
//! must be configured by hand.

pub mod traefik;

use super::naming::kube_names;
use super::options::{ConversionOptions, ProxyType};
use crate::compose::{ComposeDocument, Service, parse_port};
use crate::error::ConversionError;
use std::collections::BTreeMap;
use traefik::TraefikOptions;

/// Port routed to when a service publishes nothing.
pub const DEFAULT_ROUTE_PORT: u16 = 80;

/// A public host routed to one service port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRoute {
    pub service: String,
    pub domain: String,
    pub port: u16,
}

/// Container port of the first published port, else [`DEFAULT_ROUTE_PORT`].
pub fn service_port(service: &Service) -> u16 {
    service
        .ports
        .first()
        .and_then(|spec| parse_port(spec))
        .map(|p| p.container_port)
        .unwrap_or(DEFAULT_ROUTE_PORT)
}

/// Routes for a document: explicit custom domains first, then
/// `<service>.localhost` for every other service that publishes a port.
pub fn routes(document: &ComposeDocument, options: &ConversionOptions) -> Vec<ProxyRoute> {
    document
        .services
        .iter()
        .filter_map(|(name, service)| {
            let domain = match options.custom_domains.get(name) {
                Some(domain) => domain.clone(),
                None if !service.ports.is_empty() => format!("{}.localhost", name),
                None => return None,
            };
            Some(ProxyRoute {
                service: name.clone(),
                domain,
                port: service_port(service),
            })
        })
        .collect()
}

/// Generated proxy files.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyArtifacts {
    pub proxy: ProxyType,
    /// File name → contents, written under `proxy/`
    pub files: BTreeMap<String, String>,
    /// File name → IngressRoute YAML, written next to the Kubernetes manifests
    pub ingress_routes: BTreeMap<String, String>,
}

/// Builds proxy files for `options.proxy_type`. Returns `None` when no
/// generator exists for the selected proxy.
pub fn generate(
    document: &ComposeDocument,
    options: &ConversionOptions,
) -> Result<Option<ProxyArtifacts>, ConversionError> {
    if options.proxy_type != ProxyType::Traefik {
        return Ok(None);
    }

    let routes = routes(document, options);
    let traefik_options = TraefikOptions {
        email: options
            .tls_enabled()
            .then(|| options.lets_encrypt_email.clone())
            .flatten(),
        dashboard: true,
        domains: routes
            .iter()
            .map(|r| (r.service.clone(), r.domain.clone()))
            .collect(),
    };
    log::info!("Generating Traefik configuration for {} routes", routes.len());

    let mut files = BTreeMap::new();
    files.insert(
        "traefik.yml".to_string(),
        traefik::static_config(&traefik_options)?,
    );
    if !routes.is_empty() {
        files.insert("dynamic.yml".to_string(), traefik::dynamic_config(&routes)?);
    }
    let compose = traefik::add_to_compose(document, &traefik_options);
    files.insert(
        "docker-compose.traefik.yml".to_string(),
        serde_yaml::to_string(&compose)
            .map_err(|e| ConversionError::serialization("docker-compose.traefik.yml", e))?,
    );

    let ingress_routes = if options.target_platform.includes_kubernetes() {
        let names = kube_names(document.services.keys());
        traefik::kubernetes_setup(&routes, &names, options.namespace(), &traefik_options)?
    } else {
        BTreeMap::new()
    };

    Ok(Some(ProxyArtifacts {
        proxy: ProxyType::Traefik,
        files,
        ingress_routes,
    }))
}
