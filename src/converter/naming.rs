//! Name sanitizers.
//!
//! Kubernetes and Swarm names keep hyphens; Helm values keys must be plain
//! identifiers and keep only alphanumerics.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static NON_KUBE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("valid regex"));

const FALLBACK_NAME: &str = "service";
const VALUES_KEY_PREFIX: &str = "svc";

/// Longest name that is also a valid label value.
pub const MAX_NAME_LENGTH: usize = 63;

fn cap(name: &str, max: usize) -> &str {
    // `name` is ASCII here, so byte slicing is safe
    name[..name.len().min(max)].trim_end_matches('-')
}

/// Lowercases and replaces every character outside `[a-z0-9-]` with `-`.
/// Leading and trailing hyphens are trimmed so the result starts and ends
/// alphanumeric, and the result is capped at [`MAX_NAME_LENGTH`].
pub fn kube_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let replaced = NON_KUBE_CHARS.replace_all(&lowered, "-");
    let trimmed = cap(replaced.trim_matches('-'), MAX_NAME_LENGTH);
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Strips every non-alphanumeric character. Keys that would be empty fall
/// back to `service`; keys starting with a digit get an `svc` prefix.
pub fn values_key(name: &str) -> String {
    let key: String = name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    match key.chars().next() {
        None => FALLBACK_NAME.to_string(),
        Some(first) if first.is_ascii_digit() => format!("{}{}", VALUES_KEY_PREFIX, key),
        Some(_) => key,
    }
}

/// Returns `kube_name(name)`, or the first of `<name>-2`, `<name>-3`, ...
/// not in `taken`. The result is recorded in `taken`.
pub fn unique_kube_name(name: &str, taken: &mut BTreeSet<String>) -> String {
    let base = kube_name(name);
    let mut candidate = base.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        let suffix = format!("-{}", n);
        candidate = format!("{}{}", cap(&base, MAX_NAME_LENGTH - suffix.len()), suffix);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// Unique Kubernetes names for `services`, assigned in iteration order.
pub fn kube_names<'a>(services: impl IntoIterator<Item = &'a String>) -> BTreeMap<String, String> {
    let mut taken = BTreeSet::new();
    services
        .into_iter()
        .map(|service| (service.clone(), unique_kube_name(service, &mut taken)))
        .collect()
}

/// Returns `values_key(name)`, or the first of `<key>2`, `<key>3`, ... not in
/// `taken`. The result is recorded in `taken`.
pub fn unique_values_key(name: &str, taken: &mut BTreeSet<String>) -> String {
    let base = values_key(name);
    let mut candidate = base.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{}{}", base, n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// PVC name for a named volume mounted by `app`.
pub fn claim_name(app: &str, volume: &str) -> String {
    kube_name(&format!("{}-{}", app, volume))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kube_name() {
        assert_eq!(kube_name("Web_App.v2"), "web-app-v2");
        assert_eq!(kube_name("api"), "api");
        assert_eq!(kube_name("worker_"), "worker");
        assert_eq!(kube_name("__"), "service");
    }

    #[test]
    fn test_kube_name_is_capped() {
        let long = "a".repeat(70);
        assert_eq!(kube_name(&long).len(), MAX_NAME_LENGTH);

        let hyphen_at_cut = format!("{}_tail", "b".repeat(62));
        assert_eq!(kube_name(&hyphen_at_cut), "b".repeat(62));
    }

    #[test]
    fn test_values_key_drops_hyphens() {
        assert_eq!(values_key("my-web_app.1"), "mywebapp1");
    }

    #[test]
    fn test_values_key_is_an_identifier() {
        assert_eq!(values_key("_-_"), "service");
        assert_eq!(values_key("1st-api"), "svc1stapi");
    }

    #[test]
    fn test_unique_kube_name() {
        let mut taken = BTreeSet::new();
        assert_eq!(unique_kube_name("web_app", &mut taken), "web-app");
        assert_eq!(unique_kube_name("web-app", &mut taken), "web-app-2");
        assert_eq!(unique_kube_name("Web.App", &mut taken), "web-app-3");

        let long = "c".repeat(70);
        assert_eq!(unique_kube_name(&long, &mut taken).len(), MAX_NAME_LENGTH);
        let second = unique_kube_name(&long, &mut taken);
        assert_eq!(second.len(), MAX_NAME_LENGTH);
        assert!(second.ends_with("-2"));
    }

    #[test]
    fn test_kube_names_follow_order() {
        let services = ["web-app".to_string(), "web_app".to_string(), "db".to_string()];
        let names = kube_names(&services);
        assert_eq!(names["web-app"], "web-app");
        assert_eq!(names["web_app"], "web-app-2");
        assert_eq!(names["db"], "db");
    }

    #[test]
    fn test_unique_values_key() {
        let mut taken = BTreeSet::from(["global".to_string()]);
        assert_eq!(unique_values_key("global", &mut taken), "global2");
        assert_eq!(unique_values_key("web-app", &mut taken), "webapp");
        assert_eq!(unique_values_key("web_app", &mut taken), "webapp2");
    }

    #[test]
    fn test_claim_name() {
        assert_eq!(claim_name("db", "pg_data"), "db-pg-data");
    }
}
