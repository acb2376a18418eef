//! Cross-resource references from Deployments to ConfigMaps, Secrets and PVCs.

use super::rules::lookup;
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};

/// A named resource another resource depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    /// `ConfigMap`, `Secret` or `PersistentVolumeClaim`
    pub kind: &'static str,
    pub name: String,
    /// e.g. `web (Deployment)`
    pub referenced_by: String,
    pub field: String,
}

fn str_at<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    lookup(value, path).and_then(Value::as_str)
}

fn items<'a>(value: &'a Value, path: &str) -> impl Iterator<Item = (usize, &'a Value)> {
    lookup(value, path)
        .and_then(Value::as_sequence)
        .into_iter()
        .flatten()
        .enumerate()
}

/// References made by one manifest. Only Deployments are inspected.
pub fn extract_references(manifest: &Value) -> Vec<ResourceReference> {
    if manifest.get("kind").and_then(Value::as_str) != Some("Deployment") {
        return Vec::new();
    }
    let owner = format!(
        "{} (Deployment)",
        str_at(manifest, "metadata.name").unwrap_or("unknown")
    );
    let mut refs = Vec::new();
    let mut push = |kind: &'static str, name: Option<&str>, field: String| {
        if let Some(name) = name {
            refs.push(ResourceReference {
                kind,
                name: name.to_string(),
                referenced_by: owner.clone(),
                field,
            });
        }
    };

    for (idx, container) in items(manifest, "spec.template.spec.containers") {
        for (env_idx, env) in items(container, "env") {
            let field = format!("spec.template.spec.containers[{}].env[{}]", idx, env_idx);
            push(
                "ConfigMap",
                str_at(env, "valueFrom.configMapKeyRef.name"),
                field.clone(),
            );
            push("Secret", str_at(env, "valueFrom.secretKeyRef.name"), field);
        }
        for (from_idx, env_from) in items(container, "envFrom") {
            let field = format!(
                "spec.template.spec.containers[{}].envFrom[{}]",
                idx, from_idx
            );
            push("ConfigMap", str_at(env_from, "configMapRef.name"), field.clone());
            push("Secret", str_at(env_from, "secretRef.name"), field);
        }
    }

    for (idx, volume) in items(manifest, "spec.template.spec.volumes") {
        let field = format!("spec.template.spec.volumes[{}]", idx);
        push("ConfigMap", str_at(volume, "configMap.name"), field.clone());
        push("Secret", str_at(volume, "secret.secretName"), field.clone());
        push(
            "PersistentVolumeClaim",
            str_at(volume, "persistentVolumeClaim.claimName"),
            field,
        );
    }
    refs
}

/// Index of `(kind, name)` pairs defined in a document set.
#[derive(Debug, Default)]
pub struct ResourceIndex {
    by_kind: BTreeMap<String, BTreeSet<String>>,
}

impl ResourceIndex {
    pub fn build<'a>(manifests: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut index = Self::default();
        for manifest in manifests {
            let kind = manifest.get("kind").and_then(Value::as_str);
            let name = str_at(manifest, "metadata.name");
            if let (Some(kind), Some(name)) = (kind, name) {
                index
                    .by_kind
                    .entry(kind.to_string())
                    .or_default()
                    .insert(name.to_string());
            }
        }
        index
    }

    pub fn contains(&self, kind: &str, name: &str) -> bool {
        self.by_kind.get(kind).is_some_and(|names| names.contains(name))
    }
}
