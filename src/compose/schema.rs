//! Structural schema checks for compose documents.
//!
//! Walks the raw YAML value and collects every violation instead of stopping
//! at the first one, so a user sees the whole list at once.

use crate::error::SchemaViolation;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::LazyLock;

static SERVICE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("valid regex"));

const RESTART_VALUES: &[&str] = &["no", "always", "on-failure", "unless-stopped"];
const RESTART_CONDITIONS: &[&str] = &["none", "on-failure", "any"];

/// YAML type name used in violation messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "array",
        Value::Mapping(_) => "object",
        Value::Tagged(_) => "tagged value",
    }
}

/// Checks a whole compose document. The root is assumed to be a mapping.
pub fn validate_structure(root: &Mapping) -> Vec<SchemaViolation> {
    let mut checker = Checker::default();

    if let Some(version) = root.get("version") {
        if !matches!(version, Value::String(_) | Value::Number(_)) {
            checker.mismatch("version", "string", version);
        }
    }

    match root.get("services") {
        None => checker.push("services", "Required"),
        Some(Value::Mapping(services)) => {
            for (key, service) in services {
                checker.service_entry(key, service);
            }
        }
        Some(other) => checker.mismatch("services", "object", other),
    }

    for section in ["volumes", "networks"] {
        match root.get(section) {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(entries)) => {
                for (key, entry) in entries {
                    let path = format!("{}.{}", section, key_text(key));
                    checker.top_level_resource(&path, entry, section == "networks");
                }
            }
            Some(other) => checker.mismatch(section, "object", other),
        }
    }

    checker.violations
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => type_name(other).to_string(),
    }
}

#[derive(Default)]
struct Checker {
    violations: Vec<SchemaViolation>,
}

impl Checker {
    fn push(&mut self, path: &str, reason: impl Into<String>) {
        self.violations.push(SchemaViolation::new(path, reason));
    }

    fn mismatch(&mut self, path: &str, expected: &str, got: &Value) {
        self.push(
            path,
            format!("Expected {} but got {}", expected, type_name(got)),
        );
    }

    fn service_entry(&mut self, key: &Value, service: &Value) {
        let name = key_text(key);
        let path = format!("services.{}", name);

        if !matches!(key, Value::String(_)) || !SERVICE_NAME.is_match(&name) {
            self.push(
                &path,
                "Service name may only contain letters, digits, '.', '_' and '-'",
            );
        }

        let Value::Mapping(service) = service else {
            self.mismatch(&path, "object", service);
            return;
        };

        for field in ["image", "container_name", "working_dir", "stop_grace_period"] {
            self.optional_string(service, &path, field);
        }
        self.optional_scalar(service, &path, "user");

        if let Some(build) = service.get("build") {
            let build_path = format!("{}.build", path);
            match build {
                Value::String(_) => {}
                Value::Mapping(details) => {
                    self.optional_string(details, &build_path, "context");
                    self.optional_string(details, &build_path, "dockerfile");
                }
                _ => self.push(
                    &build_path,
                    "Invalid format. Please check the Docker Compose specification",
                ),
            }
        }

        for field in ["command", "entrypoint", "env_file", "tmpfs"] {
            self.string_or_list(service, &path, field);
        }
        for field in ["ports", "expose"] {
            self.scalar_list(service, &path, field);
        }
        for field in ["volumes", "links", "security_opt", "extra_hosts"] {
            self.string_list(service, &path, field);
        }

        if let Some(environment) = service.get("environment") {
            let env_path = format!("{}.environment", path);
            match environment {
                Value::Sequence(_) => self.string_list(service, &path, "environment"),
                Value::Mapping(vars) => {
                    for (key, value) in vars {
                        if matches!(value, Value::Sequence(_) | Value::Mapping(_)) {
                            self.mismatch(
                                &format!("{}.{}", env_path, key_text(key)),
                                "string, number or boolean",
                                value,
                            );
                        }
                    }
                }
                _ => self.push(
                    &env_path,
                    "Invalid format. Please check the Docker Compose specification",
                ),
            }
        }

        if let Some(networks) = service.get("networks") {
            match networks {
                Value::Sequence(_) => self.string_list(service, &path, "networks"),
                Value::Mapping(_) => {}
                other => self.mismatch(&format!("{}.networks", path), "array or object", other),
            }
        }

        if let Some(depends_on) = service.get("depends_on") {
            let dep_path = format!("{}.depends_on", path);
            match depends_on {
                Value::Sequence(_) => self.string_list(service, &path, "depends_on"),
                Value::Mapping(deps) => {
                    for (key, condition) in deps {
                        if !matches!(condition, Value::Mapping(_) | Value::Null) {
                            self.mismatch(
                                &format!("{}.{}", dep_path, key_text(key)),
                                "object",
                                condition,
                            );
                        }
                    }
                }
                other => self.mismatch(&dep_path, "array or object", other),
            }
        }

        if let Some(restart) = service.get("restart") {
            self.enumeration(&format!("{}.restart", path), restart, RESTART_VALUES);
        }

        self.scalar_map(service, &path, "labels");

        if let Some(healthcheck) = service.get("healthcheck") {
            self.healthcheck(&format!("{}.healthcheck", path), healthcheck);
        }
        if let Some(deploy) = service.get("deploy") {
            self.deploy(&format!("{}.deploy", path), deploy);
        }
        if let Some(logging) = service.get("logging") {
            let logging_path = format!("{}.logging", path);
            match logging {
                Value::Mapping(logging) => {
                    self.optional_string(logging, &logging_path, "driver");
                    self.scalar_map(logging, &logging_path, "options");
                }
                other => self.mismatch(&logging_path, "object", other),
            }
        }
    }

    fn healthcheck(&mut self, path: &str, value: &Value) {
        let Value::Mapping(check) = value else {
            self.mismatch(path, "object", value);
            return;
        };
        self.string_or_list(check, path, "test");
        for field in ["interval", "timeout", "start_period"] {
            self.optional_string(check, path, field);
        }
        self.non_negative_integer(check, path, "retries");
        self.optional_bool(check, path, "disable");
    }

    fn deploy(&mut self, path: &str, value: &Value) {
        let Value::Mapping(deploy) = value else {
            self.mismatch(path, "object", value);
            return;
        };

        self.optional_string(deploy, path, "mode");
        self.non_negative_integer(deploy, path, "replicas");
        self.scalar_map(deploy, path, "labels");

        if let Some(placement) = deploy.get("placement") {
            let placement_path = format!("{}.placement", path);
            match placement {
                Value::Mapping(placement) => {
                    self.string_list(placement, &placement_path, "constraints")
                }
                other => self.mismatch(&placement_path, "object", other),
            }
        }

        if let Some(resources) = deploy.get("resources") {
            let resources_path = format!("{}.resources", path);
            match resources {
                Value::Mapping(resources) => {
                    for tier in ["limits", "reservations"] {
                        let tier_path = format!("{}.{}", resources_path, tier);
                        match resources.get(tier) {
                            None => {}
                            Some(Value::Mapping(spec)) => {
                                self.optional_scalar(spec, &tier_path, "cpus");
                                self.optional_string(spec, &tier_path, "memory");
                            }
                            Some(other) => self.mismatch(&tier_path, "object", other),
                        }
                    }
                }
                other => self.mismatch(&resources_path, "object", other),
            }
        }

        if let Some(policy) = deploy.get("restart_policy") {
            let policy_path = format!("{}.restart_policy", path);
            match policy {
                Value::Mapping(policy) => {
                    if let Some(condition) = policy.get("condition") {
                        self.enumeration(
                            &format!("{}.condition", policy_path),
                            condition,
                            RESTART_CONDITIONS,
                        );
                    }
                    self.optional_string(policy, &policy_path, "delay");
                    self.optional_string(policy, &policy_path, "window");
                    self.non_negative_integer(policy, &policy_path, "max_attempts");
                }
                other => self.mismatch(&policy_path, "object", other),
            }
        }

        for section in ["update_config", "rollback_config"] {
            if let Some(config) = deploy.get(section) {
                let config_path = format!("{}.{}", path, section);
                match config {
                    Value::Mapping(config) => {
                        self.non_negative_integer(config, &config_path, "parallelism");
                        for field in ["delay", "failure_action", "order"] {
                            self.optional_string(config, &config_path, field);
                        }
                    }
                    other => self.mismatch(&config_path, "object", other),
                }
            }
        }
    }

    fn top_level_resource(&mut self, path: &str, value: &Value, is_network: bool) {
        let spec = match value {
            Value::Null => return,
            Value::Mapping(spec) => spec,
            other => {
                self.mismatch(path, "object", other);
                return;
            }
        };
        self.optional_string(spec, path, "driver");
        self.optional_string(spec, path, "name");
        if is_network {
            self.optional_bool(spec, path, "attachable");
        }
        if let Some(external) = spec.get("external") {
            if !matches!(external, Value::Bool(_) | Value::Mapping(_)) {
                self.mismatch(&format!("{}.external", path), "boolean or object", external);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Field primitives
    // ------------------------------------------------------------------------

    fn optional_string(&mut self, map: &Mapping, parent: &str, field: &str) {
        if let Some(value) = map.get(field) {
            if !matches!(value, Value::String(_)) {
                self.mismatch(&format!("{}.{}", parent, field), "string", value);
            }
        }
    }

    fn optional_scalar(&mut self, map: &Mapping, parent: &str, field: &str) {
        if let Some(value) = map.get(field) {
            if !matches!(value, Value::String(_) | Value::Number(_)) {
                self.mismatch(&format!("{}.{}", parent, field), "string", value);
            }
        }
    }

    fn optional_bool(&mut self, map: &Mapping, parent: &str, field: &str) {
        if let Some(value) = map.get(field) {
            if !matches!(value, Value::Bool(_)) {
                self.mismatch(&format!("{}.{}", parent, field), "boolean", value);
            }
        }
    }

    fn non_negative_integer(&mut self, map: &Mapping, parent: &str, field: &str) {
        let Some(value) = map.get(field) else {
            return;
        };
        let path = format!("{}.{}", parent, field);
        match value {
            Value::Number(n) if n.as_u64().is_some_and(|n| n <= u32::MAX as u64) => {}
            Value::Number(n) if n.as_i64().is_some_and(|n| n < 0) => {
                self.push(&path, "Number must be greater than or equal to 0")
            }
            Value::Number(_) => self.push(&path, "Expected integer but got float"),
            other => self.mismatch(&path, "number", other),
        }
    }

    fn string_or_list(&mut self, map: &Mapping, parent: &str, field: &str) {
        match map.get(field) {
            None | Some(Value::String(_)) => {}
            Some(Value::Sequence(_)) => self.string_list(map, parent, field),
            Some(_) => self.push(
                &format!("{}.{}", parent, field),
                "Invalid format. Please check the Docker Compose specification",
            ),
        }
    }

    fn string_list(&mut self, map: &Mapping, parent: &str, field: &str) {
        self.list_of(map, parent, field, |v| matches!(v, Value::String(_)), "string");
    }

    fn scalar_list(&mut self, map: &Mapping, parent: &str, field: &str) {
        self.list_of(
            map,
            parent,
            field,
            |v| matches!(v, Value::String(_) | Value::Number(_)),
            "string",
        );
    }

    fn list_of(
        &mut self,
        map: &Mapping,
        parent: &str,
        field: &str,
        accept: fn(&Value) -> bool,
        expected: &str,
    ) {
        let Some(value) = map.get(field) else {
            return;
        };
        let path = format!("{}.{}", parent, field);
        match value {
            Value::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if !accept(item) {
                        self.mismatch(&format!("{}.{}", path, i), expected, item);
                    }
                }
            }
            other => self.mismatch(&path, "array", other),
        }
    }

    fn scalar_map(&mut self, map: &Mapping, parent: &str, field: &str) {
        let Some(value) = map.get(field) else {
            return;
        };
        let path = format!("{}.{}", parent, field);
        match value {
            Value::Mapping(entries) => {
                for (key, entry) in entries {
                    if matches!(entry, Value::Sequence(_) | Value::Mapping(_)) {
                        self.mismatch(&format!("{}.{}", path, key_text(key)), "string", entry);
                    }
                }
            }
            other => self.mismatch(&path, "object", other),
        }
    }

    fn enumeration(&mut self, path: &str, value: &Value, allowed: &[&str]) {
        let options = allowed
            .iter()
            .map(|v| format!("'{}'", v))
            .collect::<Vec<_>>()
            .join(" | ");
        match value {
            Value::String(s) if allowed.contains(&s.as_str()) => {}
            Value::String(s) => self.push(
                path,
                format!("Invalid enum value. Expected {}, received '{}'", options, s),
            ),
            other => self.mismatch(path, "string", other),
        }
    }
}
