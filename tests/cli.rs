use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn bridge(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("compose-bridge").unwrap();
    cmd.env("HOME", home.path())
        .env("COMPOSE_BRIDGE_STORE", home.path().join("projects"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn parse_prints_services() {
    let home = TempDir::new().unwrap();
    bridge(&home)
        .args(["parse", "tests/fixtures/compose/shop.yml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 services"))
        .stdout(predicate::str::contains("8080:3000/tcp"));
}

#[test]
fn parse_json_contains_metadata() {
    let home = TempDir::new().unwrap();
    let output = bridge(&home)
        .args(["parse", "--json", "tests/fixtures/compose/shop.yml"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["metadata"]["services"].as_array().unwrap().len(), 3);
    assert_eq!(json["metadata"]["volumeNames"][0], "pgdata");
}

#[test]
fn parse_reports_schema_violations() {
    let home = TempDir::new().unwrap();
    bridge(&home)
        .args(["parse", "tests/fixtures/compose/broken.yml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Validation failed"))
        .stderr(predicate::str::contains("services.web.ports"));
}

#[test]
fn convert_writes_artifact_tree() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("deploy");
    bridge(&home)
        .args(["convert", "tests/fixtures/compose/shop.yml", "--name", "shop", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    assert!(out.join("kubernetes/deployments/deployment-api.yaml").is_file());
    assert!(out.join("kubernetes/configmaps/configmap-api-config.yaml").is_file());
    assert!(out.join("swarm/docker-stack.yml").is_file());
    assert!(out.join("proxy/traefik.yml").is_file());
    assert!(out.join("helm/shop/Chart.yaml").is_file());

    let stack = fs::read_to_string(out.join("swarm/docker-stack.yml")).unwrap();
    assert!(!stack.contains("build:"));
}

#[test]
fn convert_dry_run_writes_nothing() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("deploy");
    bridge(&home)
        .args(["convert", "tests/fixtures/compose/shop.yml", "--platform", "kubernetes", "--dry-run", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("deployment-web.yaml"))
        .stdout(predicate::str::contains("docker-stack.yml").not());
    assert!(!out.exists());
}

#[test]
fn convert_validate_and_save_then_list_projects() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("deploy");
    bridge(&home)
        .args(["convert", "tests/fixtures/compose/shop.yml", "--name", "shop", "--validate", "--save", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("score"))
        .stdout(predicate::str::contains("Saved project"));

    bridge(&home)
        .args(["projects", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shop"))
        .stdout(predicate::str::contains("shop.yml"));
}

#[test]
fn validate_generated_tree_as_json() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("deploy");
    bridge(&home)
        .args(["convert", "tests/fixtures/compose/shop.yml", "--name", "shop", "-o"])
        .arg(&out)
        .assert()
        .success();

    let output = bridge(&home)
        .args(["validate", "--format", "json"])
        .arg(out.join("kubernetes"))
        .arg(out.join("helm"))
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stdout));
    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let reports = reports.as_array().unwrap();
    assert!(reports.iter().any(|r| r["kind"] == "helm"));
    assert!(reports.iter().all(|r| r["result"]["valid"] == true));
}

#[test]
fn validate_fails_on_invalid_name() {
    let home = TempDir::new().unwrap();
    bridge(&home)
        .args(["validate", "tests/fixtures/manifests/invalid-name.yaml"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("metadata.name"));
}

#[test]
fn validate_min_score_gate() {
    let home = TempDir::new().unwrap();
    bridge(&home)
        .args(["validate", "tests/fixtures/manifests/bare-deployment.yaml"])
        .assert()
        .success();
    bridge(&home)
        .args(["validate", "--min-score", "90", "tests/fixtures/manifests/bare-deployment.yaml"])
        .assert()
        .code(1);
}

#[test]
fn harden_adds_probes_and_security() {
    let home = TempDir::new().unwrap();
    bridge(&home)
        .args([
            "harden",
            "tests/fixtures/manifests/bare-deployment.yaml",
            "--profile",
            "large",
            "--liveness-path",
            "/livez",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("path: /livez"))
        .stdout(predicate::str::contains("port: 5000"))
        .stdout(predicate::str::contains("runAsNonRoot: true"))
        .stdout(predicate::str::contains("memory: 2Gi"))
        .stderr(predicate::str::contains("Add liveness probe to container 'legacy'"));
}

#[test]
fn unknown_project_is_an_error() {
    let home = TempDir::new().unwrap();
    bridge(&home)
        .args(["projects", "show", "deadbeef"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Project not found"));
}

#[test]
fn explicit_missing_config_is_an_error() {
    let home = TempDir::new().unwrap();
    bridge(&home)
        .args(["--config", "does-not-exist.toml", "parse", "tests/fixtures/compose/shop.yml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration file not found"));
}
