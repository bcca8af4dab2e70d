//! CLI integration tests

use std::process::{Command, Output};

fn kubesize(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-p", "kubesize-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn fixture() -> String {
    format!("{}/tests/fixtures/cluster.json", env!("CARGO_MANIFEST_DIR"))
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = kubesize(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Node pool sizing"), "Should show about text");
    assert!(stdout.contains("recommend"), "Should show recommend command");
    assert!(stdout.contains("capacity"), "Should show capacity command");
    assert!(stdout.contains("catalog"), "Should show catalog command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = kubesize(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("kubesize"), "Should show binary name");
}

/// Test recommend command help
#[test]
fn test_recommend_help() {
    let output = kubesize(&["recommend", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Recommend help should succeed");
    for flag in [
        "--headroom",
        "--families",
        "--top",
        "--region",
        "--timeout",
        "--no-pricing",
        "--detailed",
        "--namespace",
        "--nodegroups",
        "--cluster-name",
        "--input",
    ] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

/// Test capacity command help
#[test]
fn test_capacity_help() {
    let output = kubesize(&["capacity", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Capacity help should succeed");
    assert!(stdout.contains("--headroom"), "Should show headroom option");
    assert!(!stdout.contains("--no-pricing"), "Capacity never prices");
}

/// Test catalog listing with a family filter
#[test]
fn test_catalog_json() {
    let output = kubesize(&["catalog", "--families", "m5", "--format", "json"]);
    assert!(output.status.success(), "Catalog should succeed");

    let entries: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Catalog output should be JSON");
    let entries = entries.as_array().expect("Catalog output should be a list");
    assert!(!entries.is_empty());
    assert!(entries
        .iter()
        .all(|e| e["name"].as_str().unwrap_or_default().starts_with("m5")));
}

/// Test an offline recommendation against the snapshot fixture
#[test]
fn test_recommend_from_snapshot() {
    let fixture = fixture();
    let output = kubesize(&[
        "recommend",
        "--input",
        &fixture,
        "--no-pricing",
        "--format",
        "json",
    ]);
    assert!(
        output.status.success(),
        "Recommend should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Report should be JSON");

    // 3.6 vCPU / 7.125 GiB requested, 4.32 / 8.55 required with 20% headroom
    assert_eq!(report["totals"]["requested"]["cpu_cores"], 3.6);
    let recommended = &report["recommendation"]["recommended"];
    assert_eq!(recommended["instance_type"], "c6g.medium");
    assert_eq!(recommended["node_count"], 5);
    assert_eq!(recommended["pricing"]["source"], "unavailable");
    assert_eq!(
        report["recommendation"]["alternatives"]
            .as_array()
            .map(Vec::len),
        Some(5)
    );

    assert_eq!(report["capacity"]["total_cpu_cores"], 12.0);
    assert_eq!(report["degraded"], true);
    let kinds: Vec<&str> = report["notices"]
        .as_array()
        .expect("notices should be a list")
        .iter()
        .filter_map(|n| n["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"unknown_instance_type"));
    assert!(kinds.contains(&"daemonset_approximation"));
    assert!(kinds.contains(&"pricing_unavailable"));
}

/// Test that an allow-list matching nothing fails the run
#[test]
fn test_recommend_empty_families_fails() {
    let fixture = fixture();
    let output = kubesize(&[
        "recommend",
        "--input",
        &fixture,
        "--no-pricing",
        "--families",
        "p4d",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Empty catalog should fail");
    assert!(stderr.contains("p4d"), "Should name the families");
}

/// Test that more than five alternatives are rejected
#[test]
fn test_recommend_top_above_five_fails() {
    let fixture = fixture();
    let output = kubesize(&["recommend", "--input", &fixture, "--no-pricing", "--top", "10"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "--top 10 should be rejected");
    assert!(stderr.contains("top_n"), "Should name the setting");
}

/// Test the capacity report from the snapshot fixture
#[test]
fn test_capacity_from_snapshot() {
    let fixture = fixture();
    let output = kubesize(&["capacity", "--input", &fixture, "--detailed", "--format", "json"]);
    assert!(output.status.success(), "Capacity should succeed");

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Report should be JSON");
    assert_eq!(report["totals"]["workload_count"], 3);
    assert_eq!(report["workloads"].as_array().map(Vec::len), Some(3));
    assert!(report.get("recommendation").is_none());
}
