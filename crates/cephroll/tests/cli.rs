//! End-to-end runs of the `cephroll` binary for commands that need no
//! live cluster.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn cephroll(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cephroll"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("cephroll binary runs")
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("cephroll.toml");
    std::fs::write(&path, body).unwrap();
    path
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn upgrade_paths_include_configured_extras() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "[upgrade_paths]\njewel = \"luminous\"\n");

    let out = cephroll(&config, &["upgrade-paths", "--source", "cloud:trusty-mitaka"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("firefly -> hammer"), "{text}");
    assert!(text.contains("jewel -> luminous"), "{text}");
    assert!(text.contains("cloud:trusty-mitaka provides jewel"), "{text}");

    let out = cephroll(&config, &["upgrade-paths", "--source", "distro"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn check_status_reads_collector_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let status = dir.path().join("cephstatus.json");
    std::fs::write(
        &status,
        r#"{
            "health": {"overall_status": "HEALTH_WARN",
                       "summary": [{"severity": "HEALTH_WARN", "summary": "7 pgs backfilling"}]},
            "monmap": {"epoch": 3},
            "osdmap": {"osdmap": {"epoch": 120}},
            "pgmap": {"misplaced_ratio": 0.05, "degraded_ratio": 0.0}
        }"#,
    )
    .unwrap();

    let out = cephroll(&config, &["check-status", "--file", status.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(
        stdout(&out).trim(),
        "WARNING: ceph misplaced 5.00%, degraded 0.00%"
    );

    let out = cephroll(
        &config,
        &["check-status", "--file", dir.path().join("absent.json").to_str().unwrap()],
    );
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn config_prints_effective_values() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "[rolling]\ndead_peer_secs = 300\n");

    let out = cephroll(&config, &["config"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("dead_peer_secs = 300"), "{text}");
    assert!(text.contains("settle_secs = 5"), "{text}");
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "[handoff]\nbackend = \"redb\"\n");
    let out = cephroll(&config, &["config"]);
    assert!(!out.status.success());
}

#[test]
fn reweight_rejects_bad_osd_id() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let out = cephroll(&config, &["reweight", "osd.x", "0.5", "--step", "0.1"]);
    assert_eq!(out.status.code(), Some(2));
}
