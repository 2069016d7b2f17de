use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "ltesim-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &PathBuf, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

#[test]
fn lte_sim_writes_flow_report_json() {
    let dir = unique_temp_dir("report");
    let config = write_file(&dir, "scenario.json", r#"{ "bulk_max_bytes": 100000 }"#);
    let report = dir.join("flowmon.json");

    let output = Command::new(env!("CARGO_BIN_EXE_lte_sim"))
        .args([
            "--config",
            config.to_str().unwrap(),
            "--sim-time",
            "3",
            "--report",
            report.to_str().unwrap(),
        ])
        .output()
        .expect("run lte_sim");
    assert!(
        output.status.success(),
        "lte_sim failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let text = fs::read_to_string(&report).expect("read report");
    let v: Value = serde_json::from_str(&text).expect("report is json");
    assert_eq!(v["sim_duration_s"], 3.0);
    assert_eq!(v["bin_width_s"], 1.0);
    let flows = v["flows"].as_array().expect("flows array");
    assert_eq!(flows.len(), 15);

    let bulk = flows
        .iter()
        .find(|f| f["name"] == "bulk-ue-0")
        .expect("bulk-ue-0");
    assert_eq!(bulk["class"], "bulk");
    assert_eq!(bulk["protocol"], "tcp");
    assert_eq!(bulk["dst_port"], 9000);
    assert_eq!(bulk["src"], "1.1.0.2");
    assert_eq!(bulk["dst"], "7.0.0.2");
    assert!(bulk["rx_bytes"].as_u64().unwrap() > 0);

    let web = flows
        .iter()
        .find(|f| f["name"] == "web-ue-9")
        .expect("web-ue-9");
    assert_eq!(web["protocol"], "udp");
    assert_eq!(web["src"], "1.2.0.2");
    assert_eq!(web["rx_bytes_per_bin"].as_array().unwrap().len(), 3);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn lte_sim_writes_report_to_stdout_and_rem_file() {
    let dir = unique_temp_dir("stdout");
    let config = write_file(
        &dir,
        "scenario.json",
        r#"{ "ue_count": 2, "rem": { "x_res": 4, "y_res": 2 } }"#,
    );
    let rem = dir.join("rem.out");

    let output = Command::new(env!("CARGO_BIN_EXE_lte_sim"))
        .args([
            "--config",
            config.to_str().unwrap(),
            "--sim-time",
            "0.5",
            "--seed",
            "42",
            "--report",
            "-",
            "--rem-output",
            rem.to_str().unwrap(),
        ])
        .output()
        .expect("run lte_sim");
    assert!(output.status.success());

    let v: Value = serde_json::from_slice(&output.stdout).expect("stdout is json");
    assert_eq!(v["flows"].as_array().unwrap().len(), 3);

    let rem_text = fs::read_to_string(&rem).expect("read rem");
    let lines: Vec<_> = rem_text.lines().collect();
    assert_eq!(lines.len(), 8);
    assert!(lines.iter().all(|l| l.split_whitespace().count() == 4));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn lte_sim_rejects_invalid_config() {
    let dir = unique_temp_dir("invalid");
    let config = write_file(
        &dir,
        "scenario.json",
        r#"{ "access_point_count": 3 }"#,
    );
    let report = dir.join("flowmon.json");

    let output = Command::new(env!("CARGO_BIN_EXE_lte_sim"))
        .args([
            "--config",
            config.to_str().unwrap(),
            "--report",
            report.to_str().unwrap(),
        ])
        .output()
        .expect("run lte_sim");
    assert!(!output.status.success());
    assert!(!report.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("access point"), "stderr: {stderr}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn lte_sim_reports_missing_config_file() {
    let output = Command::new(env!("CARGO_BIN_EXE_lte_sim"))
        .args(["--config", "/nonexistent/ltesim-rs/scenario.json"])
        .output()
        .expect("run lte_sim");
    assert!(!output.status.success());
}
