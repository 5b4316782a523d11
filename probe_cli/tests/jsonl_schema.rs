use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

const CONFIG: &str = r#"
[probe]
oid = 2
pin = 1
trigger_above = true
trigger_below = true
threshold = 0.2
auto_threshold = false
tare_window = 3
average_window = 1

[homing]
sample_ticks = 5
debounce_count = 1
rest_ticks = 50
sink_oid = 9
trigger_reason = 4
"#;

fn run_json(args: &[&str], trace: &str) -> (std::process::Output, Vec<Value>) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, CONFIG).unwrap();
    let csv = dir.path().join("trace.csv");
    fs::write(&csv, trace).unwrap();

    let out = Command::cargo_bin("probe_cli")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .args(args)
        .arg("--trace")
        .arg(&csv)
        .output()
        .unwrap();
    let lines = String::from_utf8(out.stdout.clone())
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str::<Value>(l).expect("stdout line is JSON"))
        .collect();
    (out, lines)
}

#[test]
fn replay_json_lines_have_record_and_fields() {
    let (out, lines) = run_json(
        &["replay", "--log"],
        "raw,busy_ticks\n500,0\n500,0\n500,0\n500,0\n900,0\n",
    );
    assert!(out.status.success(), "{out:?}");

    let (records, summary): (Vec<&Value>, Vec<&Value>) =
        lines.iter().partition(|v| v.get("record").is_some());
    for r in &records {
        assert!(r["record"].is_string());
        assert!(r["fields"].is_object());
        assert_eq!(r["fields"]["oid"], 2);
    }

    let tare = records
        .iter()
        .find(|r| r["record"] == "analog_probe_tare")
        .expect("tare record");
    assert_eq!(tare["fields"]["tare"], 500_000);
    assert_eq!(tare["fields"]["threshold"], 200);
    assert_eq!(tare["fields"]["auto_threshold"], false);

    let finished: Vec<&&Value> = records
        .iter()
        .filter(|r| r["record"] == "analog_probe_log" && r["fields"]["finished"] == true)
        .collect();
    // Once for the pre-fill, once when the trigger closes the homing log.
    assert_eq!(finished.len(), 2);
    assert_eq!(finished[1]["fields"]["triggered"], true);

    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0]["summary"], "replay");
    assert_eq!(summary[0]["reason"], 4);
    assert_eq!(summary[0]["samples"], 5);
}

#[test]
fn no_trigger_error_is_structured_json() {
    let (out, _) = run_json(&["replay"], "raw,busy_ticks\n500,0\n500,0\n500,0\n510,0\n");
    assert_eq!(out.status.code(), Some(3));
    let stderr = String::from_utf8(out.stderr).unwrap();
    let err_line = stderr
        .lines()
        .find(|l| l.starts_with('{') && l.contains("\"reason\""))
        .expect("JSON error line");
    let v: Value = serde_json::from_str(err_line).unwrap();
    assert_eq!(v["reason"], "NoTrigger");
    assert_eq!(v["details"]["samples"], 4);
    assert!(v["message"].as_str().unwrap().contains("never triggered"));
}
