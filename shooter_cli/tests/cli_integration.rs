use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

const VALID: &str = r#"
[joints]
topology = "dual"
friction = ["left", "right"]
trigger = "trigger"

[pid.friction]
kp = 0.05
ki = 0.5
i_clamp = 1.0
out_max = 10.0

[pid.trigger]
kp = 2.0
kd = 0.1
out_max = 5.0

[dynamic]
push_angle = 0.785
qd_16 = 16.0
qd_30 = 30.0

[block]
block_effort = 0.5
block_duration = 0.1
block_speed = 3.0
anti_block_angle = 0.3
anti_block_error = 0.05
"#;

const FIRE_16: &str = r#"
# fire at level 16 from the start
{"at_ms": 0, "type": "command", "speed": 16, "fire_enable": true, "rate_hz": 10}
"#;

fn write(dir: &tempfile::TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

fn run_json(cfg: &PathBuf, extra: &[&str]) -> serde_json::Value {
    let out = Command::cargo_bin("shooter")
        .unwrap()
        .arg("--config")
        .arg(cfg)
        .arg("--json")
        .arg("--log-level")
        .arg("warn")
        .arg("run")
        .args(extra)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8(out.stdout).unwrap();
    let line = stdout.lines().last().expect("summary line");
    serde_json::from_str(line).unwrap()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["check"], 0, "config OK", "stdout")]
#[case(&["run", "--duration-ms", "100"], 0, "run complete", "stdout")]
#[case(&["run", "--jam-clear=-1"], 2, "jam-clear", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write(&dir, "cfg.toml", VALID);

    let out = Command::cargo_bin("shooter")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(args)
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(exit_code));
    let text = if stream == "stdout" {
        String::from_utf8_lossy(&out.stdout).into_owned()
    } else {
        String::from_utf8_lossy(&out.stderr).into_owned()
    };
    assert!(text.contains(needle), "missing {needle:?} in {stream}: {text}");
}

#[test]
fn missing_config_file_fails_with_hint() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("shooter")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("check")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("could not be read"));
}

#[test]
fn invalid_config_value_is_rejected() {
    let dir = tempdir().unwrap();
    let bad = VALID.replace("push_angle = 0.785", "push_angle = -1.0");
    let cfg = write(&dir, "cfg.toml", &bad);
    Command::cargo_bin("shooter")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("check")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("push_angle"));
}

#[test]
fn topology_mismatch_is_rejected() {
    let dir = tempdir().unwrap();
    let bad = VALID.replace(r#"topology = "dual""#, r#"topology = "single""#);
    let cfg = write(&dir, "cfg.toml", &bad);
    Command::cargo_bin("shooter")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("joints.friction"));
}

#[test]
fn scripted_run_reaches_push_and_feeds() {
    let dir = tempdir().unwrap();
    let cfg = write(&dir, "cfg.toml", VALID);
    let script = write(&dir, "fire.jsonl", FIRE_16);

    let v = run_json(
        &cfg,
        &[
            "--script",
            script.to_str().unwrap(),
            "--duration-ms",
            "1500",
        ],
    );
    assert_eq!(v["ticks"], 1500);
    assert_eq!(v["final_state"], "Push");
    assert_eq!(v["updates_applied"], 1);
    assert!(v["feeds"].as_u64().unwrap() >= 3, "{v}");
    assert_eq!(v["jams"], 0);

    let wheels = v["wheel_velocities"].as_array().unwrap();
    assert_eq!(wheels.len(), 2);
    assert!((wheels[0].as_f64().unwrap() - 16.0).abs() <= 1.0, "{v}");
    assert!((wheels[1].as_f64().unwrap() + 16.0).abs() <= 1.0, "{v}");
}

#[test]
fn stop_command_ends_in_stop() {
    let dir = tempdir().unwrap();
    let cfg = write(&dir, "cfg.toml", VALID);
    let script = write(
        &dir,
        "stop.jsonl",
        r#"{"at_ms": 0, "type": "command", "speed": 16, "fire_enable": true, "rate_hz": 10}
{"at_ms": 600, "type": "command", "speed": 16, "stop": true}
"#,
    );
    let v = run_json(
        &cfg,
        &["--script", script.to_str().unwrap(), "--duration-ms", "800"],
    );
    assert_eq!(v["final_state"], "Stop");
    assert_eq!(v["updates_applied"], 2);
}

#[test]
fn jammed_trigger_is_detected_and_recovered() {
    let dir = tempdir().unwrap();
    let cfg = write(&dir, "cfg.toml", VALID);
    let script = write(&dir, "fire.jsonl", FIRE_16);

    let v = run_json(
        &cfg,
        &[
            "--script",
            script.to_str().unwrap(),
            "--duration-ms",
            "3000",
            "--jam-at",
            "1.0",
        ],
    );
    assert!(v["jams"].as_u64().unwrap() >= 1, "{v}");
    assert!(v["trigger_position"].as_f64().unwrap() > 1.0, "{v}");
}

#[test]
fn rejected_script_entry_is_counted_not_fatal() {
    let dir = tempdir().unwrap();
    let cfg = write(&dir, "cfg.toml", VALID);
    let script = write(
        &dir,
        "bad.jsonl",
        r#"{"at_ms": 0, "type": "command", "speed": 12}
{"at_ms": 0, "type": "block", "block_effort": -1.0}
"#,
    );
    let v = run_json(
        &cfg,
        &["--script", script.to_str().unwrap(), "--duration-ms", "50"],
    );
    assert_eq!(v["updates_applied"], 0);
    assert_eq!(v["updates_rejected"], 2);
}

#[test]
fn malformed_script_line_fails_before_running() {
    let dir = tempdir().unwrap();
    let cfg = write(&dir, "cfg.toml", VALID);
    let script = write(&dir, "bad.jsonl", "{\"at_ms\": 0, \"type\": \"launch\"}\n");
    Command::cargo_bin("shooter")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("run")
        .arg("--script")
        .arg(&script)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("script"));
}

#[test]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let out = Command::cargo_bin("shooter")
        .unwrap()
        .arg("--json")
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .arg("check")
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8(out.stderr).unwrap();
    let line = stderr
        .lines()
        .find(|l| l.contains("\"reason\""))
        .expect("json error line");
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "Error");
}
