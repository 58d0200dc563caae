// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const SMALL_PARAMS: &str = r#"
params:
  channel_count: 4
  bank_count: 8
  bank_addr_width: 10
"#;

fn temp_dir(prefix: &str) -> PathBuf {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir()
        .join("streamio-tests")
        .join(format!("{}-{}", prefix, nonce));
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

fn write_script(dir: &PathBuf, body: &str) -> PathBuf {
    let path = dir.join("bench.yaml");
    let contents = format!("schema_version: \"1.0\"\n{}{}", SMALL_PARAMS, body);
    std::fs::write(&path, contents).expect("Failed to write script");
    path
}

fn streamio(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_streamio"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn read_result(dir: &PathBuf) -> serde_json::Value {
    let text = std::fs::read_to_string(dir.join("result.json")).expect("result.json missing");
    serde_json::from_str(&text).expect("result.json is not JSON")
}

#[test]
fn test_builtin_batch_passes_and_writes_result() {
    let dir = temp_dir("builtin");
    let out = dir.join("artifacts");
    let output = streamio(&[
        "builtin",
        "--seed",
        "7",
        "--output-dir",
        out.to_str().unwrap(),
    ]);
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json = read_result(&out);
    assert_eq!(json["result_schema_version"], "1.0");
    assert_eq!(json["status"], "pass");
    assert_eq!(json["report"]["seed"], 7);
    assert_eq!(json["report"]["scenarios"].as_array().unwrap().len(), 3);
    assert_eq!(json["report"]["scenarios"][1]["seed"], 8);
    assert_eq!(json["metrics"]["runs"], 3);
    assert_eq!(json["metrics"]["stall_ticks"], 300);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_script_run_with_bank_crossing() {
    let dir = temp_dir("script");
    let script = write_script(
        &dir,
        r#"
seed: 5
scenarios:
  - name: "cross"
    latency: 4
    stall_cycles: 20
    channels:
      - { id: 0, mode: instream, start_address: 0x40, num_words: 100, switch_sel: 0x3 }
      - { id: 1, mode: outstream, start_address: 0xBC0, num_words: 100, switch_sel: 0x3 }
  - name: "regs"
    kind: config_roundtrip
"#,
    );
    let out = dir.join("artifacts");
    let snapshot = dir.join("snapshot.json");
    let output = streamio(&[
        "run",
        "--script",
        script.to_str().unwrap(),
        "--output-dir",
        out.to_str().unwrap(),
        "--snapshot",
        snapshot.to_str().unwrap(),
    ]);
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json = read_result(&out);
    assert_eq!(json["report"]["params"]["bank_count"], 8);
    let cross = &json["report"]["scenarios"][0];
    assert_eq!(cross["passed"], true);
    assert_eq!(cross["checks"]["instream_words"], 100);
    assert_eq!(cross["checks"]["outstream_words"], 100);
    assert_eq!(json["report"]["scenarios"][1]["registers_checked"], 20);

    let snap: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&snapshot).unwrap()).unwrap();
    assert!(snap["tick"].as_u64().unwrap() > 0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_script_is_config_error() {
    let output = streamio(&["run", "--script", "/nonexistent/streamio/bench.yaml"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_invalid_param_is_config_error() {
    // 8 channels cannot share 3 banks.
    let output = streamio(&["builtin", "--param", "bank_count=3"]);
    assert_eq!(output.status.code(), Some(2));

    let output = streamio(&["builtin", "--param", "no_such_param=1"]);
    assert_eq!(output.status.code(), Some(2));

    // A register id as wide as the whole config address leaves no channel bits.
    let output = streamio(&[
        "builtin",
        "--param",
        "CONFIG_REG_WIDTH=32",
        "--param",
        "CONFIG_FEATURE_WIDTH=0",
        "--param",
        "NUM_IO=1",
        "--param",
        "NUM_BANKS=1",
    ]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_unaligned_channel_fails_as_config_error() {
    let dir = temp_dir("unaligned");
    let script = write_script(
        &dir,
        r#"
scenarios:
  - name: "odd"
    channels:
      - { id: 0, mode: instream, start_address: 0x41, num_words: 10, switch_sel: 0x3 }
  - name: "regs"
    kind: config_roundtrip
"#,
    );
    let out = dir.join("artifacts");
    let output = streamio(&[
        "run",
        "--script",
        script.to_str().unwrap(),
        "--output-dir",
        out.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));

    let json = read_result(&out);
    assert_eq!(json["status"], "fail");
    let scenarios = json["report"]["scenarios"].as_array().unwrap();
    assert_eq!(scenarios.len(), 1);
    assert_eq!(scenarios[0]["error_kind"], "configuration");

    // With continue-on-failure the second scenario still runs and passes.
    let output = streamio(&[
        "run",
        "--script",
        script.to_str().unwrap(),
        "--output-dir",
        out.to_str().unwrap(),
        "--continue-on-failure",
    ]);
    assert_eq!(output.status.code(), Some(2));
    let json = read_result(&out);
    let scenarios = json["report"]["scenarios"].as_array().unwrap();
    assert_eq!(scenarios.len(), 2);
    assert_eq!(scenarios[1]["passed"], true);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_tick_ceiling_is_runtime_error() {
    let dir = temp_dir("timeout");
    let script = write_script(
        &dir,
        r#"
scenarios:
  - name: "long"
    channels:
      - { id: 2, mode: outstream, start_address: 0x1000, num_words: 100, switch_sel: 0x3 }
"#,
    );
    let output = streamio(&["run", "--script", script.to_str().unwrap(), "--max-ticks", "5"]);
    assert_eq!(output.status.code(), Some(3));

    let _ = std::fs::remove_dir_all(&dir);
}
