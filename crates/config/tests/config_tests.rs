// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::path::PathBuf;
use streamio_config::{parse_u32, BenchScript, ChannelMode, ScenarioKind, ScenarioSpec};

fn temp_script(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("streamio-config-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("bench.yaml");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_script_from_file() {
    let path = temp_script(
        "file",
        r#"
schema_version: "1.0"
seed: 42
params:
  channel_count: 4
  bank_count: 16
limits:
  max_ticks: 250000
  continue_on_failure: true
scenarios:
  - name: "pair"
    latency: 10
    stall_cycles: 300
    channels:
      - { id: 0, mode: instream, start_address: 0x8064, num_words: 200, switch_sel: 0xF, completion_delay: 20 }
      - { id: 2, mode: outstream, start_address: 0x200064, num_words: 300, switch_sel: 0xF }
  - name: "regs"
    kind: config_roundtrip
"#,
    );

    let script = BenchScript::from_file(&path).unwrap();
    assert_eq!(script.seed, Some(42));
    assert_eq!(script.params.channel_count, Some(4));
    assert!(script.limits.continue_on_failure);
    assert_eq!(script.scenarios.len(), 2);

    let pair = &script.scenarios[0];
    assert_eq!(pair.channels[1].mode, ChannelMode::Outstream);
    assert_eq!(pair.channels[1].start_address, 0x20_0064);
    assert_eq!(pair.channels[0].completion_delay, 20);
    assert_eq!(script.scenarios[1].kind, ScenarioKind::ConfigRoundtrip);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_missing_file_has_context() {
    let err = BenchScript::from_file("/nonexistent/streamio/bench.yaml").unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read bench script"));
}

#[test]
fn test_duplicate_scenario_names_rejected() {
    let yaml = r#"
scenarios:
  - name: "same"
  - name: "same"
"#;
    let err = BenchScript::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("Duplicate scenario name"));
}

#[test]
fn test_blank_scenario_name_rejected() {
    let yaml = r#"
scenarios:
  - name: "  "
"#;
    assert!(BenchScript::from_yaml(yaml).is_err());
}

#[test]
fn test_bad_mode_rejected() {
    let yaml = r#"
scenarios:
  - name: "a"
    channels:
      - { id: 0, mode: bidirectional }
"#;
    let err = BenchScript::from_yaml(yaml).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse Bench Script YAML"));
}

#[test]
fn test_scenario_serializes_back() {
    let yaml = r#"
name: "out"
stall_cycles: 5
channels:
  - { id: 3, mode: sram, num_words: 8 }
"#;
    let spec: ScenarioSpec = serde_yaml::from_str(yaml).unwrap();
    let text = serde_yaml::to_string(&spec).unwrap();
    assert!(text.contains("mode: sram"));
    assert!(text.contains("kind: stream"));
    let again: ScenarioSpec = serde_yaml::from_str(&text).unwrap();
    assert_eq!(again.channels[0].num_words, 8);
    assert_eq!(again.latency, 10);
}

#[test]
fn test_parse_u32_forms() {
    assert_eq!(parse_u32("17").unwrap(), 17);
    assert_eq!(parse_u32("0x1F").unwrap(), 31);
    assert_eq!(parse_u32(" 0X10 ").unwrap(), 16);
    assert!(parse_u32("").is_err());
    assert!(parse_u32("0xZZ").is_err());
    assert!(parse_u32("-1").is_err());
}
