//! Runs the `packet-report` binary and checks its JSON output.

use serde_json::Value;
use std::process::Command;

fn report_command() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_packet-report"));
    cmd.env("RUST_LOG", "warn").env_remove("PACKETMATH_CONFIG");
    cmd
}

fn parse_stdout(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("bad JSON ({}): {}", e, stdout))
}

#[test]
fn report_prints_build_and_selftest() {
    let output = report_command().output().expect("failed to run packet-report");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report = parse_stdout(&output);
    assert_eq!(report["build"]["arch"], std::env::consts::ARCH);
    let scalars: Vec<&str> = report["capabilities"]
        .as_array()
        .expect("capabilities array")
        .iter()
        .filter_map(|c| c["scalar"].as_str())
        .collect();
    assert!(scalars.contains(&"i32"));

    let suites = report["selftest"].as_array().expect("selftest array");
    if cfg!(all(target_arch = "x86_64", target_feature = "avx")) {
        assert_eq!(report["build"]["provider"], "avx");
        assert_eq!(suites.len(), 2);
        assert_eq!(suites[0]["packet"], "F32x8");
        assert_eq!(suites[0]["lanes"], 8);
        assert_eq!(suites[1]["packet"], "F64x4");
        assert_eq!(suites[1]["lanes"], 4);
        for suite in suites {
            assert_eq!(suite["passed"], true, "{}", suite);
        }
    } else {
        assert!(report["build"]["provider"].is_null());
        assert!(suites.is_empty());
    }
}

#[test]
fn report_honours_config_file() {
    let path = std::env::temp_dir().join(format!("packetmath-report-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"{ "selftest": { "checks": ["add"] }, "report": { "pretty": false, "include_capabilities": false } }"#,
    )
    .expect("write config");

    let output = report_command()
        .env("PACKETMATH_CONFIG", &path)
        .output()
        .expect("failed to run packet-report");
    let _ = std::fs::remove_file(&path);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim().lines().count(), 1, "expected compact JSON");

    let report = parse_stdout(&output);
    assert!(report.get("capabilities").is_none());
    for suite in report["selftest"].as_array().expect("selftest array") {
        let checks = suite["checks"].as_array().expect("checks array");
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0]["name"], "add");
    }
}
