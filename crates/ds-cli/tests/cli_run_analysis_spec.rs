use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_didstat"))
}

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..").canonicalize().unwrap()
}

fn fixture_path(name: &str) -> PathBuf {
    repo_root().join("tests/fixtures").join(name)
}

fn tmp_dir_path(suffix: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("didstat_run_spec_{}_{}_{}", std::process::id(), nanos, suffix));
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

/// Copy the spec fixture and its dataset into a fresh dir so outputs land there.
fn stage_spec(dir: &Path, yaml: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::copy(fixture_path("did_basic.csv"), dir.join("did_basic.csv")).unwrap();
    let spec = dir.join("analysis.yaml");
    std::fs::write(&spec, yaml).unwrap();
    spec
}

fn read_json(path: &Path) -> serde_json::Value {
    let bytes = std::fs::read(path).unwrap_or_else(|e| panic!("read {}: {}", path.display(), e));
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn run_spec_writes_result_artifacts_and_bundle() {
    let dir = tmp_dir_path("full");
    let yaml = std::fs::read_to_string(fixture_path("analysis_basic.yaml")).unwrap();
    let spec = stage_spec(&dir, &yaml);

    let out = run(&["run", "--config", spec.to_string_lossy().as_ref()]);
    assert!(out.status.success(), "run failed, stderr={}", String::from_utf8_lossy(&out.stderr));

    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).expect("stdout JSON");
    assert_eq!(summary["did_estimate"].as_f64().unwrap(), 4.0);

    let out_dir = dir.join("out");
    let result = read_json(&out_dir.join("result.json"));
    assert_eq!(result["formula"], "sales~treated*post");

    assert_eq!(read_json(&out_dir.join("raw_series.json"))["schema_version"], "didstat_raw_series_v0");
    assert_eq!(read_json(&out_dir.join("did_chart.json"))["schema_version"], "didstat_did_chart_v0");
    let coef = read_json(&out_dir.join("coefficients.json"));
    assert_eq!(coef["schema_version"], "didstat_coefficients_v0");
    assert_eq!(coef["rows"].as_array().unwrap().len(), 4);

    assert!(out_dir.join("bundle/manifest.json").exists());
    assert_eq!(read_json(&out_dir.join("bundle/meta.json"))["command"], "run");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn run_spec_rejects_unknown_schema_version() {
    let dir = tmp_dir_path("bad_version");
    let yaml = std::fs::read_to_string(fixture_path("analysis_basic.yaml"))
        .unwrap()
        .replace("didstat_analysis_spec_v0", "didstat_analysis_spec_v9");
    let spec = stage_spec(&dir, &yaml);

    let out = run(&["run", "--config", spec.to_string_lossy().as_ref()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unsupported schema_version"));
    assert!(!dir.join("out").exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn run_spec_failure_writes_nothing() {
    let dir = tmp_dir_path("missing_col");
    let yaml = std::fs::read_to_string(fixture_path("analysis_basic.yaml"))
        .unwrap()
        .replace("metric: sales", "metric: revenue");
    let spec = stage_spec(&dir, &yaml);

    let out = run(&["run", "--config", spec.to_string_lossy().as_ref()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("missing column: 'revenue'"));
    assert!(!dir.join("out").exists(), "no partial output expected");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn run_spec_removes_bundle_when_an_output_write_fails() {
    let dir = tmp_dir_path("blocked_result");
    let yaml = std::fs::read_to_string(fixture_path("analysis_basic.yaml")).unwrap();
    let spec = stage_spec(&dir, &yaml);
    // A directory where result.json should go makes the file write fail.
    std::fs::create_dir_all(dir.join("out/result.json")).unwrap();

    let out = run(&["run", "--config", spec.to_string_lossy().as_ref()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to write"));
    assert!(out.stdout.is_empty(), "no summary expected on failure");

    let out_dir = dir.join("out");
    assert!(!out_dir.join("bundle").exists(), "bundle must not outlive a failed run");
    for name in ["raw_series.json", "did_chart.json", "coefficients.json"] {
        assert!(!out_dir.join(name).exists(), "{} left behind", name);
    }
    assert!(out_dir.join("result.json").is_dir(), "pre-existing entries are kept");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn run_spec_into_existing_empty_bundle_dir() {
    let dir = tmp_dir_path("empty_bundle");
    let yaml = std::fs::read_to_string(fixture_path("analysis_basic.yaml")).unwrap();
    let spec = stage_spec(&dir, &yaml);
    std::fs::create_dir_all(dir.join("out/bundle")).unwrap();
    std::fs::create_dir_all(dir.join("out/did_chart.json")).unwrap();

    let out = run(&["run", "--config", spec.to_string_lossy().as_ref()]);
    assert!(!out.status.success());

    // The bundle dir existed before the run, so it stays, emptied.
    let bundle = dir.join("out/bundle");
    assert!(bundle.is_dir());
    assert_eq!(std::fs::read_dir(&bundle).unwrap().count(), 0);
    assert!(!dir.join("out/result.json").exists());

    let _ = std::fs::remove_dir_all(&dir);
}
