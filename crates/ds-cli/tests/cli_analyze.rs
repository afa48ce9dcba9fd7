use std::path::PathBuf;
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

fn tmp_path(filename: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("didstat_cli_analyze_{}_{}_{}", std::process::id(), nanos, filename));
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn analyze_args(input: &str) -> Vec<String> {
    ["analyze", "-i", input, "--event-date", "week", "--metric", "sales", "--group", "treated", "--post", "post"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn run_owned(args: &[String]) -> Output {
    let refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    run(&refs)
}

#[test]
fn analyze_reports_did_and_model() {
    let input = fixture_path("did_basic.csv");
    let out = run_owned(&analyze_args(input.to_string_lossy().as_ref()));
    assert!(out.status.success(), "analyze failed, stderr={}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("stdout should be JSON");
    assert_eq!(v["formula"], "sales~treated*post");
    assert_eq!(v["n_rows"], 8);
    assert_eq!(v["n_obs"], 8);
    assert_eq!(v["n_dropped"], 0);

    let did = &v["did"];
    assert_eq!(did["control_before"].as_f64().unwrap(), 11.0);
    assert_eq!(did["treated_after"].as_f64().unwrap(), 29.0);
    assert_eq!(did["counterfactual_after"].as_f64().unwrap(), 25.0);
    assert_eq!(did["did_estimate"].as_f64().unwrap(), 4.0);
    assert_eq!(did["control"]["variation"]["status"], "defined");

    let terms = v["model"]["terms"].as_array().unwrap();
    assert_eq!(terms.len(), 4);
    assert_eq!(terms[3]["name"], "treated:post");
    assert_eq!(terms[3]["role"], "interaction");
    let beta3 = terms[3]["estimate"].as_f64().unwrap();
    assert!((beta3 - 4.0).abs() < 1e-9, "beta3={}", beta3);
    let se = terms[3]["inference"]["std_error"].as_f64().unwrap();
    assert!((se - 7.0_f64.sqrt()).abs() < 1e-9, "se={}", se);
    assert_eq!(v["model"]["df_resid"], 4);
}

#[test]
fn analyze_writes_output_file() {
    let input = fixture_path("did_basic.csv");
    let out_path = tmp_path("result.json");
    let mut args = analyze_args(input.to_string_lossy().as_ref());
    for a in ["--confidence-level", "0.9", "-o"] {
        args.push(a.to_string());
    }
    args.push(out_path.to_string_lossy().into_owned());
    let out = run_owned(&args);
    assert!(out.status.success(), "analyze -o failed, stderr={}", String::from_utf8_lossy(&out.stderr));
    assert!(out.stdout.is_empty());

    let v: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&out_path).unwrap()).expect("output should be JSON");
    assert_eq!(v["model"]["confidence_level"].as_f64().unwrap(), 0.9);
    let _ = std::fs::remove_file(&out_path);
}

#[test]
fn analyze_empty_cell_fails_with_cell_name() {
    let input = fixture_path("did_missing_treated_after.csv");
    let out = run_owned(&analyze_args(input.to_string_lossy().as_ref()));
    assert!(!out.status.success());
    assert!(out.stdout.is_empty(), "no partial output expected");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("treated-after"), "stderr={}", stderr);
}

#[test]
fn analyze_missing_column_is_named() {
    let input = fixture_path("did_basic.csv");
    let mut args = analyze_args(input.to_string_lossy().as_ref());
    let metric = args.iter().position(|a| a == "sales").unwrap();
    args[metric] = "revenue".to_string();
    let out = run_owned(&args);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("missing column: 'revenue'"), "stderr={}", stderr);
}

#[test]
fn analyze_zero_baseline_marks_variation_undefined() {
    let input = fixture_path("did_zero_baseline.csv");
    let out = run_owned(&analyze_args(input.to_string_lossy().as_ref()));
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let control = &v["did"]["control"]["variation"];
    assert_eq!(control["status"], "undefined");
    assert_eq!(control["reason"], "zero_baseline");
    assert_eq!(v["did"]["treated"]["variation"]["status"], "defined");
}

#[test]
fn preview_shows_schema_and_head() {
    let input = fixture_path("did_basic.csv");
    let out = run(&["preview", "-i", input.to_string_lossy().as_ref(), "--rows", "3"]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["n_rows"], 8);
    assert_eq!(v["rows"].as_array().unwrap().len(), 3);
    let names: Vec<&str> =
        v["columns"].as_array().unwrap().iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["week", "sales", "treated", "post"]);
}

#[test]
fn unsupported_input_extension_fails() {
    let out = run(&["preview", "-i", "data.xlsx"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("xlsx"));
}

#[test]
fn version_prints_tool_name() {
    let out = run(&["version"]);
    assert!(out.status.success());
    let s = String::from_utf8_lossy(&out.stdout);
    assert!(s.starts_with("didstat "), "stdout={}", s);
}
