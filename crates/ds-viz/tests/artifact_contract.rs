use approx::assert_abs_diff_eq;
use std::path::PathBuf;

use ds_core::{AnalysisOptions, AnalysisRequest, ColumnSelection};
use ds_inference::{EstimationResult, TermRole, Variation, run_analysis};
use ds_translate::Dataset;

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..").canonicalize().expect("repo root")
}

fn load_fixture(name: &str) -> (Dataset, EstimationResult) {
    let path = repo_root().join("tests/fixtures").join(name);
    let ds = ds_translate::read_tabular_file(&path).expect("read fixture");
    let req = AnalysisRequest::new(ColumnSelection::new("week", "sales", "treated", "post"));
    let result = run_analysis(&ds, &req).expect("analysis");
    (ds, result)
}

#[test]
fn raw_series_artifact_contract() {
    let (ds, result) = load_fixture("did_basic.csv");
    let a = ds_viz::raw_series_artifact(&ds, &result.selection).expect("raw series");

    assert_eq!(a.schema_version, "didstat_raw_series_v0");
    assert_eq!(a.meta.tool, "didstat");
    assert_eq!(a.x_column, "week");
    assert_eq!(a.series.len(), 2);

    let control = &a.series[0];
    assert_eq!(control.name, "Control group");
    assert_eq!(control.group, 0);
    assert_eq!(control.x, vec!["2024-01-01", "2024-01-08", "2024-01-15", "2024-01-22"]);
    assert_eq!(control.y, vec![Some(10.0), Some(12.0), Some(13.0), Some(15.0)]);

    let target = &a.series[1];
    assert_eq!(target.name, "Target group");
    assert_eq!(target.y, vec![Some(20.0), Some(24.0), Some(28.0), Some(30.0)]);

    let json = serde_json::to_value(&a).unwrap();
    assert!(json["series"][0]["x"].is_array());
}

#[test]
fn did_chart_artifact_contract() {
    let (_, result) = load_fixture("did_basic.csv");
    let a = ds_viz::did_chart_artifact(&result).expect("did chart");

    assert_eq!(a.schema_version, "didstat_did_chart_v0");
    assert_eq!(a.x, vec!["before intervention", "after intervention"]);
    let names: Vec<&str> = a.series.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Control group", "Target group", "Counterfactual"]);

    // Cell means 11, 14, 22, 29.
    assert_eq!(a.series[0].y, vec![11.0, 14.0]);
    assert_eq!(a.series[1].y, vec![22.0, 29.0]);
    assert_eq!(a.series[2].y, vec![22.0, 25.0]);
    assert_abs_diff_eq!(a.did_estimate, 4.0, epsilon = 1e-12);

    assert_eq!(a.summary_table.len(), 2);
    let after = &a.summary_table[1];
    assert_eq!(after.event_data, "after intervention");
    assert_eq!(after.target_data, 29.0);
    assert_eq!(after.control_data, 14.0);
    assert_eq!(after.counterfactual_data, 25.0);

    let json = serde_json::to_value(&a).unwrap();
    assert_eq!(json["series"][0]["variation"]["status"], "defined");
}

#[test]
fn did_chart_reports_undefined_variation_for_zero_baseline() {
    let (_, result) = load_fixture("did_zero_baseline.csv");
    let a = ds_viz::did_chart_artifact(&result).expect("did chart");
    assert!(matches!(a.series[0].variation, Variation::Undefined { .. }));
    assert!(matches!(a.series[1].variation, Variation::Defined { .. }));

    let json = serde_json::to_value(&a).unwrap();
    assert_eq!(json["series"][0]["variation"]["status"], "undefined");
    assert_eq!(json["series"][0]["variation"]["reason"], "zero_baseline");
}

#[test]
fn coefficient_table_artifact_contract() {
    let (_, result) = load_fixture("did_basic.csv");
    let a = ds_viz::coefficient_table_artifact(&result).expect("coefficients");

    assert_eq!(a.schema_version, "didstat_coefficients_v0");
    assert_eq!(a.formula, "sales~treated*post");
    assert_eq!(a.df_resid, 4);
    assert_abs_diff_eq!(a.alpha, 0.05, epsilon = 1e-12);

    let names: Vec<&str> = a.rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Intercept", "treated", "post", "treated:post"]);

    let interaction = &a.rows[3];
    assert_eq!(interaction.role, TermRole::Interaction);
    assert_abs_diff_eq!(interaction.estimate, 4.0, epsilon = 1e-9);
    assert_abs_diff_eq!(interaction.std_error.unwrap(), 7.0_f64.sqrt(), epsilon = 1e-9);
    let (lo, hi) = (interaction.ci_lower.unwrap(), interaction.ci_upper.unwrap());
    assert!(lo < 4.0 && 4.0 < hi);
    assert_eq!(interaction.significant, Some(false));

    assert_eq!(interaction.sentences.len(), 4);
    assert!(interaction.sentences[1].contains("could vary by approximately 3 units"));
    assert!(interaction.sentences[3].starts_with(
        "We are 95 per cent confident that the true value of treated:post falls between"
    ));

    // The intercept (control-before mean 11, se sqrt(1.75)) is clearly non-zero.
    assert_eq!(a.rows[0].significant, Some(true));
}

#[test]
fn coefficient_table_follows_confidence_level() {
    let path = repo_root().join("tests/fixtures/did_basic.csv");
    let ds = ds_translate::read_tabular_file(&path).expect("read fixture");
    let req = AnalysisRequest {
        selection: ColumnSelection::new("week", "sales", "treated", "post"),
        options: AnalysisOptions { confidence_level: 0.9 },
    };
    let result = run_analysis(&ds, &req).expect("analysis");
    let a = ds_viz::coefficient_table_artifact(&result).expect("coefficients");

    assert_abs_diff_eq!(a.alpha, 0.1, epsilon = 1e-12);
    let interaction = &a.rows[3];
    assert_eq!(interaction.significant, Some(false));
    assert!(interaction.sentences[2].ends_with("at the 10 per cent level."));
    assert!(interaction.sentences[3].starts_with("We are 90 per cent confident"));
}

#[test]
fn coefficient_table_for_constant_cells_has_undefined_p_values() {
    let (_, result) = load_fixture("did_constant_cells.csv");
    let a = ds_viz::coefficient_table_artifact(&result).expect("coefficients");

    assert_eq!(a.df_resid, 4);
    assert_abs_diff_eq!(a.rows[3].estimate, 3.0, epsilon = 1e-9);
    for row in &a.rows {
        assert_eq!(row.std_error, Some(0.0));
        assert!(row.t_stat.is_none());
        assert!(row.p_value.is_none());
        assert!(row.significant.is_none());
        assert_eq!(
            row.sentences[2],
            "The p-value is undefined because the standard error is zero."
        );
    }
}

#[test]
fn report_artifact_bundles_all_parts() {
    let (ds, result) = load_fixture("did_basic.csv");
    let r = ds_viz::report_artifact(&ds, &result).expect("report");
    assert_eq!(r.schema_version, "didstat_report_v0");
    assert_eq!(r.raw_series.schema_version, "didstat_raw_series_v0");
    assert_eq!(r.did_chart.schema_version, "didstat_did_chart_v0");
    assert_eq!(r.coefficients.schema_version, "didstat_coefficients_v0");
    assert_eq!(r.result, result);
    assert_eq!(r.meta.tool_version, ds_core::VERSION);
}
