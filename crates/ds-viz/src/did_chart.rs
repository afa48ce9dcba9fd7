//! Two-point DiD chart: control, target and the counterfactual target path.

use ds_core::Result;
use ds_inference::econometrics::SeriesSummary;
use ds_inference::{EstimationResult, Variation};
use serde::Serialize;

use crate::ArtifactMeta;

const X_LABELS: [&str; 2] = ["before intervention", "after intervention"];

/// `didstat_did_chart_v0`.
#[derive(Debug, Clone, Serialize)]
pub struct DidChartArtifact {
    /// Schema identifier.
    pub schema_version: String,
    /// Provenance.
    pub meta: ArtifactMeta,
    /// Shared x axis.
    pub x: Vec<String>,
    /// Control group, Target group, Counterfactual.
    pub series: Vec<ChartSeries>,
    /// One row per x label.
    pub summary_table: Vec<SummaryRow>,
    /// Target after minus counterfactual after.
    pub did_estimate: f64,
}

/// One line of the DiD chart.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    /// Legend label.
    pub name: String,
    /// `[before, after]`.
    pub y: Vec<f64>,
    /// Percentage change between the two points.
    pub variation: Variation,
}

/// Row of the summary table.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    /// Period label.
    pub event_data: String,
    /// Treated-group mean.
    pub target_data: f64,
    /// Control-group mean.
    pub control_data: f64,
    /// Counterfactual treated value.
    pub counterfactual_data: f64,
}

fn chart_series(name: &str, s: &SeriesSummary) -> ChartSeries {
    ChartSeries { name: name.to_string(), y: vec![s.before, s.after], variation: s.variation }
}

/// Build the DiD chart artifact from an estimation result.
pub fn did_chart_artifact(result: &EstimationResult) -> Result<DidChartArtifact> {
    let did = &result.did;
    let series = vec![
        chart_series("Control group", &did.control),
        chart_series("Target group", &did.treated),
        chart_series("Counterfactual", &did.counterfactual),
    ];

    let summary_table = X_LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| SummaryRow {
            event_data: label.to_string(),
            target_data: series[1].y[i],
            control_data: series[0].y[i],
            counterfactual_data: series[2].y[i],
        })
        .collect();

    Ok(DidChartArtifact {
        schema_version: "didstat_did_chart_v0".to_string(),
        meta: ArtifactMeta::now()?,
        x: X_LABELS.iter().map(|s| s.to_string()).collect(),
        series,
        summary_table,
        did_estimate: did.did_estimate,
    })
}
