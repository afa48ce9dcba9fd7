//! Combined report artifact.

use ds_core::{Result, Tabular};
use ds_inference::EstimationResult;
use serde::Serialize;

use crate::{
    ArtifactMeta, CoefficientTableArtifact, DidChartArtifact, RawSeriesArtifact,
    coefficient_table_artifact, did_chart_artifact, raw_series_artifact,
};

/// `didstat_report_v0`.
#[derive(Debug, Clone, Serialize)]
pub struct ReportArtifact {
    /// Schema identifier.
    pub schema_version: String,
    /// Provenance.
    pub meta: ArtifactMeta,
    /// The estimation the report describes.
    pub result: EstimationResult,
    /// Raw metric by group.
    pub raw_series: RawSeriesArtifact,
    /// Control / target / counterfactual chart.
    pub did_chart: DidChartArtifact,
    /// Coefficient table.
    pub coefficients: CoefficientTableArtifact,
}

/// Build every artifact for one analysis.
///
/// `data` must be the dataset `result` was computed from.
pub fn report_artifact(data: &dyn Tabular, result: &EstimationResult) -> Result<ReportArtifact> {
    Ok(ReportArtifact {
        schema_version: "didstat_report_v0".to_string(),
        meta: ArtifactMeta::now()?,
        result: result.clone(),
        raw_series: raw_series_artifact(data, &result.selection)?,
        did_chart: did_chart_artifact(result)?,
        coefficients: coefficient_table_artifact(result)?,
    })
}
