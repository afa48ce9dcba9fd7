//! # ds-viz
//!
//! Visualization data artifacts for didstat.
//!
//! This crate is intentionally dependency-light and focuses on emitting
//! plot-friendly JSON structures (arrays instead of nested objects). Rendering
//! is left to whatever consumes the JSON.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Plain-language coefficient table.
pub mod coefficients;
/// Control / target / counterfactual two-point chart.
pub mod did_chart;
/// Raw metric over time, one line per group.
pub mod raw_series;
/// All artifacts of one analysis in a single document.
pub mod report;

pub use coefficients::{CoefficientRow, CoefficientTableArtifact, coefficient_table_artifact};
pub use did_chart::{ChartSeries, DidChartArtifact, SummaryRow, did_chart_artifact};
pub use raw_series::{RawSeries, RawSeriesArtifact, raw_series_artifact};
pub use report::{ReportArtifact, report_artifact};

/// Provenance block shared by every artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactMeta {
    /// Always `"didstat"`.
    pub tool: String,
    /// Crate version that produced the artifact.
    pub tool_version: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_unix_ms: u128,
}

impl ArtifactMeta {
    pub(crate) fn now() -> ds_core::Result<Self> {
        Ok(Self {
            tool: "didstat".to_string(),
            tool_version: ds_core::VERSION.to_string(),
            created_unix_ms: now_unix_ms()?,
        })
    }
}

fn now_unix_ms() -> ds_core::Result<u128> {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| ds_core::Error::Computation(format!("system time error: {}", e)))?;
    Ok(d.as_millis())
}

/// Legend label for a group indicator.
pub(crate) fn group_label(group: u8) -> &'static str {
    if group == 0 { "Control group" } else { "Target group" }
}
