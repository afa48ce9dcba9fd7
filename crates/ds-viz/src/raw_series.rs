//! Raw metric over time, one series per group.
//!
//! Points keep dataset row order; no aggregation is done, so a dataset with
//! several units per date yields several points at that `x`.

use ds_core::{ColumnSelection, Error, Result, Tabular};
use serde::Serialize;

use crate::{ArtifactMeta, group_label};

/// `didstat_raw_series_v0`.
#[derive(Debug, Clone, Serialize)]
pub struct RawSeriesArtifact {
    /// Schema identifier.
    pub schema_version: String,
    /// Provenance.
    pub meta: ArtifactMeta,
    /// Column plotted on the x axis.
    pub x_column: String,
    /// Column plotted on the y axis.
    pub y_column: String,
    /// Column the series are split by.
    pub group_column: String,
    /// Control first, then target. A group with no rows is omitted.
    pub series: Vec<RawSeries>,
}

/// One line of the raw chart.
#[derive(Debug, Clone, Serialize)]
pub struct RawSeries {
    /// Legend label.
    pub name: String,
    /// Group indicator value.
    pub group: u8,
    /// Event-date display strings.
    pub x: Vec<String>,
    /// Metric values; `null` where missing.
    pub y: Vec<Option<f64>>,
}

/// Build the raw time-series artifact.
///
/// Rows with a missing group value are skipped. A group value other than 0 or
/// 1 is an [`Error::InvalidIndicator`].
pub fn raw_series_artifact(
    data: &dyn Tabular,
    selection: &ColumnSelection,
) -> Result<RawSeriesArtifact> {
    let dates = data.display_column(&selection.event_date)?;
    let metric = data.numeric_column(&selection.metric)?;
    let group = data.numeric_column(&selection.group)?;

    let mut series: Vec<RawSeries> = (0..=1u8)
        .map(|g| RawSeries {
            name: group_label(g).to_string(),
            group: g,
            x: Vec::new(),
            y: Vec::new(),
        })
        .collect();

    for (row, ((x, y), g)) in dates.into_iter().zip(metric).zip(group).enumerate() {
        let Some(g) = g else { continue };
        let idx = match g {
            v if v == 0.0 => 0,
            v if v == 1.0 => 1,
            value => {
                return Err(Error::InvalidIndicator {
                    column: selection.group.clone(),
                    row,
                    value,
                });
            }
        };
        series[idx].x.push(x);
        series[idx].y.push(y);
    }
    series.retain(|s| !s.x.is_empty());

    Ok(RawSeriesArtifact {
        schema_version: "didstat_raw_series_v0".to_string(),
        meta: ArtifactMeta::now()?,
        x_column: selection.event_date.clone(),
        y_column: selection.metric.clone(),
        group_column: selection.group.clone(),
        series,
    })
}
