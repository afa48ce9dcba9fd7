//! Common data types for didstat

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One of the four (group, post) partitions of a two-period DiD dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cell {
    /// group = 0, post = 0
    ControlBefore,
    /// group = 0, post = 1
    ControlAfter,
    /// group = 1, post = 0
    TreatedBefore,
    /// group = 1, post = 1
    TreatedAfter,
}

impl Cell {
    /// All cells in canonical order.
    pub const ALL: [Cell; 4] =
        [Cell::ControlBefore, Cell::ControlAfter, Cell::TreatedBefore, Cell::TreatedAfter];

    /// Cell for a (group, post) indicator pair. `None` if either is not 0/1.
    pub fn from_indicators(group: u8, post: u8) -> Option<Self> {
        match (group, post) {
            (0, 0) => Some(Cell::ControlBefore),
            (0, 1) => Some(Cell::ControlAfter),
            (1, 0) => Some(Cell::TreatedBefore),
            (1, 1) => Some(Cell::TreatedAfter),
            _ => None,
        }
    }

    /// Group indicator (0 = control, 1 = treated).
    pub fn group(self) -> u8 {
        match self {
            Cell::ControlBefore | Cell::ControlAfter => 0,
            Cell::TreatedBefore | Cell::TreatedAfter => 1,
        }
    }

    /// Post indicator (0 = before intervention, 1 = after).
    pub fn post(self) -> u8 {
        match self {
            Cell::ControlBefore | Cell::TreatedBefore => 0,
            Cell::ControlAfter | Cell::TreatedAfter => 1,
        }
    }

    /// Position in [`Cell::ALL`].
    pub fn index(self) -> usize {
        2 * self.group() as usize + self.post() as usize
    }

    /// Stable display name, e.g. `"treated-after"`.
    pub fn name(self) -> &'static str {
        match self {
            Cell::ControlBefore => "control-before",
            Cell::ControlAfter => "control-after",
            Cell::TreatedBefore => "treated-before",
            Cell::TreatedAfter => "treated-after",
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The four column names an analysis reads from a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSelection {
    /// Event date / period key. Display only.
    pub event_date: String,
    /// Numeric outcome.
    pub metric: String,
    /// Treatment group indicator (0 = control, 1 = treated).
    pub group: String,
    /// Post-intervention indicator (0 = before, 1 = after).
    pub post: String,
}

impl ColumnSelection {
    /// Create a selection from the four column names.
    pub fn new(
        event_date: impl Into<String>,
        metric: impl Into<String>,
        group: impl Into<String>,
        post: impl Into<String>,
    ) -> Self {
        Self {
            event_date: event_date.into(),
            metric: metric.into(),
            group: group.into(),
            post: post.into(),
        }
    }

    /// Model formula in `metric~group*post` notation.
    pub fn formula(&self) -> String {
        format!("{}~{}*{}", self.metric, self.group, self.post)
    }

    /// Columns in the order they are validated.
    pub fn columns(&self) -> [&str; 4] {
        [&self.event_date, &self.metric, &self.group, &self.post]
    }
}

/// Tunable analysis settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisOptions {
    /// Two-sided confidence level for coefficient intervals.
    pub confidence_level: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self { confidence_level: 0.95 }
    }
}

impl AnalysisOptions {
    /// Check that the options describe a valid analysis.
    pub fn validate(&self) -> Result<()> {
        let cl = self.confidence_level;
        if !(cl.is_finite() && cl > 0.0 && cl < 1.0) {
            return Err(Error::Validation(format!(
                "confidence_level must be in (0, 1), got {}",
                cl
            )));
        }
        Ok(())
    }

    /// Significance level `1 - confidence_level`.
    pub fn alpha(&self) -> f64 {
        1.0 - self.confidence_level
    }
}

/// Immutable description of one "run analysis" request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Column selection.
    pub selection: ColumnSelection,
    /// Analysis settings.
    #[serde(default)]
    pub options: AnalysisOptions,
}

impl AnalysisRequest {
    /// Request with default options.
    pub fn new(selection: ColumnSelection) -> Self {
        Self { selection, options: AnalysisOptions::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_indicator_roundtrip() {
        for cell in Cell::ALL {
            assert_eq!(Cell::from_indicators(cell.group(), cell.post()), Some(cell));
            assert_eq!(Cell::ALL[cell.index()], cell);
        }
        assert_eq!(Cell::from_indicators(2, 0), None);
    }

    #[test]
    fn test_cell_serializes_kebab_case() {
        let s = serde_json::to_string(&Cell::TreatedAfter).unwrap();
        assert_eq!(s, "\"treated-after\"");
    }

    #[test]
    fn test_formula() {
        let sel = ColumnSelection::new("week", "sales", "treated", "post");
        assert_eq!(sel.formula(), "sales~treated*post");
    }

    #[test]
    fn test_options_validation() {
        assert!(AnalysisOptions::default().validate().is_ok());
        assert!(AnalysisOptions { confidence_level: 1.0 }.validate().is_err());
        assert!(AnalysisOptions { confidence_level: f64::NAN }.validate().is_err());
        assert!((AnalysisOptions { confidence_level: 0.9 }.alpha() - 0.1).abs() < 1e-12);
    }
}
