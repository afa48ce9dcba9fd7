//! Canonical two-period / two-group Difference-in-Differences.
//!
//! ATT = (Ȳ_treat,post − Ȳ_treat,pre) − (Ȳ_ctrl,post − Ȳ_ctrl,pre), estimated
//! both from the four cell means and from the interaction regression
//! `y = β₀ + β₁·group + β₂·post + β₃·(group×post) + ε`. The model is
//! saturated, so β₃ reproduces the cell-mean estimate exactly.
//!
//! # References
//!
//! - Angrist & Pischke, *Mostly Harmless Econometrics*, Ch. 5.
//! - Facure, *Causal Inference for the Brave and True*, Ch. 13.

use ds_core::{AnalysisOptions, AnalysisRequest, Cell, ColumnSelection, Error, Result, Tabular};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::ols::{TermInference, ols_inference, ols_qr};

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

/// Row-aligned view of the three analysis columns.
#[derive(Debug, Clone)]
pub struct DidObservations {
    /// Metric per row; `None` if missing or non-numeric.
    pub metric: Vec<Option<f64>>,
    /// Cell per row; `None` if the group or post indicator is missing.
    pub cells: Vec<Option<Cell>>,
}

impl DidObservations {
    /// Read and validate the metric, group and post columns.
    ///
    /// Fails with [`Error::MissingColumn`] for an absent column and
    /// [`Error::InvalidIndicator`] for a group/post value outside {0, 1}.
    pub fn from_table(data: &dyn Tabular, sel: &ColumnSelection) -> Result<Self> {
        let metric = data.numeric_column(&sel.metric)?;
        let group = data.numeric_column(&sel.group)?;
        let post = data.numeric_column(&sel.post)?;

        let mut cells = Vec::with_capacity(metric.len());
        for (row, (g, p)) in group.iter().zip(&post).enumerate() {
            let g = indicator(&sel.group, row, *g)?;
            let p = indicator(&sel.post, row, *p)?;
            cells.push(match (g, p) {
                (Some(g), Some(p)) => Cell::from_indicators(g, p),
                _ => None,
            });
        }

        Ok(Self { metric, cells })
    }

    /// Rows usable by the estimator: a known cell and a numeric metric.
    pub fn usable(&self) -> impl Iterator<Item = (Cell, f64)> + '_ {
        self.cells.iter().zip(&self.metric).filter_map(|(c, y)| Some(((*c)?, (*y)?)))
    }

    /// Number of rows in the source table.
    pub fn n_rows(&self) -> usize {
        self.metric.len()
    }

    /// Usable rows per cell.
    pub fn cell_counts(&self) -> CellValues<usize> {
        let mut counts = CellValues::splat(0usize);
        for (cell, _) in self.usable() {
            *counts.get_mut(cell) += 1;
        }
        counts
    }
}

fn indicator(column: &str, row: usize, value: Option<f64>) -> Result<Option<u8>> {
    match value {
        None => Ok(None),
        Some(v) if v == 0.0 => Ok(Some(0)),
        Some(v) if v == 1.0 => Ok(Some(1)),
        Some(value) => Err(Error::InvalidIndicator { column: column.to_string(), row, value }),
    }
}

// ---------------------------------------------------------------------------
// Cell means
// ---------------------------------------------------------------------------

/// One value per (group, post) cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellValues<T> {
    /// group = 0, post = 0
    pub control_before: T,
    /// group = 0, post = 1
    pub control_after: T,
    /// group = 1, post = 0
    pub treated_before: T,
    /// group = 1, post = 1
    pub treated_after: T,
}

impl<T: Copy> CellValues<T> {
    /// Same value in every cell.
    pub fn splat(v: T) -> Self {
        Self { control_before: v, control_after: v, treated_before: v, treated_after: v }
    }

    /// Value for one cell.
    pub fn get(&self, cell: Cell) -> T {
        match cell {
            Cell::ControlBefore => self.control_before,
            Cell::ControlAfter => self.control_after,
            Cell::TreatedBefore => self.treated_before,
            Cell::TreatedAfter => self.treated_after,
        }
    }

    fn get_mut(&mut self, cell: Cell) -> &mut T {
        match cell {
            Cell::ControlBefore => &mut self.control_before,
            Cell::ControlAfter => &mut self.control_after,
            Cell::TreatedBefore => &mut self.treated_before,
            Cell::TreatedAfter => &mut self.treated_after,
        }
    }
}

/// Arithmetic means of the metric in each cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellMeans {
    /// Mean metric per cell.
    pub means: CellValues<f64>,
    /// Rows contributing to each mean.
    pub counts: CellValues<usize>,
}

/// Neumaier-compensated running sum.
#[derive(Debug, Clone, Copy, Default)]
struct CompensatedSum {
    sum: f64,
    c: f64,
}

impl CompensatedSum {
    fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.c += (self.sum - t) + x;
        } else {
            self.c += (x - t) + self.sum;
        }
        self.sum = t;
    }

    fn value(&self) -> f64 {
        self.sum + self.c
    }
}

/// Cell means from pre-validated observations.
///
/// Fails with [`Error::EmptyCell`] naming the first empty cell in canonical order.
pub fn cell_means_from_observations(obs: &DidObservations) -> Result<CellMeans> {
    let mut sums = CellValues::splat(CompensatedSum::default());
    let mut counts = CellValues::splat(0usize);
    for (cell, y) in obs.usable() {
        sums.get_mut(cell).add(y);
        *counts.get_mut(cell) += 1;
    }

    if let Some(cell) = Cell::ALL.into_iter().find(|&c| counts.get(c) == 0) {
        return Err(Error::EmptyCell { cell });
    }

    let mean = |c: Cell| sums.get(c).value() / counts.get(c) as f64;
    Ok(CellMeans {
        means: CellValues {
            control_before: mean(Cell::ControlBefore),
            control_after: mean(Cell::ControlAfter),
            treated_before: mean(Cell::TreatedBefore),
            treated_after: mean(Cell::TreatedAfter),
        },
        counts,
    })
}

/// Mean metric in each (group, post) cell of `data`.
///
/// Rows with a missing metric only drop out of their own cell; rows with a
/// missing indicator drop out of every cell.
pub fn compute_cell_means(data: &dyn Tabular, sel: &ColumnSelection) -> Result<CellMeans> {
    let obs = DidObservations::from_table(data, sel)?;
    cell_means_from_observations(&obs)
}

// ---------------------------------------------------------------------------
// DiD arithmetic
// ---------------------------------------------------------------------------

/// Why a percentage variation could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// The `before` value is exactly 0.
    ZeroBaseline,
}

/// Percentage change of a series between the two periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Variation {
    /// `(after - before) / before * 100`.
    Defined {
        /// Percentage change.
        percent: f64,
    },
    /// No finite percentage exists.
    Undefined {
        /// Cause.
        reason: UndefinedReason,
    },
}

impl Variation {
    /// The percentage, if defined.
    pub fn percent(&self) -> Option<f64> {
        match self {
            Variation::Defined { percent } => Some(*percent),
            Variation::Undefined { .. } => None,
        }
    }
}

/// `(after - before) / before * 100`, failing with [`Error::DivideByZero`]
/// when `before` is 0.
pub fn percent_change(series: &str, before: f64, after: f64) -> Result<f64> {
    if before == 0.0 {
        return Err(Error::DivideByZero { series: series.to_string() });
    }
    Ok((after - before) / before * 100.0)
}

fn variation(series: &str, before: f64, after: f64) -> Variation {
    match percent_change(series, before, after) {
        Ok(percent) => Variation::Defined { percent },
        Err(_) => Variation::Undefined { reason: UndefinedReason::ZeroBaseline },
    }
}

/// Before/after values of one plotted series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    /// Pre-intervention value.
    pub before: f64,
    /// Post-intervention value.
    pub after: f64,
    /// Percentage change.
    pub variation: Variation,
}

impl SeriesSummary {
    fn new(name: &str, before: f64, after: f64) -> Self {
        Self { before, after, variation: variation(name, before, after) }
    }
}

/// Naive DiD estimate and the parallel-trends counterfactual.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DidSummary {
    /// Mean metric: control, pre.
    pub control_before: f64,
    /// Mean metric: control, post.
    pub control_after: f64,
    /// Mean metric: treated, pre.
    pub treated_before: f64,
    /// Mean metric: treated, post.
    pub treated_after: f64,
    /// `control_after - control_before`.
    pub control_delta: f64,
    /// `treated_after - treated_before`.
    pub treated_delta: f64,
    /// `treated_before + control_delta`.
    pub counterfactual_after: f64,
    /// `treated_delta - control_delta`.
    pub did_estimate: f64,
    /// Control group series.
    pub control: SeriesSummary,
    /// Treated (target) group series.
    pub treated: SeriesSummary,
    /// Counterfactual series for the treated group.
    pub counterfactual: SeriesSummary,
}

/// DiD arithmetic over four cell means. Never fails; zero baselines yield
/// [`Variation::Undefined`].
pub fn compute_did(
    control_before: f64,
    control_after: f64,
    treated_before: f64,
    treated_after: f64,
) -> DidSummary {
    let control_delta = control_after - control_before;
    let treated_delta = treated_after - treated_before;
    let counterfactual_after = treated_before + control_delta;

    DidSummary {
        control_before,
        control_after,
        treated_before,
        treated_after,
        control_delta,
        treated_delta,
        counterfactual_after,
        did_estimate: treated_delta - control_delta,
        control: SeriesSummary::new("control", control_before, control_after),
        treated: SeriesSummary::new("treated", treated_before, treated_after),
        counterfactual: SeriesSummary::new("counterfactual", treated_before, counterfactual_after),
    }
}

impl From<&CellMeans> for DidSummary {
    fn from(cm: &CellMeans) -> Self {
        let m = &cm.means;
        compute_did(m.control_before, m.control_after, m.treated_before, m.treated_after)
    }
}

// ---------------------------------------------------------------------------
// Interaction regression
// ---------------------------------------------------------------------------

/// Role of a term in `metric ~ group * post`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermRole {
    /// β₀: control-group pre-period mean.
    Intercept,
    /// β₁: treated − control gap in the pre period.
    Group,
    /// β₂: common time trend.
    Post,
    /// β₃: DiD treatment effect.
    Interaction,
}

impl TermRole {
    /// Terms in design-matrix column order.
    pub const ALL: [TermRole; 4] =
        [TermRole::Intercept, TermRole::Group, TermRole::Post, TermRole::Interaction];

    fn index(self) -> usize {
        self as usize
    }
}

/// One row of the coefficient table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTerm {
    /// Formula-style name: `Intercept`, `<group>`, `<post>`, `<group>:<post>`.
    pub name: String,
    /// What the coefficient measures.
    pub role: TermRole,
    /// Point estimate.
    pub estimate: f64,
    /// Standard error, t, p and confidence bounds. `None` when `df_resid == 0`.
    pub inference: Option<TermInference>,
}

/// OLS fit of `metric = β₀ + β₁·group + β₂·post + β₃·(group×post) + ε`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionModel {
    /// `metric~group*post`.
    pub formula: String,
    /// Intercept, group, post, interaction, in that order.
    pub terms: Vec<ModelTerm>,
    /// Observations used.
    pub n_obs: usize,
    /// `n_obs - 4`.
    pub df_resid: usize,
    /// Confidence level of the term intervals.
    pub confidence_level: f64,
    /// Residual sum of squares.
    pub rss: f64,
    /// `sqrt(rss / df_resid)`.
    pub residual_std_error: Option<f64>,
    /// R².
    pub r_squared: Option<f64>,
    /// Adjusted R².
    pub adj_r_squared: Option<f64>,
    /// Joint F-test of group, post and interaction.
    pub f_statistic: Option<f64>,
    /// p-value of the F-test.
    pub f_p_value: Option<f64>,
}

impl InteractionModel {
    /// Term by role. `None` if a deserialized model lacks it.
    pub fn term(&self, role: TermRole) -> Option<&ModelTerm> {
        self.terms.iter().find(|t| t.role == role)
    }

    /// The group×post term (the DiD estimate).
    pub fn interaction(&self) -> Option<&ModelTerm> {
        self.term(TermRole::Interaction)
    }
}

/// Fit the interaction model from pre-validated observations.
pub fn fit_from_observations(
    obs: &DidObservations,
    sel: &ColumnSelection,
    options: &AnalysisOptions,
) -> Result<InteractionModel> {
    options.validate()?;

    // An empty cell makes group×post collinear with the main effects; catch
    // it here instead of inside the factorisation.
    let counts = obs.cell_counts();
    if let Some(cell) = Cell::ALL.into_iter().find(|&c| counts.get(c) == 0) {
        return Err(Error::SingularDesign(format!(
            "cell {} has no observations, so {}:{} is collinear with the main effects",
            cell, sel.group, sel.post
        )));
    }

    let k = TermRole::ALL.len();
    let mut x_data = Vec::with_capacity(obs.n_rows() * k);
    let mut y_data = Vec::with_capacity(obs.n_rows());
    for (cell, y) in obs.usable() {
        let d = cell.group() as f64;
        let p = cell.post() as f64;
        x_data.extend_from_slice(&[1.0, d, p, d * p]);
        y_data.push(y);
    }
    let n = y_data.len();

    let x_mat = DMatrix::from_row_slice(n, k, &x_data);
    let y_vec = DVector::from_vec(y_data);
    let fit = ols_qr(&x_mat, &y_vec)?;
    let inf = ols_inference(&fit, options.confidence_level)?;

    let names = [
        "Intercept".to_string(),
        sel.group.clone(),
        sel.post.clone(),
        format!("{}:{}", sel.group, sel.post),
    ];
    let terms = TermRole::ALL
        .into_iter()
        .zip(names)
        .map(|(role, name)| ModelTerm {
            name,
            role,
            estimate: fit.coefficients[role.index()],
            inference: inf.terms[role.index()],
        })
        .collect();

    Ok(InteractionModel {
        formula: sel.formula(),
        terms,
        n_obs: fit.n_obs,
        df_resid: fit.df_resid,
        confidence_level: options.confidence_level,
        rss: fit.rss,
        residual_std_error: inf.residual_std_error,
        r_squared: inf.r_squared,
        adj_r_squared: inf.adj_r_squared,
        f_statistic: inf.f_statistic,
        f_p_value: inf.f_p_value,
    })
}

/// OLS of `metric ~ group * post` over rows with a numeric metric and known
/// indicators.
///
/// Fails with [`Error::SingularDesign`] when any cell is empty.
pub fn fit_interaction_model(
    data: &dyn Tabular,
    sel: &ColumnSelection,
    options: &AnalysisOptions,
) -> Result<InteractionModel> {
    let obs = DidObservations::from_table(data, sel)?;
    fit_from_observations(&obs, sel, options)
}

// ---------------------------------------------------------------------------
// End-to-end
// ---------------------------------------------------------------------------

/// Everything one "run analysis" request produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    /// Columns the analysis read.
    pub selection: ColumnSelection,
    /// `metric~group*post`.
    pub formula: String,
    /// Rows in the input table.
    pub n_rows: usize,
    /// Rows used (numeric metric and known indicators).
    pub n_obs: usize,
    /// `n_rows - n_obs`.
    pub n_dropped: usize,
    /// Cell means and counts.
    pub cells: CellMeans,
    /// DiD arithmetic and counterfactual.
    pub did: DidSummary,
    /// Interaction regression.
    pub model: InteractionModel,
}

/// Run the full two-period DiD analysis for one request.
///
/// All four selected columns (including the display-only event-date column)
/// must exist; the first absent one is reported as [`Error::MissingColumn`].
pub fn run_analysis(data: &dyn Tabular, request: &AnalysisRequest) -> Result<EstimationResult> {
    let sel = &request.selection;
    request.options.validate()?;
    if let Some(missing) = sel.columns().into_iter().find(|c| !data.has_column(c)) {
        return Err(Error::MissingColumn { column: missing.to_string() });
    }

    let obs = DidObservations::from_table(data, sel)?;
    let cells = cell_means_from_observations(&obs)?;
    let did = DidSummary::from(&cells);
    let model = fit_from_observations(&obs, sel, &request.options)?;

    let n_rows = obs.n_rows();
    let n_obs = model.n_obs;
    Ok(EstimationResult {
        selection: sel.clone(),
        formula: sel.formula(),
        n_rows,
        n_obs,
        n_dropped: n_rows - n_obs,
        cells,
        did,
        model,
    })
}
