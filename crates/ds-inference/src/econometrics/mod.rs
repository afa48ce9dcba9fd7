//! Econometrics & Causal Inference.
//!
//! This module provides:
//! - **Difference-in-Differences** (DiD): the canonical two-period / two-group
//!   estimator from cell means, the parallel-trends counterfactual, and the
//!   equivalent `metric ~ group * post` interaction regression.
//! - **OLS** via Householder QR with classical t/F inference.

/// Two-period DiD estimator.
pub mod did;
/// Least squares with classical inference.
pub mod ols;

pub use did::{
    CellMeans, CellValues, DidObservations, DidSummary, EstimationResult, InteractionModel,
    ModelTerm, SeriesSummary, TermRole, UndefinedReason, Variation, compute_cell_means,
    compute_did, fit_interaction_model, percent_change, run_analysis,
};
pub use ols::{OlsFit, OlsInference, TermInference, ols_inference, ols_qr};
