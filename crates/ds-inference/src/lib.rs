//! # ds-inference
//!
//! Statistical inference for didstat.
//!
//! This crate provides:
//! - Cell means, DiD estimate and counterfactual trajectory
//! - The `metric ~ group * post` interaction regression with t-based
//!   confidence intervals
//! - A deterministic synthetic dataset generator for demos and tests
//!
//! ## Architecture
//!
//! The estimator reads data through the `Tabular` trait from ds-core, NOT
//! through a concrete file format. Arrow/CSV handling lives in ds-translate.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Difference-in-Differences and OLS.
pub mod econometrics;
/// Synthetic two-period DiD datasets.
pub mod sample;

pub use econometrics::{
    CellMeans, DidSummary, EstimationResult, InteractionModel, ModelTerm, TermRole, Variation,
    compute_cell_means, compute_did, fit_interaction_model, run_analysis,
};
pub use sample::{SampleDataConfig, SampleRecord, generate_sample_dataset};
