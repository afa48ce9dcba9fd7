//! Coefficient table with a plain-language reading of every term.

use ds_core::{AnalysisOptions, Result};
use ds_inference::{EstimationResult, ModelTerm, TermRole};
use serde::Serialize;

use crate::ArtifactMeta;

/// `didstat_coefficients_v0`.
#[derive(Debug, Clone, Serialize)]
pub struct CoefficientTableArtifact {
    /// Schema identifier.
    pub schema_version: String,
    /// Provenance.
    pub meta: ArtifactMeta,
    /// Model formula, e.g. `sales~treated*post`.
    pub formula: String,
    /// Confidence level of the intervals.
    pub confidence_level: f64,
    /// Significance threshold, `1 - confidence_level`.
    pub alpha: f64,
    /// Residual degrees of freedom.
    pub df_resid: usize,
    /// Design-matrix column order.
    pub rows: Vec<CoefficientRow>,
}

/// One coefficient.
#[derive(Debug, Clone, Serialize)]
pub struct CoefficientRow {
    /// Term label as shown in the formula.
    pub name: String,
    /// Structural role.
    pub role: TermRole,
    /// Point estimate.
    pub estimate: f64,
    /// Standard error. The inference fields are `null` with zero residual df.
    pub std_error: Option<f64>,
    /// t statistic.
    pub t_stat: Option<f64>,
    /// Two-sided p-value.
    pub p_value: Option<f64>,
    /// Lower interval bound.
    pub ci_lower: Option<f64>,
    /// Upper interval bound.
    pub ci_upper: Option<f64>,
    /// `p_value < alpha`.
    pub significant: Option<bool>,
    /// Reading of the row, one sentence per statistic.
    pub sentences: Vec<String>,
}

/// `0.95` -> `"95"`, `0.975` -> `"97.5"`.
fn percent_label(confidence_level: f64) -> String {
    let pct = (confidence_level * 100.0 * 100.0).round() / 100.0;
    if pct.fract() == 0.0 { format!("{:.0}", pct) } else { format!("{}", pct) }
}

fn estimate_sentence(term: &ModelTerm) -> String {
    let what = match term.role {
        TermRole::Intercept => "The base value when all other variables are zero is",
        TermRole::Group => "Before the intervention, the target group differs from the control group by",
        TermRole::Post => "After the intervention, the control group changes by",
        TermRole::Interaction => {
            "The difference-in-differences estimate of the intervention effect is"
        }
    };
    format!("{}: {} {:.4}.", term.name, what, term.estimate)
}

fn term_row(term: &ModelTerm, options: AnalysisOptions) -> CoefficientRow {
    let alpha = options.alpha();
    let mut sentences = vec![estimate_sentence(term)];

    let Some(inf) = term.inference else {
        sentences.push(
            "There are no residual degrees of freedom, so the uncertainty of this estimate \
             cannot be assessed."
                .to_string(),
        );
        return CoefficientRow {
            name: term.name.clone(),
            role: term.role,
            estimate: term.estimate,
            std_error: None,
            t_stat: None,
            p_value: None,
            ci_lower: None,
            ci_upper: None,
            significant: None,
            sentences,
        };
    };

    sentences.push(format!(
        "The standard error is {:.4}, which means the estimated value could vary by \
         approximately {} units.",
        inf.std_error,
        inf.std_error.round()
    ));
    match inf.p_value {
        Some(p) => {
            let verdict = if p < alpha { "is" } else { "is not" };
            sentences.push(format!(
                "The p-value is {:.3}, so the term {} statistically significant at the {} \
                 per cent level.",
                p,
                verdict,
                percent_label(alpha)
            ));
        }
        None => sentences.push(
            "The p-value is undefined because the standard error is zero.".to_string(),
        ),
    }
    sentences.push(format!(
        "We are {} per cent confident that the true value of {} falls between {:.4} and {:.4}.",
        percent_label(options.confidence_level),
        term.name,
        inf.ci_lower,
        inf.ci_upper
    ));

    CoefficientRow {
        name: term.name.clone(),
        role: term.role,
        estimate: term.estimate,
        std_error: Some(inf.std_error),
        t_stat: inf.t_stat,
        p_value: inf.p_value,
        ci_lower: Some(inf.ci_lower),
        ci_upper: Some(inf.ci_upper),
        significant: inf.p_value.map(|p| p < alpha),
        sentences,
    }
}

/// Build the coefficient table artifact from an estimation result.
pub fn coefficient_table_artifact(result: &EstimationResult) -> Result<CoefficientTableArtifact> {
    let model = &result.model;
    let options = AnalysisOptions { confidence_level: model.confidence_level };
    let rows = model.terms.iter().map(|t| term_row(t, options)).collect();

    Ok(CoefficientTableArtifact {
        schema_version: "didstat_coefficients_v0".to_string(),
        meta: ArtifactMeta::now()?,
        formula: model.formula.clone(),
        confidence_level: model.confidence_level,
        alpha: options.alpha(),
        df_resid: model.df_resid,
        rows,
    })
}
