//! Analysis spec v0 (YAML) parsing + semantic validation.
//!
//! A single YAML file names the input dataset, the four columns and the
//! outputs to write, so an analysis can be re-run without retyping flags.

use anyhow::Result;
use ds_core::{AnalysisOptions, AnalysisRequest, ColumnSelection};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const SPEC_V0: &str = "didstat_analysis_spec_v0";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisSpecV0 {
    #[allow(dead_code)]
    pub schema_version: String,
    pub input: PathBuf,
    pub columns: ColumnSelection,
    #[serde(default)]
    pub options: AnalysisOptions,
    #[serde(default)]
    pub outputs: Outputs,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Outputs {
    pub dir: PathBuf,
    pub result: bool,
    pub artifacts: bool,
    pub bundle: bool,
}

impl Default for Outputs {
    fn default() -> Self {
        Self { dir: PathBuf::from("out"), result: true, artifacts: false, bundle: false }
    }
}

/// Fully resolved work for `didstat run`.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub input: PathBuf,
    pub request: AnalysisRequest,
    pub out_dir: PathBuf,
    pub write_result: bool,
    pub write_artifacts: bool,
    pub write_bundle: bool,
}

pub fn read_analysis_spec(path: &Path) -> Result<AnalysisSpecV0> {
    let bytes = std::fs::read(path)?;

    // Check the version first so an old/foreign file gets a clear message
    // instead of an unknown-field error.
    let header: serde_yaml_ng::Value = serde_yaml_ng::from_slice(&bytes)?;
    let schema_version = header.get("schema_version").and_then(|v| v.as_str());
    match schema_version {
        Some(SPEC_V0) => {}
        Some(other) => anyhow::bail!(
            "unsupported schema_version '{}' (expected '{}')",
            other,
            SPEC_V0
        ),
        None => anyhow::bail!("missing schema_version (expected '{}')", SPEC_V0),
    }

    let spec: AnalysisSpecV0 = serde_yaml_ng::from_slice(&bytes)?;
    Ok(spec)
}

fn resolve_path(base_dir: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() { p.to_path_buf() } else { base_dir.join(p) }
}

impl AnalysisSpecV0 {
    /// Validate and resolve paths relative to the spec file's directory.
    pub fn to_run_plan(&self, spec_path: &Path) -> Result<RunPlan> {
        let base_dir = spec_path.parent().unwrap_or_else(|| Path::new("."));

        for (field, value) in [
            ("columns.event_date", &self.columns.event_date),
            ("columns.metric", &self.columns.metric),
            ("columns.group", &self.columns.group),
            ("columns.post", &self.columns.post),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{} must be non-empty", field);
            }
        }
        self.options.validate()?;

        let o = &self.outputs;
        if !(o.result || o.artifacts || o.bundle) {
            anyhow::bail!("outputs: at least one of result/artifacts/bundle must be true");
        }

        let input = resolve_path(base_dir, &self.input);
        if !input.is_file() {
            anyhow::bail!("input not found: {}", input.display());
        }

        Ok(RunPlan {
            input,
            request: AnalysisRequest {
                selection: self.columns.clone(),
                options: self.options,
            },
            out_dir: resolve_path(base_dir, &o.dir),
            write_result: o.result,
            write_artifacts: o.artifacts,
            write_bundle: o.bundle,
        })
    }
}
