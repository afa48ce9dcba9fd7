//! didstat CLI

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ds_core::{AnalysisOptions, AnalysisRequest, Cell, ColumnSelection};
use ds_inference::{EstimationResult, SampleDataConfig};
use ds_translate::Dataset;
use std::path::{Path, PathBuf};

mod analysis_spec;
mod report;

#[derive(Parser)]
#[command(name = "didstat")]
#[command(about = "didstat - Difference-in-Differences analysis of two-group, two-period data")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

/// Input dataset plus the four columns an analysis reads.
#[derive(Args, Debug, Clone)]
struct AnalysisArgs {
    /// Input dataset (.csv, .tsv, .txt, .parquet)
    #[arg(short, long)]
    input: PathBuf,

    /// Event date / period column (used for plotting only)
    #[arg(long)]
    event_date: String,

    /// Numeric outcome column
    #[arg(long)]
    metric: String,

    /// Treatment group indicator column (0 = control, 1 = treated)
    #[arg(long)]
    group: String,

    /// Post-intervention indicator column (0 = before, 1 = after)
    #[arg(long)]
    post: String,

    /// Two-sided confidence level for coefficient intervals
    #[arg(long, default_value = "0.95")]
    confidence_level: f64,
}

impl AnalysisArgs {
    fn request(&self) -> AnalysisRequest {
        AnalysisRequest {
            selection: ColumnSelection::new(
                self.event_date.as_str(),
                self.metric.as_str(),
                self.group.as_str(),
                self.post.as_str(),
            ),
            options: AnalysisOptions { confidence_level: self.confidence_level },
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "input": self.input,
            "event_date": self.event_date,
            "metric": self.metric,
            "group": self.group,
            "post": self.post,
            "confidence_level": self.confidence_level,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the DiD effect and the interaction regression
    Analyze {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write a reproducibility bundle into this (empty or new) directory.
        #[arg(long)]
        bundle: Option<PathBuf>,
    },

    /// Run an analysis described by a YAML spec (didstat_analysis_spec_v0)
    Run {
        /// Analysis spec file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Show the inferred schema and the first rows of a dataset
    Preview {
        /// Input dataset (.csv, .tsv, .txt, .parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// Number of rows to show
        #[arg(long, default_value = "10")]
        rows: usize,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a synthetic two-group weekly dataset with a known effect (CSV)
    SampleData {
        /// First week (YYYY-MM-DD)
        #[arg(long, default_value = "2024-01-01")]
        start_date: String,

        /// Number of weekly periods
        #[arg(long, default_value = "12")]
        periods: usize,

        /// Index of the first post-intervention week
        #[arg(long, default_value = "6")]
        intervention_period: usize,

        /// Rows per group per week
        #[arg(long, default_value = "1")]
        units_per_group: usize,

        /// Control-group level in week 0
        #[arg(long, default_value = "100.0")]
        baseline: f64,

        /// Treated minus control level difference
        #[arg(long, default_value = "20.0")]
        group_gap: f64,

        /// Common change per week
        #[arg(long, default_value = "1.5")]
        trend: f64,

        /// True treatment effect
        #[arg(long, default_value = "8.0")]
        effect: f64,

        /// Noise standard deviation
        #[arg(long, default_value = "2.0")]
        noise_sd: f64,

        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output CSV file. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Visualization artifacts (plot-friendly JSON)
    Viz {
        #[command(subcommand)]
        command: VizCommands,
    },

    /// Print version information
    Version,
}

#[derive(Subcommand)]
enum VizCommands {
    /// Raw metric over time, one series per group
    RawSeries {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Control / target / counterfactual chart at the two time points
    DidChart {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Coefficient table with plain-language explanations
    Coefficients {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// All artifacts in one document
    Report {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze { analysis, output, bundle } => {
            cmd_analyze(&analysis, output.as_ref(), bundle.as_deref())
        }
        Commands::Run { config } => cmd_run(&config),
        Commands::Preview { input, rows, output } => cmd_preview(&input, rows, output.as_ref()),
        Commands::SampleData {
            start_date,
            periods,
            intervention_period,
            units_per_group,
            baseline,
            group_gap,
            trend,
            effect,
            noise_sd,
            seed,
            output,
        } => {
            let config = SampleDataConfig {
                start_date,
                periods,
                intervention_period,
                units_per_group,
                baseline,
                group_gap,
                trend,
                effect,
                noise_sd,
                seed,
            };
            cmd_sample_data(&config, output.as_ref())
        }
        Commands::Viz { command } => match command {
            VizCommands::RawSeries { analysis, output } => {
                let ds = load_dataset(&analysis.input)?;
                let artifact = ds_viz::raw_series_artifact(&ds, &analysis.request().selection)?;
                write_json(output.as_ref(), serde_json::to_value(&artifact)?)
            }
            VizCommands::DidChart { analysis, output } => {
                let (_, result) = analyze(&analysis)?;
                let artifact = ds_viz::did_chart_artifact(&result)?;
                write_json(output.as_ref(), serde_json::to_value(&artifact)?)
            }
            VizCommands::Coefficients { analysis, output } => {
                let (_, result) = analyze(&analysis)?;
                let artifact = ds_viz::coefficient_table_artifact(&result)?;
                write_json(output.as_ref(), serde_json::to_value(&artifact)?)
            }
            VizCommands::Report { analysis, output } => {
                let (ds, result) = analyze(&analysis)?;
                let artifact = ds_viz::report_artifact(&ds, &result)?;
                write_json(output.as_ref(), serde_json::to_value(&artifact)?)
            }
        },
        Commands::Version => {
            println!("didstat {}", ds_core::VERSION);
            Ok(())
        }
    }
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    tracing::info!(path = %path.display(), "loading dataset");
    let ds = ds_translate::read_tabular_file(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    tracing::info!(rows = ds_core::Tabular::n_rows(&ds), "dataset loaded");
    Ok(ds)
}

fn estimate(ds: &Dataset, request: &AnalysisRequest) -> Result<EstimationResult> {
    tracing::info!(formula = %request.selection.formula(), "running analysis");
    let result = ds_inference::run_analysis(ds, request)?;
    for cell in Cell::ALL {
        tracing::debug!(
            cell = %cell,
            mean = result.cells.means.get(cell),
            n = result.cells.counts.get(cell),
            "cell mean"
        );
    }
    tracing::info!(
        did = result.did.did_estimate,
        n_obs = result.n_obs,
        n_dropped = result.n_dropped,
        "analysis complete"
    );
    Ok(result)
}

fn analyze(args: &AnalysisArgs) -> Result<(Dataset, EstimationResult)> {
    let ds = load_dataset(&args.input)?;
    let result = estimate(&ds, &args.request())?;
    Ok((ds, result))
}

fn cmd_analyze(args: &AnalysisArgs, output: Option<&PathBuf>, bundle: Option<&Path>) -> Result<()> {
    let (_, result) = analyze(args)?;
    let value = serde_json::to_value(&result)?;

    let mut created = CreatedPaths::default();
    if let Some(dir) = bundle {
        if dir.exists() {
            report::ensure_empty_dir(dir)?;
        }
        created.track_dir(dir);
        report::write_bundle(dir, "analyze", args.to_json(), &args.input, &[(
            "result.json",
            value.clone(),
        )])
        .with_context(|| format!("failed to write bundle {}", dir.display()))
        .inspect_err(|_| created.discard())?;
        tracing::info!(dir = %dir.display(), "bundle written");
    }

    write_json(output, value).inspect_err(|_| created.discard())
}

fn cmd_run(config: &Path) -> Result<()> {
    let spec = analysis_spec::read_analysis_spec(config)
        .with_context(|| format!("failed to read analysis spec {}", config.display()))?;
    let plan = spec.to_run_plan(config)?;

    let ds = load_dataset(&plan.input)?;
    let result = estimate(&ds, &plan.request)?;
    let result_value = serde_json::to_value(&result)?;

    // Build everything before touching the output dir.
    let mut files: Vec<(&str, serde_json::Value)> = Vec::new();
    if plan.write_result {
        files.push(("result.json", result_value.clone()));
    }
    if plan.write_artifacts {
        let sel = &plan.request.selection;
        files.push(("raw_series.json", serde_json::to_value(ds_viz::raw_series_artifact(&ds, sel)?)?));
        files.push(("did_chart.json", serde_json::to_value(ds_viz::did_chart_artifact(&result)?)?));
        files.push((
            "coefficients.json",
            serde_json::to_value(ds_viz::coefficient_table_artifact(&result)?)?,
        ));
    }

    let bundle_dir = plan.out_dir.join("bundle");
    if plan.write_bundle && bundle_dir.exists() {
        report::ensure_empty_dir(&bundle_dir)?;
    }

    // Everything this run creates is removed again if a later write fails.
    let mut created = CreatedPaths::default();
    if !plan.out_dir.exists() {
        created.track_dir(&plan.out_dir);
        std::fs::create_dir_all(&plan.out_dir)
            .with_context(|| format!("failed to create {}", plan.out_dir.display()))?;
    }
    let mut written = Vec::new();
    if let Err(e) = write_run_outputs(&plan, config, &files, &result_value, &mut created, &mut written) {
        created.discard();
        return Err(e);
    }
    tracing::info!(dir = %plan.out_dir.display(), files = written.len(), "run complete");

    write_json(
        None,
        serde_json::json!({
            "out_dir": plan.out_dir,
            "did_estimate": result.did.did_estimate,
            "written": written,
        }),
    )
}

/// Write the bundle, then the output files, recording each path as it is created.
fn write_run_outputs(
    plan: &analysis_spec::RunPlan,
    config: &Path,
    files: &[(&str, serde_json::Value)],
    result_value: &serde_json::Value,
    created: &mut CreatedPaths,
    written: &mut Vec<String>,
) -> Result<()> {
    if plan.write_bundle {
        let bundle_dir = plan.out_dir.join("bundle");
        created.track_dir(&bundle_dir);
        let args = serde_json::json!({ "config": config, "request": plan.request });
        report::write_bundle(&bundle_dir, "run", args, &plan.input, &[(
            "result.json",
            result_value.clone(),
        )])
        .with_context(|| format!("failed to write bundle {}", bundle_dir.display()))?;
        written.push(bundle_dir.display().to_string());
    }
    for (name, value) in files {
        let path = plan.out_dir.join(name);
        created.files.push(path.clone());
        std::fs::write(&path, serde_json::to_string_pretty(value)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path.display().to_string());
    }
    Ok(())
}

/// Outputs of a command that is still in progress.
#[derive(Debug, Default)]
struct CreatedPaths {
    dirs: Vec<PathBuf>,
    emptied: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

impl CreatedPaths {
    /// Track a directory about to be written. Must be missing or empty.
    fn track_dir(&mut self, dir: &Path) {
        if dir.exists() {
            self.emptied.push(dir.to_path_buf());
        } else {
            self.dirs.push(dir.to_path_buf());
        }
    }

    /// Best-effort removal; failures are logged, not returned.
    fn discard(&self) {
        let log = |path: &Path, res: std::io::Result<()>| {
            if let Err(e) = res {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove partial output");
                }
            }
        };
        for path in &self.files {
            if path.is_file() {
                log(path, std::fs::remove_file(path));
            }
        }
        for dir in &self.emptied {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    log(dir, Err(e));
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let res = if path.is_dir() {
                    std::fs::remove_dir_all(&path)
                } else {
                    std::fs::remove_file(&path)
                };
                log(&path, res);
            }
        }
        for dir in self.dirs.iter().rev() {
            log(dir, std::fs::remove_dir_all(dir));
        }
    }
}

fn cmd_preview(input: &Path, rows: usize, output: Option<&PathBuf>) -> Result<()> {
    let ds = load_dataset(input)?;
    let preview = ds.preview(rows)?;
    write_json(output, serde_json::to_value(&preview)?)
}

fn cmd_sample_data(config: &SampleDataConfig, output: Option<&PathBuf>) -> Result<()> {
    let records = ds_inference::generate_sample_dataset(config)?;
    tracing::info!(rows = records.len(), seed = config.seed, "sample data generated");

    let mut wtr = csv::Writer::from_writer(Vec::new());
    for r in &records {
        wtr.serialize(r)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush CSV writer: {}", e.error()))?;

    if let Some(path) = output {
        std::fs::write(path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;
    } else {
        use std::io::Write;
        std::io::stdout().write_all(&bytes)?;
    }
    Ok(())
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
