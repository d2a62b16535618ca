//! pebench CLI: tables and checks over parameter-estimation benchmark results.
//!
//! Commands:
//! - `summary`: overall table (LaTeX or Markdown)
//! - `noise`: median error by noise level
//! - `systems`: median error per system, optionally at one noise level
//! - `run-level`: worst-parameter success rates and error quantiles
//! - `compare`: median under both aggregation strategies
//! - `audit`: recompute a rendered LaTeX table and report disagreeing cells
//! - `export`: JSON and CSV metric bundle

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pebench_core::{Dataset, MetricsConfig, MetricsEngine, NoiseLevel, Query};
use pebench_report::audit::{render_drift, render_findings, DEFAULT_TOLERANCE};
use pebench_report::tables::{latex, markdown};
use pebench_report::{
    audit_table, build_report, drift_report, load_csv, parse_latex_table, LoadOptions,
    NoiseTable, OverallTable, ReportConfig, RunLevelTable, SystemTable,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "pebench",
    about = "pebench: metrics for ODE parameter-estimation benchmarks"
)]
struct Cli {
    /// Benchmark results CSV.
    #[arg(long, global = true, default_value = "combined_results_filtered.csv")]
    data: PathBuf,

    /// Metrics config TOML (penalty, thresholds, cutoff). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report config TOML (method names and order, non-identifiable quantities).
    #[arg(long, global = true)]
    report_config: Option<PathBuf>,

    /// Debug-level logging.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Latex,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Overall success rates, median error and mean runtime per method.
    Summary {
        #[arg(long, value_enum, default_value_t = Format::Latex)]
        format: Format,

        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Median error per method and noise level.
    Noise {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Median error per system and method.
    Systems {
        /// Noise level to report (e.g. 0, 1e-6). All levels pooled when omitted.
        #[arg(long)]
        noise: Option<NoiseLevel>,

        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Worst-parameter (run-level) metrics per method.
    RunLevel {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Median under pooled-parameter and per-run-mean aggregation.
    Compare,
    /// Recompute a rendered LaTeX overall table and report disagreeing cells.
    Audit {
        /// The `.tex` table to check.
        #[arg(long)]
        table: PathBuf,

        /// Slack beyond print rounding, in display units.
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
    },
    /// Write metrics.json and metrics.csv.
    Export {
        /// Output directory.
        #[arg(long, default_value = "metrics")]
        out: PathBuf,
    },
}

/// Everything a command needs: the engine, the loaded data and the layout.
struct Session {
    engine: MetricsEngine,
    dataset: Dataset,
    report: ReportConfig,
    methods: Vec<String>,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => MetricsConfig::from_file(path)
                .with_context(|| format!("failed to load metrics config {}", path.display()))?,
            None => MetricsConfig::default(),
        };
        let report = match &cli.report_config {
            Some(path) => ReportConfig::from_file(path)
                .with_context(|| format!("failed to load report config {}", path.display()))?,
            None => ReportConfig::default(),
        };
        let engine = MetricsEngine::new(config).context("invalid metrics config")?;

        let loaded = load_csv(&cli.data, &LoadOptions::from(&report))
            .with_context(|| format!("failed to load {}", cli.data.display()))?;
        if loaded.dataset.is_empty() {
            bail!("no usable rows in {}", cli.data.display());
        }
        let methods = report.ordered_methods(&loaded.dataset.methods());
        if methods.is_empty() {
            bail!("none of the configured methods appear in {}", cli.data.display());
        }

        let session = Self {
            engine,
            dataset: loaded.dataset,
            report,
            methods,
        };
        session.warn_rejected();
        Ok(session)
    }

    /// Runs that loaded but failed the engine's checks are left out of every
    /// table. Say which ones, once per method.
    fn warn_rejected(&self) {
        for method in &self.methods {
            let metrics = self
                .engine
                .method_metrics(&self.dataset, &Query::method(method.as_str()));
            if metrics.rejected.is_empty() {
                continue;
            }
            let ids: Vec<&str> = metrics.rejected.iter().map(|r| r.id.as_str()).collect();
            warn!(
                method = %method,
                count = ids.len(),
                ids = %ids.join(", "),
                "runs rejected as malformed"
            );
        }
    }

    fn overall_table(&self) -> OverallTable {
        let metrics: Vec<_> = self
            .methods
            .iter()
            .map(|m| self.engine.method_metrics(&self.dataset, &Query::method(m.as_str())))
            .collect();
        OverallTable::build(&metrics, self.engine.config(), &self.report)
    }

    fn noise_table(&self) -> NoiseTable {
        let by_noise: Vec<_> = self
            .methods
            .iter()
            .map(|m| (m.clone(), self.engine.by_noise(&self.dataset, m)))
            .collect();
        NoiseTable::build(&by_noise, self.engine.config(), &self.report)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "pebench=debug" } else { "pebench=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(level.parse()?)
                .add_directive("warn".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let session = Session::open(&cli)?;

    match cli.command {
        Commands::Summary { format, out } => run_summary(&session, format, out.as_deref()),
        Commands::Noise { out } => emit(&latex::noise_table(&session.noise_table()), out.as_deref()),
        Commands::Systems { noise, out } => run_systems(&session, noise, out.as_deref()),
        Commands::RunLevel { out } => run_run_level(&session, out.as_deref()),
        Commands::Compare => {
            let rows = drift_report(&session.engine, &session.dataset, &session.methods);
            emit(&render_drift(&rows, &session.report), None)
        }
        Commands::Audit { table, tolerance } => run_audit(&session, &table, tolerance),
        Commands::Export { out } => run_export(&session, &out),
    }
}

/// Print to stdout, or write to `out` when given.
fn emit(text: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote table");
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn run_summary(session: &Session, format: Format, out: Option<&Path>) -> Result<()> {
    let table = session.overall_table();
    let text = match format {
        Format::Latex => latex::overall_table(&table),
        Format::Markdown => markdown::summary(
            &table,
            Some(&session.noise_table()),
            &session.dataset.fingerprint(),
        ),
    };
    emit(&text, out)
}

fn run_systems(session: &Session, noise: Option<NoiseLevel>, out: Option<&Path>) -> Result<()> {
    let by_system: Vec<_> = session
        .methods
        .iter()
        .map(|m| (m.clone(), session.engine.by_system(&session.dataset, m, noise)))
        .collect();
    if by_system.iter().all(|(_, b)| b.is_empty()) {
        match noise {
            Some(level) => bail!("no runs at noise level {level}"),
            None => bail!("no runs for the configured methods"),
        }
    }
    let table = SystemTable::build(noise, &by_system, &session.report);
    emit(&latex::system_table(&table), out)
}

fn run_run_level(session: &Session, out: Option<&Path>) -> Result<()> {
    let metrics: Vec<_> = session
        .methods
        .iter()
        .map(|m| {
            let rl = session
                .engine
                .run_level(&session.dataset, &Query::method(m.as_str()));
            (m.clone(), rl)
        })
        .collect();
    let table = RunLevelTable::build(&metrics, session.engine.config(), &session.report);
    emit(&latex::run_level_table(&table), out)
}

fn run_audit(session: &Session, table_path: &Path, tolerance: f64) -> Result<()> {
    let tex = std::fs::read_to_string(table_path)
        .with_context(|| format!("failed to read {}", table_path.display()))?;
    let parsed = parse_latex_table(&tex)
        .with_context(|| format!("failed to parse {}", table_path.display()))?;
    let findings = audit_table(&parsed, &session.overall_table(), tolerance);
    print!("{}", render_findings(&findings));
    if !findings.is_empty() {
        bail!(
            "{} cell(s) in {} disagree with the recomputed metrics",
            findings.len(),
            table_path.display()
        );
    }
    Ok(())
}

fn run_export(session: &Session, out: &Path) -> Result<()> {
    let report = build_report(&session.engine, &session.dataset, &session.methods);
    let dir = pebench_report::export::save_report(&report, out)?;
    println!("Metrics saved to: {}", dir.display());
    Ok(())
}
