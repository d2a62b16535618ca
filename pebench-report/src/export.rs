//! Metric exports: versioned JSON and a flat CSV.
//!
//! A `MetricsReport` captures every breakdown for a set of methods together
//! with the config and dataset fingerprint that produced it. Unknown schema
//! versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use pebench_core::{Dataset, MethodMetrics, MetricsConfig, MetricsEngine, Query, RunLevelMetrics};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audit::{drift_report, DriftRow};

pub const SCHEMA_VERSION: u32 = 1;

/// Run-level metrics of one method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodRunLevel {
    pub method: String,
    pub metrics: RunLevelMetrics,
}

/// Every reported statistic for a dataset, in one serializable bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub dataset_fingerprint: String,
    pub config: MetricsConfig,
    /// Overall metrics, one per method.
    pub methods: Vec<MethodMetrics>,
    /// One entry per (method, noise level).
    pub by_noise: Vec<MethodMetrics>,
    /// One entry per (method, system), all noise levels pooled.
    pub by_system: Vec<MethodMetrics>,
    pub run_level: Vec<MethodRunLevel>,
    pub drift: Vec<DriftRow>,
}

/// Compute the full report. Methods are evaluated in parallel; output order
/// follows `methods`.
pub fn build_report(engine: &MetricsEngine, dataset: &Dataset, methods: &[String]) -> MetricsReport {
    let per_method: Vec<_> = methods
        .par_iter()
        .map(|method| {
            let query = Query::method(method.as_str());
            let overall = engine.method_metrics(dataset, &query);
            let by_noise: Vec<MethodMetrics> = engine.by_noise(dataset, method).into_values().collect();
            let by_system: Vec<MethodMetrics> =
                engine.by_system(dataset, method, None).into_values().collect();
            let run_level = MethodRunLevel {
                method: method.clone(),
                metrics: engine.run_level(dataset, &query),
            };
            (overall, by_noise, by_system, run_level)
        })
        .collect();

    let mut report = MetricsReport {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        dataset_fingerprint: dataset.fingerprint(),
        config: engine.config().clone(),
        methods: Vec::with_capacity(methods.len()),
        by_noise: Vec::new(),
        by_system: Vec::new(),
        run_level: Vec::with_capacity(methods.len()),
        drift: drift_report(engine, dataset, methods),
    };
    for (overall, by_noise, by_system, run_level) in per_method {
        report.methods.push(overall);
        report.by_noise.extend(by_noise);
        report.by_system.extend(by_system);
        report.run_level.push(run_level);
    }

    info!(
        methods = report.methods.len(),
        partitions = report.by_noise.len() + report.by_system.len(),
        fingerprint = %report.dataset_fingerprint,
        "built metrics report"
    );
    report
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(report: &MetricsReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize MetricsReport to JSON")
}

/// Deserialize a `MetricsReport`, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<MetricsReport> {
    let report: MetricsReport =
        serde_json::from_str(json).context("failed to deserialize MetricsReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// One row per partition: overall, per noise level, per system.
///
/// Columns: method, noise, system, strategy, total_runs, success_count,
/// pool_size, median_error, mean_error, one column per threshold label,
/// mean_runtime, rejected. Missing statistics are empty cells.
pub fn export_csv(report: &MetricsReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header: Vec<String> = [
        "method",
        "noise",
        "system",
        "strategy",
        "total_runs",
        "success_count",
        "pool_size",
        "median_error",
        "mean_error",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(report.config.thresholds.iter().map(|t| t.label.clone()));
    header.push("mean_runtime".into());
    header.push("rejected".into());
    wtr.write_record(&header)?;

    let cell = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    let partitions = report
        .methods
        .iter()
        .chain(&report.by_noise)
        .chain(&report.by_system);
    for m in partitions {
        let mut record = vec![
            m.method.clone(),
            m.noise.map(|n| n.to_string()).unwrap_or_default(),
            m.system.clone().unwrap_or_default(),
            m.strategy.label().to_string(),
            m.total_runs.to_string(),
            m.success_count.to_string(),
            m.pool_size.to_string(),
            cell(m.median_error()),
            cell(m.mean_error()),
        ];
        record.extend(
            report
                .config
                .thresholds
                .iter()
                .map(|t| cell(m.success_rate(&t.label))),
        );
        record.push(cell(m.mean_runtime));
        record.push(m.rejected.len().to_string());
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Files ──────────────────────────────────────────────────────────

/// Write `metrics.json` and `metrics.csv` under `output_dir`.
pub fn save_report(report: &MetricsReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let json_path = output_dir.join("metrics.json");
    std::fs::write(&json_path, export_json(report)?)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    let csv_path = output_dir.join("metrics.csv");
    std::fs::write(&csv_path, export_csv(report)?)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;

    Ok(output_dir.to_path_buf())
}

/// Load `metrics.json` from a directory written by [`save_report`].
pub fn load_report(dir: &Path) -> Result<MetricsReport> {
    let path = dir.join("metrics.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
