//! Table models and renderers.
//!
//! Every renderer reads from the same table models, and every model is built
//! from engine results (`MethodMetrics`, `RunLevelMetrics`). No renderer
//! computes a statistic of its own, so LaTeX and Markdown output of one query
//! always print the same numbers.

pub mod latex;
pub mod markdown;

use std::collections::BTreeMap;

use pebench_core::{AggregationStrategy, MethodMetrics, MetricsConfig, NoiseLevel, RunLevelMetrics};

use crate::config::ReportConfig;

/// Printed for a statistic with no data.
pub const NO_DATA: &str = "---";

// ─── Overall table ───────────────────────────────────────────────────

/// One numeric column of the overall table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Header without markup, e.g. `SR-10 (%)`.
    pub header: String,
    /// Decimal places used when rendering.
    pub precision: usize,
}

/// One method's row; values are already in display units (percent, seconds).
#[derive(Debug, Clone, PartialEq)]
pub struct OverallRow {
    pub method: String,
    pub display: String,
    pub values: Vec<Option<f64>>,
    /// Ids of runs the engine set aside as malformed.
    pub rejected: Vec<String>,
}

/// Success rates, median error and mean runtime per method.
#[derive(Debug, Clone, PartialEq)]
pub struct OverallTable {
    pub columns: Vec<Column>,
    pub rows: Vec<OverallRow>,
    /// Per-parameter (or per-run) value charged for a failed run.
    pub penalty: f64,
    pub strategy: AggregationStrategy,
}

impl OverallTable {
    /// Build from per-method metrics, in the order given.
    ///
    /// Columns follow `config.thresholds`; the caption reports the config's
    /// penalty and aggregation strategy.
    pub fn build(metrics: &[MethodMetrics], config: &MetricsConfig, report: &ReportConfig) -> Self {
        let thresholds = &config.thresholds;
        let mut columns: Vec<Column> = thresholds
            .iter()
            .map(|t| Column {
                header: format!("{} (%)", t.label),
                precision: 1,
            })
            .collect();
        columns.push(Column {
            header: "Median Error (%)".into(),
            precision: 2,
        });
        columns.push(Column {
            header: "Mean Time (s)".into(),
            precision: 1,
        });

        let rows = metrics
            .iter()
            .map(|m| {
                let mut values: Vec<Option<f64>> = thresholds
                    .iter()
                    .map(|t| m.success_rate(&t.label).map(to_percent))
                    .collect();
                values.push(m.median_error().map(to_percent));
                values.push(m.mean_runtime);
                OverallRow {
                    method: m.method.clone(),
                    display: report.method_name(&m.method).to_string(),
                    values,
                    rejected: m.rejected.iter().map(|r| r.id.clone()).collect(),
                }
            })
            .collect();

        Self {
            columns,
            rows,
            penalty: config.penalty,
            strategy: config.strategy,
        }
    }

    /// Index of the column with this plain header.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.header == header)
    }

    /// Row by display name.
    pub fn row(&self, display: &str) -> Option<&OverallRow> {
        self.rows.iter().find(|r| r.display == display)
    }
}

// ─── Noise table ─────────────────────────────────────────────────────

/// Median error (%) per method and noise level.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseTable {
    pub levels: Vec<NoiseLevel>,
    /// `(display name, median % per level)`.
    pub rows: Vec<(String, Vec<Option<f64>>)>,
    pub penalty: f64,
    pub strategy: AggregationStrategy,
}

impl NoiseTable {
    /// `by_noise` holds one engine breakdown per method, in row order.
    pub fn build(
        by_noise: &[(String, BTreeMap<NoiseLevel, MethodMetrics>)],
        config: &MetricsConfig,
        report: &ReportConfig,
    ) -> Self {
        let mut levels: Vec<NoiseLevel> = by_noise
            .iter()
            .flat_map(|(_, m)| m.keys().copied())
            .collect();
        levels.sort();
        levels.dedup();

        let rows = by_noise
            .iter()
            .map(|(method, breakdown)| {
                let values = levels
                    .iter()
                    .map(|l| {
                        breakdown
                            .get(l)
                            .and_then(MethodMetrics::median_error)
                            .map(to_percent)
                    })
                    .collect();
                (report.method_name(method).to_string(), values)
            })
            .collect();

        Self {
            levels,
            rows,
            penalty: config.penalty,
            strategy: config.strategy,
        }
    }
}

// ─── System table ────────────────────────────────────────────────────

/// Median error (%) per system and method at one noise level.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemTable {
    pub noise: Option<NoiseLevel>,
    pub methods: Vec<String>,
    /// `(system display name, median % per method)`.
    pub rows: Vec<(String, Vec<Option<f64>>)>,
}

impl SystemTable {
    pub fn build(
        noise: Option<NoiseLevel>,
        by_system: &[(String, BTreeMap<String, MethodMetrics>)],
        report: &ReportConfig,
    ) -> Self {
        let mut systems: Vec<&str> = by_system
            .iter()
            .flat_map(|(_, m)| m.keys().map(String::as_str))
            .collect();
        systems.sort_unstable();
        systems.dedup();

        let rows = systems
            .iter()
            .map(|system| {
                let values = by_system
                    .iter()
                    .map(|(_, breakdown)| {
                        breakdown
                            .get(*system)
                            .and_then(MethodMetrics::median_error)
                            .map(to_percent)
                    })
                    .collect();
                (report.system_name(system).to_string(), values)
            })
            .collect();

        Self {
            noise,
            methods: by_system
                .iter()
                .map(|(m, _)| report.method_name(m).to_string())
                .collect(),
            rows,
        }
    }
}

// ─── Run-level table ─────────────────────────────────────────────────

/// Success@x and worst-parameter error quantiles per method.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLevelTable {
    /// Threshold values in percent, in column order.
    pub thresholds: Vec<f64>,
    /// One row per method, in input order.
    pub rows: Vec<RunLevelRow>,
    pub penalty: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunLevelRow {
    pub display: String,
    pub success: Vec<Option<f64>>,
    pub median_max: Option<f64>,
    pub p90_max: Option<f64>,
}

impl RunLevelTable {
    pub fn build(
        metrics: &[(String, RunLevelMetrics)],
        config: &MetricsConfig,
        report: &ReportConfig,
    ) -> Self {
        let thresholds = &config.thresholds;
        let rows = metrics
            .iter()
            .map(|(method, m)| RunLevelRow {
                display: report.method_name(method).to_string(),
                success: thresholds
                    .iter()
                    .map(|t| {
                        m.success_rates
                            .iter()
                            .find(|s| s.label == t.label)
                            .map(|s| to_percent(s.rate))
                    })
                    .collect(),
                median_max: m.median_max_error.map(to_percent),
                p90_max: m.p90_max_error.map(to_percent),
            })
            .collect();

        Self {
            thresholds: thresholds.iter().map(|t| to_percent(t.value)).collect(),
            rows,
            penalty: config.penalty,
        }
    }
}

// ─── Formatting ──────────────────────────────────────────────────────

pub fn to_percent(fraction: f64) -> f64 {
    fraction * 100.0
}

/// Fixed-precision value, or `---` when missing.
pub fn format_value(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => NO_DATA.to_string(),
    }
}

/// Tiered formatting used by per-system tables: precision shrinks as the
/// error grows, and anything above 1000% collapses to `$>1000$`.
pub fn format_tiered(percent: Option<f64>) -> String {
    match percent {
        None => "N/A".to_string(),
        Some(v) if v > 1000.0 => "$>1000$".to_string(),
        Some(v) if v > 10.0 => format!("{v:.1}"),
        Some(v) if v > 0.1 => format!("{v:.2}"),
        Some(v) => format!("{v:.3}"),
    }
}

/// Penalty for captions: powers of ten as `$10^{k}$`, anything else as is.
pub fn format_penalty(penalty: f64) -> String {
    let exponent = penalty.log10().round();
    if penalty > 0.0 && 10f64.powi(exponent as i32) == penalty {
        format!("$10^{{{exponent:.0}}}$")
    } else {
        format!("{penalty}")
    }
}

/// Compact threshold label: 1.0 → "1", 12.5 → "12.5".
pub fn format_threshold(percent: f64) -> String {
    let rounded = (percent * 1e6).round() / 1e6;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded}")
    }
}
