//! Run-level (worst-parameter) metrics.
//!
//! Each run is first reduced to its own max/median/mean parameter error, then
//! statistics are taken across runs. A run succeeds at threshold T only when
//! every one of its parameters is below T.

use serde::{Deserialize, Serialize};

use crate::config::MetricsConfig;
use crate::domain::{ExperimentRun, NoiseLevel};
use crate::engine::SuccessRate;
use crate::error_calc::parameter_errors;
use crate::stats;
use crate::validate::{validate_run, RejectedRecord};

/// Per-run reduction of its parameter errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: String,
    pub system: String,
    pub noise: NoiseLevel,
    pub max_error: f64,
    pub median_error: f64,
    pub mean_error: f64,
    /// No estimate, or no comparable keys. All error fields hold the penalty.
    pub failed: bool,
}

/// Statistics across the run summaries of one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLevelMetrics {
    pub runs: Vec<RunSummary>,
    /// Fraction of runs whose worst parameter is strictly below each threshold.
    pub success_rates: Vec<SuccessRate>,
    pub median_max_error: Option<f64>,
    pub p90_max_error: Option<f64>,
    pub failed_count: usize,
    pub rejected: Vec<RejectedRecord>,
}

impl RunLevelMetrics {
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Reduce one validated run to its summary.
pub fn summarize_run(run: &ExperimentRun, config: &MetricsConfig) -> RunSummary {
    let errors = if run.has_result {
        parameter_errors(run, config.zero_cutoff)
    } else {
        Vec::new()
    };

    match (stats::max(&errors), stats::median(&errors), stats::mean(&errors)) {
        (Some(max_error), Some(median_error), Some(mean_error)) => RunSummary {
            id: run.id.clone(),
            system: run.system.clone(),
            noise: run.noise,
            max_error,
            median_error,
            mean_error,
            failed: false,
        },
        _ => RunSummary {
            id: run.id.clone(),
            system: run.system.clone(),
            noise: run.noise,
            max_error: config.penalty,
            median_error: config.penalty,
            mean_error: config.penalty,
            failed: true,
        },
    }
}

/// Summarize every valid run and aggregate across them.
pub fn run_level_metrics<'a, I>(runs: I, config: &MetricsConfig) -> RunLevelMetrics
where
    I: IntoIterator<Item = &'a ExperimentRun>,
{
    let mut summaries = Vec::new();
    let mut rejected = Vec::new();
    for run in runs {
        match validate_run(run) {
            Ok(()) => summaries.push(summarize_run(run, config)),
            Err(reason) => rejected.push(RejectedRecord {
                id: run.id.clone(),
                reason,
            }),
        }
    }

    let max_errors: Vec<f64> = summaries.iter().map(|s| s.max_error).collect();
    let success_rates = if max_errors.is_empty() {
        Vec::new()
    } else {
        config
            .thresholds
            .iter()
            .filter_map(|t| {
                stats::success_rate(&max_errors, t.value).map(|rate| SuccessRate {
                    label: t.label.clone(),
                    threshold: t.value,
                    rate,
                })
            })
            .collect()
    };

    RunLevelMetrics {
        success_rates,
        median_max_error: stats::median(&max_errors),
        p90_max_error: stats::percentile(&max_errors, 90.0),
        failed_count: summaries.iter().filter(|s| s.failed).count(),
        runs: summaries,
        rejected,
    }
}
