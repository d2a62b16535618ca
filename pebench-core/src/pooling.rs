//! Error pooling: turns a set of runs into one flat error distribution.
//!
//! Two historical aggregation strategies exist for the same tables. They are
//! modeled as variants of one enum so tests can pin the authoritative one
//! (`PooledParameter`) and detect drift between consumers.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MetricsConfig;
use crate::domain::ExperimentRun;
use crate::error_calc::parameter_errors;
use crate::stats;
use crate::validate::{validate_run, RejectedRecord};

/// How per-parameter errors are combined into the distribution that the
/// summary statistics are computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStrategy {
    /// One value per (run, parameter). A failed run contributes the penalty
    /// once per expected parameter, so a failed 13-parameter system weighs
    /// 13 times as much as a failed 1-parameter system.
    #[default]
    PooledParameter,
    /// One value per run: the mean of its parameter errors. A failed run, or
    /// one with no comparable keys, contributes a single penalty.
    PerRunMean,
}

/// Flat error distribution plus the runs that were skipped building it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorPool {
    pub errors: Vec<f64>,
    pub rejected: Vec<RejectedRecord>,
    /// Runs that passed validation and contributed to `errors`.
    pub runs_included: usize,
}

impl ErrorPool {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn rejected_ids(&self) -> Vec<&str> {
        self.rejected.iter().map(|r| r.id.as_str()).collect()
    }
}

impl AggregationStrategy {
    pub const ALL: [AggregationStrategy; 2] = [Self::PooledParameter, Self::PerRunMean];

    pub fn label(&self) -> &'static str {
        match self {
            Self::PooledParameter => "pooled_parameter",
            Self::PerRunMean => "per_run_mean",
        }
    }

    /// Build the error pool for `runs`. Malformed runs are skipped and listed
    /// in `ErrorPool::rejected`.
    pub fn error_pool<'a, I>(&self, runs: I, config: &MetricsConfig) -> ErrorPool
    where
        I: IntoIterator<Item = &'a ExperimentRun>,
    {
        let mut pool = ErrorPool::default();

        for run in runs {
            if let Err(reason) = validate_run(run) {
                debug!(id = %run.id, %reason, "skipping malformed run");
                pool.rejected.push(RejectedRecord {
                    id: run.id.clone(),
                    reason,
                });
                continue;
            }
            pool.runs_included += 1;

            match self {
                Self::PooledParameter => {
                    if run.has_result {
                        pool.errors
                            .extend(parameter_errors(run, config.zero_cutoff));
                    } else {
                        pool.errors
                            .extend(std::iter::repeat(config.penalty).take(run.parameter_count()));
                    }
                }
                Self::PerRunMean => {
                    let value = if run.has_result {
                        stats::mean(&parameter_errors(run, config.zero_cutoff))
                            .unwrap_or(config.penalty)
                    } else {
                        config.penalty
                    };
                    pool.errors.push(value);
                }
            }
        }

        pool
    }
}
