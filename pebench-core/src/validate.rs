//! Per-record validation.
//!
//! A malformed run is skipped by every aggregation and reported through a
//! `RejectedRecord`. It never aborts the aggregation it appears in.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ExperimentRun;

/// Why a run could not be interpreted.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    #[error("has_result is set but no estimates were recorded")]
    EmptyEstimates,

    #[error("no estimate for expected key '{key}'")]
    MissingEstimate { key: String },

    #[error("non-finite value for key '{key}'")]
    NonFiniteValue { key: String },

    #[error("runtime must be finite and non-negative, got {runtime}")]
    InvalidRuntime { runtime: f64 },
}

/// A run excluded from an aggregation, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub id: String,
    pub reason: RejectReason,
}

/// Check a run before it contributes errors or runtime.
pub fn validate_run(run: &ExperimentRun) -> Result<(), RejectReason> {
    if !run.runtime_seconds.is_finite() || run.runtime_seconds < 0.0 {
        return Err(RejectReason::InvalidRuntime {
            runtime: run.runtime_seconds,
        });
    }
    if let Some((key, _)) = run.true_values.iter().find(|(_, v)| !v.is_finite()) {
        return Err(RejectReason::NonFiniteValue { key: key.clone() });
    }
    if !run.has_result {
        return Ok(());
    }
    if run.estimated_values.is_empty() && !run.true_values.is_empty() {
        return Err(RejectReason::EmptyEstimates);
    }
    for key in run.true_values.keys() {
        match run.estimated_values.get(key) {
            None => return Err(RejectReason::MissingEstimate { key: key.clone() }),
            Some(v) if !v.is_finite() => {
                return Err(RejectReason::NonFiniteValue { key: key.clone() })
            }
            Some(_) => {}
        }
    }
    Ok(())
}
