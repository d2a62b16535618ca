//! Relative error between true and estimated parameter values.

use crate::domain::ExperimentRun;

/// Relative error of `estimated` against `truth`.
///
/// Falls back to absolute error when `|truth| < zero_cutoff`, where the
/// relative form is undefined or explosive. The result is never negative.
pub fn relative_error(truth: f64, estimated: f64, zero_cutoff: f64) -> f64 {
    let diff = (estimated - truth).abs();
    if truth.abs() < zero_cutoff {
        diff
    } else {
        diff / truth.abs()
    }
}

/// Per-key relative errors of a run, in key order.
///
/// Only keys present in both `true_values` and `estimated_values` produce an
/// error; estimated keys without ground truth are ignored.
pub fn parameter_errors(run: &ExperimentRun, zero_cutoff: f64) -> Vec<f64> {
    run.true_values
        .iter()
        .filter_map(|(key, &truth)| {
            run.estimated_values
                .get(key)
                .map(|&est| relative_error(truth, est, zero_cutoff))
        })
        .collect()
}
