//! Summary statistics over an error pool: pure functions, slice in, scalar out.
//!
//! Every function returns `None` for an empty slice so callers render absence
//! explicitly instead of printing NaN.

/// Arithmetic mean, accumulated as a running mean.
///
/// The running form stays exact when every value is equal, so an all-penalty
/// pool reports the penalty itself rather than a rounded neighbour.
pub fn mean(values: &[f64]) -> Option<f64> {
    let (first, rest) = values.split_first()?;
    let mut m = *first;
    for (i, v) in rest.iter().enumerate() {
        m += (v - m) / (i + 2) as f64;
    }
    Some(m)
}

/// Median; the mean of the two middle values when the length is even.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted = sorted(values);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Percentile `p` in `[0, 100]` with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted = sorted(values);
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Fraction of values strictly below `threshold`.
///
/// A value exactly equal to the threshold is not a success.
pub fn success_rate(values: &[f64], threshold: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let hits = values.iter().filter(|&&v| v < threshold).count();
    Some(hits as f64 / values.len() as f64)
}

/// Largest value.
pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}
