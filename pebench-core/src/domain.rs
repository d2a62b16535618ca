//! Domain types: experiment runs, noise levels, queries, and the dataset.
//!
//! A `Dataset` is loaded once and then only read. Every aggregation in the
//! engine works on borrowed runs selected through a `Query`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─── Noise level ─────────────────────────────────────────────────────

/// Measurement noise level of a benchmark instance (0, 1e-8, ... 1e-2).
///
/// Wraps an `f64` with a total order so it can key ordered maps and
/// partition runs by exact value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoiseLevel(f64);

impl NoiseLevel {
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Base-10 exponent for non-zero levels (1e-6 → -6). `None` for zero.
    pub fn exponent(self) -> Option<i32> {
        if self.0 == 0.0 {
            None
        } else {
            Some(self.0.abs().log10().round() as i32)
        }
    }
}

impl PartialEq for NoiseLevel {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NoiseLevel {}

impl PartialOrd for NoiseLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NoiseLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        // -0.0 and 0.0 are the same level
        let a = if self.0 == 0.0 { 0.0 } else { self.0 };
        let b = if other.0 == 0.0 { 0.0 } else { other.0 };
        a.total_cmp(&b)
    }
}

impl fmt::Display for NoiseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0.0 {
            write!(f, "0")
        } else {
            write!(f, "{:e}", self.0)
        }
    }
}

impl FromStr for NoiseLevel {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<f64>().map(Self)
    }
}

impl From<f64> for NoiseLevel {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

// ─── Experiment run ──────────────────────────────────────────────────

/// One evaluation of one estimation method on one synthetic benchmark instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRun {
    /// Unique key: system name, instance index, and noise level.
    pub id: String,
    /// Estimator label used to group rows.
    pub method: String,
    /// Dynamical system under test.
    pub system: String,
    pub noise: NoiseLevel,
    /// Whether the method produced any estimate at all.
    pub has_result: bool,
    /// Ground-truth parameter and state values. Its key set defines the
    /// expected parameter count of the run.
    pub true_values: BTreeMap<String, f64>,
    /// Estimated values; empty when `has_result` is false.
    pub estimated_values: BTreeMap<String, f64>,
    pub runtime_seconds: f64,
}

impl ExperimentRun {
    /// Number of parameters and states the method was expected to recover.
    pub fn parameter_count(&self) -> usize {
        self.true_values.len()
    }
}

// ─── Query ───────────────────────────────────────────────────────────

/// Selects the runs of one method, optionally narrowed to one noise level
/// and/or one system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub method: String,
    pub noise: Option<NoiseLevel>,
    pub system: Option<String>,
}

impl Query {
    pub fn method(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            noise: None,
            system: None,
        }
    }

    pub fn with_noise(mut self, noise: NoiseLevel) -> Self {
        self.noise = Some(noise);
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn matches(&self, run: &ExperimentRun) -> bool {
        run.method == self.method
            && self.noise.map_or(true, |n| run.noise == n)
            && self.system.as_deref().map_or(true, |s| run.system == s)
    }
}

// ─── Dataset ─────────────────────────────────────────────────────────

/// Immutable in-memory collection of experiment runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    runs: Vec<ExperimentRun>,
}

impl Dataset {
    pub fn new(runs: Vec<ExperimentRun>) -> Self {
        Self { runs }
    }

    pub fn runs(&self) -> &[ExperimentRun] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Sorted, de-duplicated method labels.
    pub fn methods(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self.runs.iter().map(|r| r.method.as_str()).collect();
        set.into_iter().collect()
    }

    /// Sorted, de-duplicated system names.
    pub fn systems(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self.runs.iter().map(|r| r.system.as_str()).collect();
        set.into_iter().collect()
    }

    /// Sorted, de-duplicated noise levels.
    pub fn noise_levels(&self) -> Vec<NoiseLevel> {
        let set: BTreeSet<NoiseLevel> = self.runs.iter().map(|r| r.noise).collect();
        set.into_iter().collect()
    }

    /// Runs matching `query`, in load order.
    pub fn filter<'a>(&'a self, query: &'a Query) -> impl Iterator<Item = &'a ExperimentRun> + 'a {
        self.runs.iter().filter(move |r| query.matches(r))
    }

    /// BLAKE3 hash over every run, in load order.
    ///
    /// Reports record it so a rendered table can be traced back to the exact
    /// dataset that produced it.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for run in &self.runs {
            hash_str(&mut hasher, &run.id);
            hash_str(&mut hasher, &run.method);
            hash_str(&mut hasher, &run.system);
            hasher.update(&run.noise.value().to_bits().to_le_bytes());
            hasher.update(&[run.has_result as u8]);
            hash_values(&mut hasher, &run.true_values);
            hash_values(&mut hasher, &run.estimated_values);
            hasher.update(&run.runtime_seconds.to_bits().to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hash_values(hasher: &mut blake3::Hasher, values: &BTreeMap<String, f64>) {
    hasher.update(&(values.len() as u64).to_le_bytes());
    for (key, value) in values {
        hash_str(hasher, key);
        hasher.update(&value.to_bits().to_le_bytes());
    }
}

impl FromIterator<ExperimentRun> for Dataset {
    fn from_iter<I: IntoIterator<Item = ExperimentRun>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(id: &str, method: &str, system: &str, noise: f64) -> ExperimentRun {
        ExperimentRun {
            id: id.into(),
            method: method.into(),
            system: system.into(),
            noise: NoiseLevel::new(noise),
            has_result: true,
            true_values: BTreeMap::from([("a".to_string(), 1.0)]),
            estimated_values: BTreeMap::from([("a".to_string(), 1.1)]),
            runtime_seconds: 2.0,
        }
    }

    fn sample() -> Dataset {
        Dataset::new(vec![
            run("lv_0_0", "odepe", "lotka_volterra", 0.0),
            run("lv_0_1e-2", "odepe", "lotka_volterra", 1e-2),
            run("fhn_0_0", "sciml", "fitzhugh_nagumo", 0.0),
            run("fhn_1_1e-6", "odepe", "fitzhugh_nagumo", 1e-6),
        ])
    }

    #[test]
    fn noise_level_display() {
        assert_eq!(NoiseLevel::new(0.0).to_string(), "0");
        assert_eq!(NoiseLevel::new(1e-8).to_string(), "1e-8");
        assert_eq!(NoiseLevel::new(0.01).to_string(), "1e-2");
    }

    #[test]
    fn noise_level_exponent() {
        assert_eq!(NoiseLevel::new(0.0).exponent(), None);
        assert_eq!(NoiseLevel::new(1e-6).exponent(), Some(-6));
        assert_eq!(NoiseLevel::new(0.01).exponent(), Some(-2));
    }

    #[test]
    fn negative_zero_equals_zero() {
        assert_eq!(NoiseLevel::new(-0.0), NoiseLevel::new(0.0));
    }

    #[test]
    fn noise_level_parses() {
        let n: NoiseLevel = " 1e-4 ".parse().unwrap();
        assert_eq!(n, NoiseLevel::new(1e-4));
    }

    #[test]
    fn unique_accessors_are_sorted() {
        let ds = sample();
        assert_eq!(ds.methods(), vec!["odepe", "sciml"]);
        assert_eq!(ds.systems(), vec!["fitzhugh_nagumo", "lotka_volterra"]);
        assert_eq!(
            ds.noise_levels(),
            vec![NoiseLevel::new(0.0), NoiseLevel::new(1e-6), NoiseLevel::new(1e-2)]
        );
    }

    #[test]
    fn query_filters_by_all_attributes() {
        let ds = sample();
        let q = Query::method("odepe");
        assert_eq!(ds.filter(&q).count(), 3);

        let q = Query::method("odepe").with_noise(NoiseLevel::new(0.0));
        assert_eq!(ds.filter(&q).count(), 1);

        let q = Query::method("odepe").with_system("fitzhugh_nagumo");
        let ids: Vec<_> = ds.filter(&q).map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["fhn_1_1e-6"]);

        let q = Query::method("missing");
        assert_eq!(ds.filter(&q).count(), 0);
    }

    #[test]
    fn fingerprint_is_deterministic_and_content_sensitive() {
        let ds = sample();
        assert_eq!(ds.fingerprint(), sample().fingerprint());

        let mut runs = ds.runs().to_vec();
        runs[0].estimated_values.insert("a".into(), 1.2);
        assert_ne!(ds.fingerprint(), Dataset::new(runs).fingerprint());
    }
}
