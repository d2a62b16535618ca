//! Metrics engine: the single source of truth for every reported statistic.
//!
//! The engine owns a validated `MetricsConfig` and computes `MethodMetrics`
//! fresh on every query. It holds no other state, so any number of callers
//! may query it concurrently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, MetricsConfig, RuntimePolicy};
use crate::domain::{Dataset, NoiseLevel, Query};
use crate::pooling::{AggregationStrategy, ErrorPool};
use crate::run_level::{run_level_metrics, RunLevelMetrics};
use crate::stats;
use crate::validate::{validate_run, RejectedRecord};

// ─── Result types ────────────────────────────────────────────────────

/// Success rate at one configured threshold, as a fraction in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessRate {
    pub label: String,
    pub threshold: f64,
    pub rate: f64,
}

/// Statistics of a non-empty error pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub median: f64,
    pub mean: f64,
    pub success_rates: Vec<SuccessRate>,
}

impl ErrorSummary {
    /// Rate for a threshold label such as `"SR-10"`.
    pub fn success_rate(&self, label: &str) -> Option<f64> {
        self.success_rates
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.rate)
    }
}

/// Aggregate metrics of one method over one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodMetrics {
    pub method: String,
    pub noise: Option<NoiseLevel>,
    pub system: Option<String>,
    pub strategy: AggregationStrategy,
    /// Every run matching the query, rejected ones included.
    pub total_runs: usize,
    /// Non-rejected matching runs with `has_result = true`.
    pub success_count: usize,
    pub pool_size: usize,
    /// `None` when the pool is empty.
    pub errors: Option<ErrorSummary>,
    /// `None` when no run qualifies under the runtime policy.
    pub mean_runtime: Option<f64>,
    pub rejected: Vec<RejectedRecord>,
}

impl MethodMetrics {
    /// True when the query produced no errors to summarize.
    pub fn is_empty(&self) -> bool {
        self.errors.is_none()
    }

    pub fn median_error(&self) -> Option<f64> {
        self.errors.as_ref().map(|e| e.median)
    }

    pub fn mean_error(&self) -> Option<f64> {
        self.errors.as_ref().map(|e| e.mean)
    }

    pub fn success_rate(&self, label: &str) -> Option<f64> {
        self.errors.as_ref().and_then(|e| e.success_rate(label))
    }
}

/// Medians of the same method under both aggregation strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub method: String,
    pub pooled_parameter_median: Option<f64>,
    pub per_run_mean_median: Option<f64>,
    pub pooled_size: usize,
    pub per_run_size: usize,
}

impl StrategyComparison {
    /// `pooled - per_run`, when both medians exist.
    pub fn difference(&self) -> Option<f64> {
        Some(self.pooled_parameter_median? - self.per_run_mean_median?)
    }
}

// ─── Engine ──────────────────────────────────────────────────────────

/// Computes every reported statistic from a dataset and an injected config.
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    config: MetricsConfig,
}

impl MetricsEngine {
    /// Validate `config` and build an engine around it.
    pub fn new(config: MetricsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Error pool for `query` under the configured strategy.
    pub fn pool(&self, dataset: &Dataset, query: &Query) -> ErrorPool {
        self.pool_with(self.config.strategy, dataset, query)
    }

    /// Error pool for `query` under an explicit strategy.
    pub fn pool_with(
        &self,
        strategy: AggregationStrategy,
        dataset: &Dataset,
        query: &Query,
    ) -> ErrorPool {
        strategy.error_pool(dataset.filter(query), &self.config)
    }

    /// Median, mean, success rates, runtime and counts for `query`.
    pub fn method_metrics(&self, dataset: &Dataset, query: &Query) -> MethodMetrics {
        self.method_metrics_with(self.config.strategy, dataset, query)
    }

    pub fn method_metrics_with(
        &self,
        strategy: AggregationStrategy,
        dataset: &Dataset,
        query: &Query,
    ) -> MethodMetrics {
        let pool = self.pool_with(strategy, dataset, query);

        let mut total_runs = 0;
        let mut success_count = 0;
        let mut runtimes = Vec::new();
        for run in dataset.filter(query) {
            total_runs += 1;
            if validate_run(run).is_err() {
                continue;
            }
            if run.has_result {
                success_count += 1;
            }
            let counts = match self.config.runtime_policy {
                RuntimePolicy::AllRuns => true,
                RuntimePolicy::SuccessfulOnly => run.has_result,
            };
            if counts {
                runtimes.push(run.runtime_seconds);
            }
        }

        MethodMetrics {
            method: query.method.clone(),
            noise: query.noise,
            system: query.system.clone(),
            strategy,
            total_runs,
            success_count,
            pool_size: pool.len(),
            errors: self.summarize(&pool.errors),
            mean_runtime: stats::mean(&runtimes),
            rejected: pool.rejected,
        }
    }

    /// Statistics of a pool, or `None` when it is empty.
    pub fn summarize(&self, errors: &[f64]) -> Option<ErrorSummary> {
        let median = stats::median(errors)?;
        let mean = stats::mean(errors)?;
        let success_rates = self
            .config
            .thresholds
            .iter()
            .filter_map(|t| {
                stats::success_rate(errors, t.value).map(|rate| SuccessRate {
                    label: t.label.clone(),
                    threshold: t.value,
                    rate,
                })
            })
            .collect();
        Some(ErrorSummary {
            median,
            mean,
            success_rates,
        })
    }

    /// Metrics of `method` per noise level present in its runs.
    pub fn by_noise(&self, dataset: &Dataset, method: &str) -> BTreeMap<NoiseLevel, MethodMetrics> {
        let base = Query::method(method);
        let mut levels: Vec<NoiseLevel> = dataset.filter(&base).map(|r| r.noise).collect();
        levels.sort();
        levels.dedup();

        levels
            .into_iter()
            .map(|noise| {
                let q = base.clone().with_noise(noise);
                (noise, self.method_metrics(dataset, &q))
            })
            .collect()
    }

    /// Metrics of `method` per system, optionally at one noise level.
    pub fn by_system(
        &self,
        dataset: &Dataset,
        method: &str,
        noise: Option<NoiseLevel>,
    ) -> BTreeMap<String, MethodMetrics> {
        let mut base = Query::method(method);
        base.noise = noise;
        let mut systems: Vec<String> = dataset.filter(&base).map(|r| r.system.clone()).collect();
        systems.sort();
        systems.dedup();

        systems
            .into_iter()
            .map(|system| {
                let q = base.clone().with_system(system.clone());
                let metrics = self.method_metrics(dataset, &q);
                (system, metrics)
            })
            .collect()
    }

    /// Median of `method` under both strategies, for drift detection.
    pub fn strategy_comparison(&self, dataset: &Dataset, method: &str) -> StrategyComparison {
        let query = Query::method(method);
        let pooled = self.pool_with(AggregationStrategy::PooledParameter, dataset, &query);
        let per_run = self.pool_with(AggregationStrategy::PerRunMean, dataset, &query);
        StrategyComparison {
            method: method.to_string(),
            pooled_parameter_median: stats::median(&pooled.errors),
            per_run_mean_median: stats::median(&per_run.errors),
            pooled_size: pooled.len(),
            per_run_size: per_run.len(),
        }
    }

    /// Worst-parameter metrics across the runs of `query`.
    pub fn run_level(&self, dataset: &Dataset, query: &Query) -> RunLevelMetrics {
        run_level_metrics(dataset.filter(query), &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExperimentRun;
    use std::collections::BTreeMap;

    fn run(id: &str, noise: f64, system: &str, est: Option<f64>, runtime: f64) -> ExperimentRun {
        ExperimentRun {
            id: id.into(),
            method: "odepe".into(),
            system: system.into(),
            noise: NoiseLevel::new(noise),
            has_result: est.is_some(),
            true_values: BTreeMap::from([("a".to_string(), 1.0)]),
            estimated_values: est
                .map(|e| BTreeMap::from([("a".to_string(), e)]))
                .unwrap_or_default(),
            runtime_seconds: runtime,
        }
    }

    fn engine() -> MetricsEngine {
        MetricsEngine::new(MetricsConfig::default()).unwrap()
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = MetricsConfig {
            penalty: 0.0,
            ..Default::default()
        };
        assert!(MetricsEngine::new(config).is_err());
    }

    #[test]
    fn counts_and_runtime() {
        let ds = Dataset::new(vec![
            run("a", 0.0, "lv", Some(1.5), 2.0),
            run("b", 0.0, "lv", None, 4.0),
        ]);
        let m = engine().method_metrics(&ds, &Query::method("odepe"));
        assert_eq!(m.total_runs, 2);
        assert_eq!(m.success_count, 1);
        assert_eq!(m.pool_size, 2);
        assert_eq!(m.mean_runtime, Some(3.0));
    }

    #[test]
    fn successful_only_runtime_policy() {
        let ds = Dataset::new(vec![
            run("a", 0.0, "lv", Some(1.5), 2.0),
            run("b", 0.0, "lv", None, 4.0),
        ]);
        let engine = MetricsEngine::new(MetricsConfig {
            runtime_policy: RuntimePolicy::SuccessfulOnly,
            ..Default::default()
        })
        .unwrap();
        let m = engine.method_metrics(&ds, &Query::method("odepe"));
        assert_eq!(m.mean_runtime, Some(2.0));

        let ds = Dataset::new(vec![run("b", 0.0, "lv", None, 4.0)]);
        let m = engine.method_metrics(&ds, &Query::method("odepe"));
        assert_eq!(m.mean_runtime, None);
        assert!(m.errors.is_some());
    }

    #[test]
    fn empty_query_is_no_data() {
        let ds = Dataset::new(vec![run("a", 0.0, "lv", Some(1.0), 1.0)]);
        let m = engine().method_metrics(&ds, &Query::method("sciml"));
        assert!(m.is_empty());
        assert_eq!(m.total_runs, 0);
        assert_eq!(m.median_error(), None);
        assert_eq!(m.success_rate("SR-10"), None);
        assert_eq!(m.mean_runtime, None);
    }

    #[test]
    fn rejected_runs_count_in_total_only() {
        let mut bad = run("bad", 0.0, "lv", Some(1.0), 1.0);
        bad.estimated_values.clear();
        bad.estimated_values.insert("b".into(), 1.0);
        let ds = Dataset::new(vec![run("a", 0.0, "lv", Some(1.0), 3.0), bad]);
        let m = engine().method_metrics(&ds, &Query::method("odepe"));
        assert_eq!(m.total_runs, 2);
        assert_eq!(m.success_count, 1);
        assert_eq!(m.pool_size, 1);
        assert_eq!(m.mean_runtime, Some(3.0));
        assert_eq!(m.rejected.len(), 1);
        assert_eq!(m.rejected[0].id, "bad");
    }

    #[test]
    fn by_noise_partitions_runs() {
        let ds = Dataset::new(vec![
            run("a", 0.0, "lv", Some(1.0), 1.0),
            run("b", 1e-2, "lv", Some(1.5), 1.0),
            run("c", 1e-2, "fhn", None, 1.0),
        ]);
        let by_noise = engine().by_noise(&ds, "odepe");
        assert_eq!(by_noise.len(), 2);
        assert_eq!(by_noise[&NoiseLevel::new(0.0)].median_error(), Some(0.0));
        let high = &by_noise[&NoiseLevel::new(1e-2)];
        assert_eq!(high.total_runs, 2);
        assert_eq!(high.noise, Some(NoiseLevel::new(1e-2)));
    }

    #[test]
    fn by_system_respects_noise_filter() {
        let ds = Dataset::new(vec![
            run("a", 0.0, "lv", Some(1.0), 1.0),
            run("b", 1e-2, "lv", Some(1.5), 1.0),
            run("c", 1e-2, "fhn", None, 1.0),
        ]);
        let all = engine().by_system(&ds, "odepe", None);
        assert_eq!(all["lv"].total_runs, 2);
        assert_eq!(all["fhn"].total_runs, 1);

        let low = engine().by_system(&ds, "odepe", Some(NoiseLevel::new(0.0)));
        assert_eq!(low.len(), 1);
        assert_eq!(low["lv"].median_error(), Some(0.0));
    }

    #[test]
    fn strategy_comparison_reports_both_medians() {
        let mut wide = run("w", 0.0, "big", None, 1.0);
        wide.true_values = (0..3).map(|i| (format!("k{i}"), 1.0)).collect();
        let ds = Dataset::new(vec![run("a", 0.0, "lv", Some(1.0), 1.0), wide]);
        let cmp = engine().strategy_comparison(&ds, "odepe");
        assert_eq!(cmp.pooled_parameter_median, Some(1e6));
        assert_eq!(cmp.per_run_mean_median, Some(5e5));
        assert_eq!(cmp.pooled_size, 4);
        assert_eq!(cmp.per_run_size, 2);
        assert_eq!(cmp.difference(), Some(5e5));
    }

    #[test]
    fn method_metrics_with_overrides_strategy() {
        let ds = Dataset::new(vec![run("a", 0.0, "lv", Some(1.5), 1.0)]);
        let m = engine().method_metrics_with(
            AggregationStrategy::PerRunMean,
            &ds,
            &Query::method("odepe"),
        );
        assert_eq!(m.strategy, AggregationStrategy::PerRunMean);
        assert_eq!(m.median_error(), Some(0.5));
    }
}
