//! pebench core: the metrics engine behind every table in the paper.
//!
//! This crate provides:
//! - Domain types (experiment runs, noise levels, queries, datasets)
//! - An injected `MetricsConfig` (penalty, success thresholds, near-zero cutoff)
//! - Relative error and per-record validation
//! - Pooled-parameter and per-run-mean aggregation strategies
//! - Summary statistics, by-noise and by-system breakdowns
//! - Run-level (worst-parameter) metrics

pub mod config;
pub mod domain;
pub mod engine;
pub mod error_calc;
pub mod pooling;
pub mod run_level;
pub mod stats;
pub mod validate;

pub use config::{ConfigError, MetricsConfig, RuntimePolicy, Threshold};
pub use domain::{Dataset, ExperimentRun, NoiseLevel, Query};
pub use engine::{ErrorSummary, MethodMetrics, MetricsEngine, StrategyComparison, SuccessRate};
pub use error_calc::{parameter_errors, relative_error};
pub use pooling::{AggregationStrategy, ErrorPool};
pub use run_level::{RunLevelMetrics, RunSummary};
pub use validate::{RejectReason, RejectedRecord};
