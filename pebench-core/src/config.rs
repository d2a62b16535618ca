//! Serializable metrics configuration.
//!
//! Every "failure cost" and "success" constant lives here and is injected
//! into the engine at construction. Nothing else in the workspace hard-codes
//! the penalty, the success thresholds, or the near-zero cutoff.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pooling::AggregationStrategy;

/// Error value substituted for every expected-but-missing parameter of a failed run.
pub const DEFAULT_PENALTY: f64 = 1e6;

/// True values with magnitude below this fall back to absolute error.
pub const DEFAULT_ZERO_CUTOFF: f64 = 1e-10;

/// Errors raised while loading or validating a `MetricsConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("penalty must be finite and positive, got {0}")]
    NonPositivePenalty(f64),

    #[error("threshold '{label}' must be finite and in (0, 1], got {value}")]
    InvalidThreshold { label: String, value: f64 },

    #[error("duplicate threshold label '{0}'")]
    DuplicateThresholdLabel(String),

    #[error("threshold label must not be empty")]
    EmptyThresholdLabel,

    #[error("at least one success-rate threshold is required")]
    EmptyThresholds,

    #[error("zero cutoff must be finite and non-negative, got {0}")]
    InvalidZeroCutoff(f64),

    #[error("read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A named success-rate threshold, e.g. `SR-10` at 0.10 relative error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub label: String,
    pub value: f64,
}

impl Threshold {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Which runs contribute to the mean runtime of a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimePolicy {
    /// Every non-rejected run, whether or not it produced an estimate.
    #[default]
    AllRuns,
    /// Only runs with `has_result = true`.
    SuccessfulOnly,
}

/// Configuration injected into `MetricsEngine`.
///
/// Missing TOML fields take the defaults below:
///
/// ```toml
/// penalty = 1e6
/// zero_cutoff = 1e-10
/// runtime_policy = "all_runs"
/// strategy = "pooled_parameter"
///
/// [[thresholds]]
/// label = "SR-1"
/// value = 0.01
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub penalty: f64,
    pub thresholds: Vec<Threshold>,
    pub zero_cutoff: f64,
    pub runtime_policy: RuntimePolicy,
    pub strategy: AggregationStrategy,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            penalty: DEFAULT_PENALTY,
            thresholds: default_thresholds(),
            zero_cutoff: DEFAULT_ZERO_CUTOFF,
            runtime_policy: RuntimePolicy::default(),
            strategy: AggregationStrategy::default(),
        }
    }
}

/// SR-1, SR-10 and SR-50: success within 1%, 10% and 50% relative error.
pub fn default_thresholds() -> Vec<Threshold> {
    vec![
        Threshold::new("SR-1", 0.01),
        Threshold::new("SR-10", 0.10),
        Threshold::new("SR-50", 0.50),
    ]
}

impl MetricsConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject invalid penalties, thresholds and cutoffs before any aggregation runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.penalty.is_finite() || self.penalty <= 0.0 {
            return Err(ConfigError::NonPositivePenalty(self.penalty));
        }
        if !self.zero_cutoff.is_finite() || self.zero_cutoff < 0.0 {
            return Err(ConfigError::InvalidZeroCutoff(self.zero_cutoff));
        }
        if self.thresholds.is_empty() {
            return Err(ConfigError::EmptyThresholds);
        }

        let mut seen = HashSet::new();
        for t in &self.thresholds {
            if t.label.trim().is_empty() {
                return Err(ConfigError::EmptyThresholdLabel);
            }
            if !t.value.is_finite() || t.value <= 0.0 || t.value > 1.0 {
                return Err(ConfigError::InvalidThreshold {
                    label: t.label.clone(),
                    value: t.value,
                });
            }
            if !seen.insert(t.label.as_str()) {
                return Err(ConfigError::DuplicateThresholdLabel(t.label.clone()));
            }
        }
        Ok(())
    }

    /// Look up a threshold value by label.
    pub fn threshold(&self, label: &str) -> Option<f64> {
        self.thresholds
            .iter()
            .find(|t| t.label == label)
            .map(|t| t.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MetricsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.penalty, 1e6);
        assert_eq!(config.zero_cutoff, 1e-10);
        assert_eq!(config.threshold("SR-10"), Some(0.10));
        assert_eq!(config.strategy, AggregationStrategy::PooledParameter);
        assert_eq!(config.runtime_policy, RuntimePolicy::AllRuns);
    }

    #[test]
    fn empty_toml_takes_defaults() {
        let config = MetricsConfig::from_toml("").unwrap();
        assert_eq!(config, MetricsConfig::default());
    }

    #[test]
    fn toml_overrides_fields() {
        let config = MetricsConfig::from_toml(
            r#"
penalty = 1000.0
runtime_policy = "successful_only"
strategy = "per_run_mean"

[[thresholds]]
label = "SR-5"
value = 0.05
"#,
        )
        .unwrap();
        assert_eq!(config.penalty, 1000.0);
        assert_eq!(config.runtime_policy, RuntimePolicy::SuccessfulOnly);
        assert_eq!(config.strategy, AggregationStrategy::PerRunMean);
        assert_eq!(config.thresholds, vec![Threshold::new("SR-5", 0.05)]);
        assert_eq!(config.zero_cutoff, DEFAULT_ZERO_CUTOFF);
    }

    #[test]
    fn rejects_non_positive_penalty() {
        for penalty in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = MetricsConfig {
                penalty,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::NonPositivePenalty(_))
            ));
        }
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        for value in [-0.1, 0.0, 1.5, f64::NAN] {
            let config = MetricsConfig {
                thresholds: vec![Threshold::new("bad", value)],
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidThreshold { .. })
            ));
        }
    }

    #[test]
    fn threshold_of_one_is_allowed() {
        let config = MetricsConfig {
            thresholds: vec![Threshold::new("SR-100", 1.0)],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_duplicate_and_empty_labels() {
        let config = MetricsConfig {
            thresholds: vec![Threshold::new("SR-1", 0.01), Threshold::new("SR-1", 0.02)],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateThresholdLabel(_))
        ));

        let config = MetricsConfig {
            thresholds: vec![Threshold::new("  ", 0.01)],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyThresholdLabel)
        ));

        let config = MetricsConfig {
            thresholds: vec![],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyThresholds)));
    }

    #[test]
    fn rejects_negative_zero_cutoff() {
        let config = MetricsConfig {
            zero_cutoff: -1e-10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidZeroCutoff(_))
        ));
    }

    #[test]
    fn from_toml_validates() {
        assert!(matches!(
            MetricsConfig::from_toml("penalty = -5.0"),
            Err(ConfigError::NonPositivePenalty(_))
        ));
        assert!(matches!(
            MetricsConfig::from_toml("penalty = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.toml");
        std::fs::write(&path, "penalty = 42.0\n").unwrap();
        let config = MetricsConfig::from_file(&path).unwrap();
        assert_eq!(config.penalty, 42.0);

        let missing = MetricsConfig::from_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
