//! Presentation configuration: display names, method order, identifiability.
//!
//! Loaded from TOML. Nothing here affects a computed number except the
//! non-identifiable map, which removes quantities before aggregation.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading a `ReportConfig`.
#[derive(Debug, Error)]
pub enum ReportConfigError {
    #[error("read report config: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse report config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A method label and the name printed for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodLabel {
    pub run: String,
    pub display: String,
}

impl MethodLabel {
    pub fn new(run: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            run: run.into(),
            display: display.into(),
        }
    }
}

/// Report layout configuration.
///
/// ```toml
/// [[methods]]
/// run = "odepe"
/// display = "ODEPE-GPR"
///
/// [system_names]
/// lotka_volterra = "Lotka-Volterra"
///
/// [non_identifiable]
/// biohydrogenation = ["x7"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Methods in table order. Empty means every method in the dataset, sorted.
    pub methods: Vec<MethodLabel>,
    pub system_names: BTreeMap<String, String>,
    /// Quantities removed per system before any error is computed.
    pub non_identifiable: BTreeMap<String, Vec<String>>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            methods: vec![
                MethodLabel::new("odepe", "ODEPE-GPR"),
                MethodLabel::new("odepe_polish", "ODEPE-GPR (polished)"),
                MethodLabel::new("sciml", "SciML"),
                MethodLabel::new("amigo2_0_10", "AMIGO2 [0,10]"),
                MethodLabel::new("amigo2_0_100", "AMIGO2 [0,100]"),
            ],
            system_names: BTreeMap::new(),
            non_identifiable: BTreeMap::from([(
                "biohydrogenation".to_string(),
                vec!["x7".to_string()],
            )]),
        }
    }
}

impl ReportConfig {
    pub fn from_file(path: &Path) -> Result<Self, ReportConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ReportConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Printed name of a method; the run label itself when unconfigured.
    pub fn method_name<'a>(&'a self, run: &'a str) -> &'a str {
        self.methods
            .iter()
            .find(|m| m.run == run)
            .map(|m| m.display.as_str())
            .unwrap_or(run)
    }

    /// Printed name of a system; the system key itself when unconfigured.
    pub fn system_name<'a>(&'a self, system: &'a str) -> &'a str {
        self.system_names
            .get(system)
            .map(String::as_str)
            .unwrap_or(system)
    }

    /// Methods to report, in order: configured ones present in `available`,
    /// or all of `available` when none are configured.
    pub fn ordered_methods(&self, available: &[&str]) -> Vec<String> {
        if self.methods.is_empty() {
            return available.iter().map(|s| s.to_string()).collect();
        }
        self.methods
            .iter()
            .filter(|m| available.contains(&m.run.as_str()))
            .map(|m| m.run.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names_paper_methods() {
        let config = ReportConfig::default();
        assert_eq!(config.method_name("odepe_polish"), "ODEPE-GPR (polished)");
        assert_eq!(config.method_name("unknown"), "unknown");
        assert_eq!(config.system_name("lotka_volterra"), "lotka_volterra");
        assert_eq!(config.non_identifiable["biohydrogenation"], vec!["x7"]);
    }

    #[test]
    fn parses_toml() {
        let config = ReportConfig::from_toml(
            r#"
[[methods]]
run = "sciml"
display = "SciML"

[system_names]
lotka_volterra = "Lotka-Volterra"

[non_identifiable]
"#,
        )
        .unwrap();
        assert_eq!(config.methods, vec![MethodLabel::new("sciml", "SciML")]);
        assert_eq!(config.system_name("lotka_volterra"), "Lotka-Volterra");
        assert!(config.non_identifiable.is_empty());
    }

    #[test]
    fn ordered_methods_follow_config_and_skip_absent() {
        let config = ReportConfig::default();
        let ordered = config.ordered_methods(&["sciml", "odepe", "other"]);
        assert_eq!(ordered, vec!["odepe", "sciml"]);

        let empty = ReportConfig {
            methods: vec![],
            ..Default::default()
        };
        assert_eq!(empty.ordered_methods(&["b", "a"]), vec!["b", "a"]);
    }
}
