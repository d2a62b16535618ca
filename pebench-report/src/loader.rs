//! Benchmark CSV loading.
//!
//! Reads `combined_results_filtered.csv` into a `Dataset`. The loading policy:
//! 1. I/O failures and missing required columns abort the load
//! 2. A row whose cells cannot be parsed is rejected with its row number and
//!    reason; loading continues
//! 3. Non-identifiable quantities are stripped from every accepted run
//!
//! Columns: `id`, `run`, `name`, `noise`, `has_result`, `result`,
//! `true_parameters`, `true_states`, `time`. `id` is optional and synthesized
//! from system, row and noise level when absent.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use pebench_core::{Dataset, ExperimentRun, NoiseLevel};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ReportConfig;
use crate::identifiability::strip_non_identifiable;
use crate::literal::{parse_pair_list, parse_value_dict, LiteralError};

const REQUIRED_COLUMNS: [&str; 5] = ["run", "name", "noise", "has_result", "time"];

/// Errors that abort a load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
}

/// Why a single row was rejected.
#[derive(Debug, Error)]
enum RowError {
    #[error("{column}: {source}")]
    Literal {
        column: &'static str,
        #[source]
        source: LiteralError,
    },

    #[error("{column}: cannot parse '{value}'")]
    Field { column: &'static str, value: String },

    #[error("malformed row: {0}")]
    Csv(String),
}

/// A CSV row that could not be turned into a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRejection {
    /// 1-based data row number (header excluded).
    pub row: usize,
    pub id: Option<String>,
    pub reason: String,
}

/// Options controlling how rows become runs.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Quantities removed per system before aggregation.
    pub non_identifiable: BTreeMap<String, Vec<String>>,
}

impl From<&ReportConfig> for LoadOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            non_identifiable: config.non_identifiable.clone(),
        }
    }
}

/// Result of a load: the dataset plus everything that was dropped or altered.
#[derive(Debug)]
pub struct LoadedData {
    pub dataset: Dataset,
    pub rejected: Vec<RowRejection>,
    /// Total non-identifiable quantities stripped across all runs.
    pub stripped: usize,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default)]
    id: Option<String>,
    run: String,
    name: String,
    noise: String,
    has_result: String,
    #[serde(default)]
    result: String,
    #[serde(default)]
    true_parameters: String,
    #[serde(default)]
    true_states: String,
    time: String,
}

/// Load a benchmark CSV from disk.
pub fn load_csv(path: &Path, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let loaded = load_from_reader(file, opts)?;
    info!(
        path = %path.display(),
        runs = loaded.dataset.len(),
        rejected = loaded.rejected.len(),
        stripped = loaded.stripped,
        "loaded benchmark results"
    );
    Ok(loaded)
}

/// Load a benchmark CSV from any reader.
pub fn load_from_reader<R: Read>(reader: R, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    for col in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == col) {
            return Err(LoadError::MissingColumn(col));
        }
    }

    let mut runs = Vec::new();
    let mut rejected = Vec::new();
    let mut stripped = 0;

    for (i, record) in rdr.deserialize::<RawRow>().enumerate() {
        let row = i + 1;
        let parsed = match record {
            Ok(raw) => {
                let id = raw.id.clone().filter(|s| !s.trim().is_empty());
                to_run(raw, row).map_err(|e| (id, e))
            }
            Err(e) if e.is_io_error() => return Err(LoadError::Csv(e)),
            Err(e) => Err((None, RowError::Csv(e.to_string()))),
        };

        match parsed {
            Ok(mut run) => {
                stripped += strip_non_identifiable(&mut run, &opts.non_identifiable);
                runs.push(run);
            }
            Err((id, reason)) => {
                warn!(row, id = ?id, %reason, "rejected CSV row");
                rejected.push(RowRejection {
                    row,
                    id,
                    reason: reason.to_string(),
                });
            }
        }
    }

    Ok(LoadedData {
        dataset: Dataset::new(runs),
        rejected,
        stripped,
    })
}

fn to_run(raw: RawRow, row: usize) -> Result<ExperimentRun, RowError> {
    // Noise is a standard deviation: finite and not negative.
    let noise: NoiseLevel = raw
        .noise
        .parse()
        .ok()
        .filter(|n: &NoiseLevel| n.value().is_finite() && n.value() >= 0.0)
        .ok_or_else(|| RowError::Field {
            column: "noise",
            value: raw.noise.clone(),
        })?;
    let has_result = parse_bool(&raw.has_result).ok_or_else(|| RowError::Field {
        column: "has_result",
        value: raw.has_result.clone(),
    })?;
    let runtime_seconds: f64 = raw.time.trim().parse().map_err(|_| RowError::Field {
        column: "time",
        value: raw.time.clone(),
    })?;

    let mut true_values = parse_value_dict(&raw.true_parameters).map_err(|source| {
        RowError::Literal {
            column: "true_parameters",
            source,
        }
    })?;
    let states = parse_value_dict(&raw.true_states).map_err(|source| RowError::Literal {
        column: "true_states",
        source,
    })?;
    true_values.extend(states);

    let estimated_values = if has_result {
        parse_pair_list(&raw.result).map_err(|source| RowError::Literal {
            column: "result",
            source,
        })?
    } else {
        BTreeMap::new()
    };

    let id = match raw.id {
        Some(id) if !id.trim().is_empty() => id,
        _ => format!("{}_{}_{}", raw.name, row, noise),
    };

    Ok(ExperimentRun {
        id,
        method: raw.run,
        system: raw.name,
        noise,
        has_result,
        true_values,
        estimated_values,
        runtime_seconds,
    })
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "True" | "true" | "TRUE" | "1" => Some(true),
        "False" | "false" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "id,run,name,noise,has_result,result,true_parameters,true_states,time\n";

    fn load(body: &str) -> LoadedData {
        let csv = format!("{HEADER}{body}");
        load_from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap()
    }

    #[test]
    fn parses_successful_and_failed_rows() {
        let loaded = load(
            "lv_0_0,odepe,lotka_volterra,0.0,True,\"[['k1', 0.5], ['x1', '1.1']]\",\"{'k1': 0.5}\",\"{'x1': 1.0}\",12.5\n\
             lv_1_0,sciml,lotka_volterra,0.0,False,[],\"{'k1': 0.5}\",\"{'x1': 1.0}\",3\n",
        );
        assert!(loaded.rejected.is_empty());
        let runs = loaded.dataset.runs();
        assert_eq!(runs.len(), 2);

        assert_eq!(runs[0].id, "lv_0_0");
        assert!(runs[0].has_result);
        assert_eq!(runs[0].true_values.len(), 2);
        assert_eq!(runs[0].estimated_values["x1"], 1.1);
        assert_eq!(runs[0].runtime_seconds, 12.5);

        assert!(!runs[1].has_result);
        assert!(runs[1].estimated_values.is_empty());
        assert_eq!(runs[1].parameter_count(), 2);
    }

    #[test]
    fn states_override_parameters_on_collision() {
        let loaded = load("a,m,s,0,True,\"[['k', 1]]\",\"{'k': 1.0}\",\"{'k': 2.0}\",1\n");
        assert_eq!(loaded.dataset.runs()[0].true_values["k"], 2.0);
    }

    #[test]
    fn bad_rows_are_rejected_and_loading_continues() {
        let loaded = load(
            "bad_noise,m,s,high,True,[],{},{},1\n\
             bad_literal,m,s,0,True,\"[['k', ]\",\"{'k': 1.0}\",{},1\n\
             good,m,s,1e-6,False,,\"{'k': 1.0}\",,2\n",
        );
        assert_eq!(loaded.dataset.len(), 1);
        assert_eq!(loaded.dataset.runs()[0].id, "good");
        assert_eq!(loaded.dataset.runs()[0].noise, NoiseLevel::new(1e-6));

        let rows: Vec<usize> = loaded.rejected.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![1, 2]);
        assert_eq!(loaded.rejected[0].id.as_deref(), Some("bad_noise"));
        assert!(loaded.rejected[0].reason.contains("noise"));
        assert!(loaded.rejected[1].reason.contains("result"));
    }

    #[test]
    fn non_finite_or_negative_noise_is_rejected() {
        let loaded = load(
            "nan_noise,m,s,nan,False,[],\"{'k': 1.0}\",{},1\n\
             inf_noise,m,s,inf,False,[],\"{'k': 1.0}\",{},1\n\
             negative_noise,m,s,-1e-6,False,[],\"{'k': 1.0}\",{},1\n\
             signed_zero,m,s,-0.0,False,[],\"{'k': 1.0}\",{},1\n",
        );
        let ids: Vec<_> = loaded.rejected.iter().map(|r| r.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("nan_noise"), Some("inf_noise"), Some("negative_noise")]);
        assert!(loaded.rejected.iter().all(|r| r.reason.contains("noise")));

        assert_eq!(loaded.dataset.len(), 1);
        assert_eq!(loaded.dataset.runs()[0].noise, NoiseLevel::new(0.0));
    }

    #[test]
    fn missing_id_is_synthesized() {
        let csv = "run,name,noise,has_result,result,true_parameters,true_states,time\n\
                   odepe,fhn,0.01,False,[],\"{'a': 1}\",{},1\n";
        let loaded = load_from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(loaded.dataset.runs()[0].id, "fhn_1_1e-2");
    }

    #[test]
    fn missing_required_column_aborts() {
        let csv = "run,name,noise,has_result\nodepe,fhn,0,True\n";
        let err = load_from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("time")));
    }

    #[test]
    fn non_identifiable_quantities_are_stripped() {
        let opts = LoadOptions {
            non_identifiable: BTreeMap::from([(
                "biohydrogenation".to_string(),
                vec!["x7".to_string()],
            )]),
        };
        let csv = format!(
            "{HEADER}b,odepe,biohydrogenation,0,True,\"[['k1', 1], ['x7', 5]]\",\"{{'k1': 1}}\",\"{{'x7': 2}}\",1\n"
        );
        let loaded = load_from_reader(csv.as_bytes(), &opts).unwrap();
        let run = &loaded.dataset.runs()[0];
        assert_eq!(loaded.stripped, 1);
        assert_eq!(run.parameter_count(), 1);
        assert!(!run.estimated_values.contains_key("x7"));
    }

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
