//! Aggregation drift and table audits.
//!
//! Two checks guard published numbers:
//! 1. Drift: the same method's median under both aggregation strategies,
//!    so a script that silently switched strategy shows up as a gap.
//! 2. Table audit: a rendered LaTeX overall table is parsed back and every
//!    cell is compared with a fresh recomputation.

use pebench_core::{Dataset, MetricsEngine};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ReportConfig;
use crate::tables::latex::unescape;
use crate::tables::{to_percent, OverallTable, NO_DATA};

/// Extra slack, in display units, beyond the rounding of the printed value.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

// ─── Drift ───────────────────────────────────────────────────────────

/// Median error (%) of one method under both strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftRow {
    pub method: String,
    pub pooled_parameter_pct: Option<f64>,
    pub per_run_mean_pct: Option<f64>,
    /// `pooled - per_run`, in percentage points.
    pub difference_pp: Option<f64>,
    pub pooled_size: usize,
    pub per_run_size: usize,
}

pub fn drift_report(engine: &MetricsEngine, dataset: &Dataset, methods: &[String]) -> Vec<DriftRow> {
    methods
        .iter()
        .map(|method| {
            let cmp = engine.strategy_comparison(dataset, method);
            DriftRow {
                method: cmp.method.clone(),
                pooled_parameter_pct: cmp.pooled_parameter_median.map(to_percent),
                per_run_mean_pct: cmp.per_run_mean_median.map(to_percent),
                difference_pp: cmp.difference().map(to_percent),
                pooled_size: cmp.pooled_size,
                per_run_size: cmp.per_run_size,
            }
        })
        .collect()
}

/// Plain-text drift table.
pub fn render_drift(rows: &[DriftRow], report: &ReportConfig) -> String {
    let fmt = |v: Option<f64>| v.map_or_else(|| NO_DATA.to_string(), |v| format!("{v:.2}"));
    let mut out = format!(
        "{:<24} {:>16} {:>16} {:>12} {:>8} {:>8}\n",
        "Method", "Pooled (%)", "Per-run (%)", "Diff (pp)", "N pool", "N runs"
    );
    out.push_str(&"-".repeat(89));
    out.push('\n');
    for row in rows {
        out.push_str(&format!(
            "{:<24} {:>16} {:>16} {:>12} {:>8} {:>8}\n",
            report.method_name(&row.method),
            fmt(row.pooled_parameter_pct),
            fmt(row.per_run_mean_pct),
            fmt(row.difference_pp),
            row.pooled_size,
            row.per_run_size,
        ));
    }
    out
}

// ─── Table audit ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("no header row starting with 'Method &'")]
    MissingHeader,

    #[error("line {line}: cannot parse '{cell}' in column '{column}'")]
    BadCell {
        line: usize,
        column: String,
        cell: String,
    },
}

/// Numbers read back from a rendered LaTeX table.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    /// Plain headers, `Method` excluded.
    pub columns: Vec<String>,
    /// `(method display name, one value per column)`.
    pub rows: Vec<(String, Vec<Option<f64>>)>,
}

/// A table cell that disagrees with the recomputed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditFinding {
    pub method: String,
    pub column: String,
    pub table_value: Option<f64>,
    pub computed: Option<f64>,
}

fn split_row(line: &str) -> Vec<String> {
    let line = line.trim();
    let line = line.strip_suffix("\\\\").unwrap_or(line);
    line.split('&').map(|c| unescape(c.trim())).collect()
}

fn parse_cell(cell: &str) -> Option<Option<f64>> {
    match cell {
        NO_DATA | "N/A" | "" => Some(None),
        _ => cell.parse::<f64>().ok().map(Some),
    }
}

/// Parse the rows of a LaTeX table whose first column is `Method`.
pub fn parse_latex_table(tex: &str) -> Result<ParsedTable, AuditError> {
    let mut lines = tex.lines().enumerate();

    let columns = loop {
        let Some((_, line)) = lines.next() else {
            return Err(AuditError::MissingHeader);
        };
        if !line.contains('&') {
            continue;
        }
        let cells = split_row(line);
        if cells.first().map(String::as_str) == Some("Method") {
            break cells[1..].to_vec();
        }
    };

    let mut rows = Vec::new();
    for (i, line) in lines {
        let trimmed = line.trim();
        if trimmed.starts_with("\\bottomrule") || trimmed.starts_with("\\end{tabular}") {
            break;
        }
        if !trimmed.contains('&') {
            continue;
        }
        let cells = split_row(trimmed);
        let method = cells[0].clone();
        let mut values = Vec::with_capacity(columns.len());
        for (column, cell) in columns.iter().zip(cells.iter().skip(1)) {
            let value = parse_cell(cell).ok_or_else(|| AuditError::BadCell {
                line: i + 1,
                column: column.clone(),
                cell: cell.clone(),
            })?;
            values.push(value);
        }
        rows.push((method, values));
    }

    Ok(ParsedTable { columns, rows })
}

/// Compare a parsed table with freshly computed numbers.
///
/// A cell passes when it is within half a unit of its printed precision plus
/// `tolerance`. A value printed where none was computed (or the reverse) is
/// always a finding.
pub fn audit_table(parsed: &ParsedTable, expected: &OverallTable, tolerance: f64) -> Vec<AuditFinding> {
    let mut findings = Vec::new();

    for (method, values) in &parsed.rows {
        let Some(row) = expected.row(method) else {
            warn!(method = %method, "table row has no computed counterpart");
            continue;
        };
        for (column, table_value) in parsed.columns.iter().zip(values) {
            let Some(idx) = expected.column_index(column) else {
                warn!(column = %column, "table column has no computed counterpart");
                continue;
            };
            let computed = row.values[idx];
            let slack = 0.5 * 10f64.powi(-(expected.columns[idx].precision as i32)) + tolerance;
            let agrees = match (table_value, computed) {
                (Some(t), Some(c)) => (t - c).abs() <= slack,
                (None, None) => true,
                _ => false,
            };
            if !agrees {
                findings.push(AuditFinding {
                    method: method.clone(),
                    column: column.clone(),
                    table_value: *table_value,
                    computed,
                });
            }
        }
    }

    info!(
        rows = parsed.rows.len(),
        findings = findings.len(),
        "audited table"
    );
    findings
}

/// Plain-text list of findings.
pub fn render_findings(findings: &[AuditFinding]) -> String {
    if findings.is_empty() {
        return "All audited cells match the recomputed metrics.\n".to_string();
    }
    let fmt = |v: Option<f64>| v.map_or_else(|| NO_DATA.to_string(), |v| format!("{v:.4}"));
    let mut out = format!("{} cell(s) disagree:\n", findings.len());
    for f in findings {
        out.push_str(&format!(
            "  {} / {}: table {} vs computed {}\n",
            f.method,
            f.column,
            fmt(f.table_value),
            fmt(f.computed)
        ));
    }
    out
}
