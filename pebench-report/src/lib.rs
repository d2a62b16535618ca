//! pebench report: everything between the benchmark CSV and a published table.
//!
//! This crate provides:
//! - CSV ingest with Python-literal cell parsing and row-level rejection
//! - Non-identifiable quantity filtering
//! - LaTeX and Markdown tables built from engine results
//! - Strategy drift reports and audits of rendered tables
//! - Versioned JSON and flat CSV metric exports

pub mod audit;
pub mod config;
pub mod export;
pub mod identifiability;
pub mod literal;
pub mod loader;
pub mod tables;

pub use audit::{audit_table, drift_report, parse_latex_table, AuditError, AuditFinding, DriftRow};
pub use config::{MethodLabel, ReportConfig, ReportConfigError};
pub use export::{build_report, MetricsReport, SCHEMA_VERSION};
pub use loader::{load_csv, load_from_reader, LoadError, LoadOptions, LoadedData, RowRejection};
pub use tables::{NoiseTable, OverallTable, RunLevelTable, SystemTable};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_is_send_sync() {
        assert_send::<MetricsReport>();
        assert_sync::<MetricsReport>();
    }

    #[test]
    fn report_config_is_send_sync() {
        assert_send::<ReportConfig>();
        assert_sync::<ReportConfig>();
    }
}
