//! LaTeX (booktabs) renderers.

use std::fmt::Write;

use pebench_core::AggregationStrategy;

use super::{
    format_penalty, format_threshold, format_tiered, format_value, NoiseTable, OverallTable,
    RunLevelTable, SystemTable,
};

/// Escape characters that are special in LaTeX text.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '%' | '&' | '_' | '#' | '$' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape`], used when reading tables back in.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if matches!(next, '%' | '&' | '_' | '#' | '$') {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

fn begin(out: &mut String, caption: &str, label: &str, align: &str) {
    out.push_str("\\begin{table}[ht]\n\\centering\n");
    let _ = writeln!(out, "\\caption{{{caption}}}");
    let _ = writeln!(out, "\\label{{{label}}}");
    let _ = writeln!(out, "\\begin{{tabular}}{{{align}}}");
    out.push_str("\\toprule\n");
}

fn end(out: &mut String) {
    out.push_str("\\bottomrule\n\\end{tabular}\n\\end{table}\n");
}

/// How the error pool is described in captions, and what a failure charges.
fn strategy_caption(strategy: AggregationStrategy) -> (&'static str, &'static str, &'static str) {
    match strategy {
        AggregationStrategy::PooledParameter => {
            ("pooled parameter errors", "parameter estimates", "per parameter")
        }
        AggregationStrategy::PerRunMean => ("per-run mean errors", "runs (mean error)", "per run"),
    }
}

fn row(out: &mut String, cells: &[String]) {
    out.push_str(&cells.join(" & "));
    out.push_str(" \\\\\n");
}

/// Overall performance: success rates, median error, mean runtime.
pub fn overall_table(table: &OverallTable) -> String {
    let mut out = String::new();
    let align = format!("l{}", "c".repeat(table.columns.len()));
    let (pool, unit, charge) = strategy_caption(table.strategy);
    let caption = format!(
        "Overall performance with {pool}. SR-x: fraction of {unit} with relative error $<$x. \
         Failed runs contribute {} {charge}.",
        format_penalty(table.penalty)
    );
    begin(&mut out, &caption, "tab:overall_performance", &align);

    let mut header = vec!["Method".to_string()];
    header.extend(table.columns.iter().map(|c| escape(&c.header)));
    row(&mut out, &header);
    out.push_str("\\midrule\n");

    for r in &table.rows {
        let mut cells = vec![escape(&r.display)];
        cells.extend(
            r.values
                .iter()
                .zip(&table.columns)
                .map(|(v, c)| format_value(*v, c.precision)),
        );
        row(&mut out, &cells);
    }

    end(&mut out);
    out
}

/// Median error (%) by noise level.
pub fn noise_table(table: &NoiseTable) -> String {
    let mut out = String::new();
    let align = format!("l{}", "c".repeat(table.levels.len()));
    let (pool, _, charge) = strategy_caption(table.strategy);
    let caption = format!(
        "Median error (\\%) by noise level, {pool}. Failed runs contribute {} {charge}.",
        format_penalty(table.penalty)
    );
    begin(&mut out, &caption, "tab:noise_performance", &align);

    let mut header = vec!["Method".to_string()];
    header.extend(table.levels.iter().map(|l| match l.exponent() {
        None => "0".to_string(),
        Some(k) => format!("$10^{{{k}}}$"),
    }));
    row(&mut out, &header);
    out.push_str("\\midrule\n");

    for (display, values) in &table.rows {
        let mut cells = vec![escape(display)];
        cells.extend(values.iter().map(|v| format_value(*v, 2)));
        row(&mut out, &cells);
    }

    end(&mut out);
    out
}

/// Median error (%) per system with tiered precision.
pub fn system_table(table: &SystemTable) -> String {
    let mut out = String::new();
    let align = format!("l{}", "c".repeat(table.methods.len()));
    let level = match table.noise {
        Some(n) => format!(" at noise level {n}"),
        None => String::new(),
    };
    let label = match table.noise.and_then(|n| n.exponent()) {
        Some(k) => format!("tab:system_performance_1e{k}"),
        None if table.noise.is_some() => "tab:system_performance_0".to_string(),
        None => "tab:system_performance".to_string(),
    };
    begin(
        &mut out,
        &format!("Median parameter error (\\%) per system{level}."),
        &label,
        &align,
    );

    let mut header = vec!["System".to_string()];
    header.extend(table.methods.iter().map(|m| escape(m)));
    row(&mut out, &header);
    out.push_str("\\midrule\n");

    for (display, values) in &table.rows {
        let mut cells = vec![escape(display)];
        cells.extend(values.iter().map(|v| format_tiered(*v)));
        row(&mut out, &cells);
    }

    end(&mut out);
    out
}

/// Worst-parameter success rates and error quantiles.
pub fn run_level_table(table: &RunLevelTable) -> String {
    let mut out = String::new();
    let align = format!("l{}cc", "c".repeat(table.thresholds.len()));
    let caption = format!(
        "Overall performance with run-level aggregation. Success@X\\%: fraction of runs where \
         \\emph{{all}} parameters have relative error $<$X\\%. Failed runs are assigned {} penalty.",
        format_penalty(table.penalty)
    );
    begin(&mut out, &caption, "tab:run_level_performance", &align);

    let mut header = vec!["Method".to_string()];
    header.extend(
        table
            .thresholds
            .iter()
            .map(|t| format!("Success@{}\\%", format_threshold(*t))),
    );
    header.push("Median Max (\\%)".into());
    header.push("P90 Max (\\%)".into());
    row(&mut out, &header);
    out.push_str("\\midrule\n");

    for r in &table.rows {
        let mut cells = vec![escape(&r.display)];
        cells.extend(r.success.iter().map(|v| format_value(*v, 1)));
        cells.push(format_value(r.median_max, 2));
        cells.push(format_value(r.p90_max, 1));
        row(&mut out, &cells);
    }

    end(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::tables::tests::{metrics, sr10_config};
    use crate::tables::RunLevelRow;
    use pebench_core::{MethodMetrics, MetricsConfig, NoiseLevel};
    use std::collections::BTreeMap;

    #[test]
    fn escape_round_trips() {
        let text = "SR-10 (%) a_b";
        assert_eq!(escape(text), "SR-10 (\\%) a\\_b");
        assert_eq!(unescape(&escape(text)), text);
    }

    #[test]
    fn overall_table_rows() {
        let table = OverallTable::build(
            &[metrics("odepe", Some(0.0123), Some(4.25)), metrics("sciml", None, None)],
            &sr10_config(),
            &ReportConfig::default(),
        );
        let tex = overall_table(&table);
        assert!(tex.contains("\\toprule"));
        assert!(tex.contains("with pooled parameter errors."));
        assert!(tex.contains("Failed runs contribute $10^{6}$ per parameter."));
        assert!(tex.contains("Method & SR-10 (\\%) & Median Error (\\%) & Mean Time (s) \\\\"));
        assert!(tex.contains("ODEPE-GPR & 75.0 & 1.23 & "));
        assert!(tex.contains("SciML & --- & --- & --- \\\\"));
        assert!(tex.trim_end().ends_with("\\end{table}"));
    }

    #[test]
    fn noise_headers_use_exponents() {
        let mut breakdown: BTreeMap<NoiseLevel, MethodMetrics> = BTreeMap::new();
        breakdown.insert(NoiseLevel::new(0.0), metrics("odepe", Some(0.01), None));
        breakdown.insert(NoiseLevel::new(1e-6), metrics("odepe", None, None));
        let table = NoiseTable::build(
            &[("odepe".into(), breakdown)],
            &MetricsConfig::default(),
            &ReportConfig::default(),
        );
        let tex = noise_table(&table);
        assert!(tex.contains("Method & 0 & $10^{-6}$ \\\\"));
        assert!(tex.contains("ODEPE-GPR & 1.00 & --- \\\\"));
    }

    #[test]
    fn system_table_uses_tiers() {
        let mut breakdown: BTreeMap<String, MethodMetrics> = BTreeMap::new();
        breakdown.insert("lotka_volterra".into(), metrics("odepe", Some(0.5), None));
        breakdown.insert("fitzhugh_nagumo".into(), metrics("odepe", Some(1e6), None));
        let table = SystemTable::build(
            Some(NoiseLevel::new(1e-2)),
            &[("odepe".into(), breakdown)],
            &ReportConfig::default(),
        );
        let tex = system_table(&table);
        assert!(tex.contains("tab:system_performance_1e-2"));
        assert!(tex.contains("fitzhugh\\_nagumo & $>1000$ \\\\"));
        assert!(tex.contains("lotka\\_volterra & 50.0 \\\\"));
    }

    #[test]
    fn run_level_headers() {
        let table = RunLevelTable {
            thresholds: vec![1.0, 10.000000000000002],
            rows: vec![RunLevelRow {
                display: "SciML".into(),
                success: vec![Some(25.0), None],
                median_max: Some(3.14159),
                p90_max: None,
            }],
            penalty: 1e6,
        };
        let tex = run_level_table(&table);
        assert!(tex.contains("Method & Success@1\\% & Success@10\\% & Median Max (\\%) & P90 Max (\\%)"));
        assert!(tex.contains("SciML & 25.0 & --- & 3.14 & --- \\\\"));
    }

    #[test]
    fn captions_follow_configured_penalty_and_strategy() {
        let config = MetricsConfig {
            penalty: 1000.0,
            strategy: AggregationStrategy::PerRunMean,
            ..sr10_config()
        };
        let report = ReportConfig::default();

        let overall = overall_table(&OverallTable::build(
            &[metrics("odepe", Some(0.01), None)],
            &config,
            &report,
        ));
        assert!(overall.contains("Overall performance with per-run mean errors."));
        assert!(overall.contains("Failed runs contribute $10^{3}$ per run."));
        assert!(!overall.contains("10^6"));
        assert!(!overall.contains("10^{6}"));

        let noise = noise_table(&NoiseTable::build(&[], &config, &report));
        assert!(noise.contains("by noise level, per-run mean errors."));
        assert!(noise.contains("$10^{3}$ per run."));

        let run_level = run_level_table(&RunLevelTable::build(&[], &config, &report));
        assert!(run_level.contains("\\emph{all}"));
        assert!(run_level.contains("assigned $10^{3}$ penalty."));
    }
}
