//! Markdown summary report.

use super::{format_value, NoiseTable, OverallTable};

/// Overall table (and optional noise breakdown) as a Markdown document.
pub fn summary(table: &OverallTable, noise: Option<&NoiseTable>, fingerprint: &str) -> String {
    let mut report = format!(
        "# Parameter Estimation Benchmark Summary\n\n\
Dataset: `{fingerprint}`\n\n\
## Overall Performance\n\n"
    );

    let mut header = vec!["Method".to_string()];
    header.extend(table.columns.iter().map(|c| c.header.clone()));
    push_header(&mut report, &header);
    for row in &table.rows {
        let mut cells = vec![row.display.clone()];
        cells.extend(
            row.values
                .iter()
                .zip(&table.columns)
                .map(|(v, c)| format_value(*v, c.precision)),
        );
        push_row(&mut report, &cells);
    }

    if let Some(noise) = noise {
        report.push_str("\n## Median Error (%) by Noise Level\n\n");
        let mut header = vec!["Method".to_string()];
        header.extend(noise.levels.iter().map(|l| l.to_string()));
        push_header(&mut report, &header);
        for (display, values) in &noise.rows {
            let mut cells = vec![display.clone()];
            cells.extend(values.iter().map(|v| format_value(*v, 2)));
            push_row(&mut report, &cells);
        }
    }

    let rejected: Vec<_> = table.rows.iter().filter(|r| !r.rejected.is_empty()).collect();
    if !rejected.is_empty() {
        report.push_str("\n## Rejected Records\n\n");
        push_header(&mut report, &["Method".to_string(), "Count".to_string(), "Ids".to_string()]);
        for row in rejected {
            push_row(
                &mut report,
                &[row.display.clone(), row.rejected.len().to_string(), row.rejected.join(", ")],
            );
        }
    }

    report
}

fn push_header(report: &mut String, cells: &[String]) {
    push_row(report, cells);
    let rule: Vec<String> = cells.iter().map(|c| "-".repeat(c.len().max(3))).collect();
    push_row(report, &rule);
}

fn push_row(report: &mut String, cells: &[String]) {
    let cells: Vec<String> = cells.iter().map(|c| escape(c)).collect();
    report.push_str("| ");
    report.push_str(&cells.join(" | "));
    report.push_str(" |\n");
}

/// A bare `|` would end the cell early.
pub fn escape(text: &str) -> String {
    text.replace('|', "\\|")
}
