//! Plain-text table output.

use fleet_core::{FormattedRow, ReportDescriptor, PLACEHOLDER};

/// Render formatted rows as an aligned table of the descriptor's visible columns.
pub fn render_table(descriptor: &ReportDescriptor, rows: &[FormattedRow]) -> String {
    let columns: Vec<_> = descriptor.visible_columns().collect();
    let cell = |row: &FormattedRow, key: &str| -> String {
        row.get(key).cloned().unwrap_or_else(|| PLACEHOLDER.to_string())
    };

    let widths: Vec<usize> = columns
        .iter()
        .map(|column| {
            rows.iter()
                .map(|row| cell(row, column.key).chars().count())
                .fold(column.label.chars().count(), usize::max)
        })
        .collect();

    let mut out = String::new();
    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| format!("{:<width$}", column.label, width = *width))
        .collect();
    out.push_str(header.join("  ").trim_end());
    out.push('\n');

    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');

    for row in rows {
        let line: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(column, width)| format!("{:<width$}", cell(row, column.key), width = *width))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}
