use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::db::models::*;
use crate::load::LoadStats;

/// How query results are laid out on the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// One block per row, one `label value` line per column.
    #[default]
    Records,
    /// One line per row with aligned columns.
    Table,
}

/// Widest a column may grow in table layout before values are truncated.
const MAX_COLUMN_WIDTH: usize = 40;

/// Truncate a string to fit within max_width (respecting unicode width).
fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + cw + 3 > max_width {
            result.push_str("...");
            break;
        }
        result.push(ch);
        width += cw;
    }
    result
}

/// Left-align `s` in a field `width` columns wide.
fn pad(s: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(s);
    if w >= width {
        s.to_string()
    } else {
        format!("{s}{}", " ".repeat(width - w))
    }
}

/// Render rows as numbered record blocks:
///
/// ```text
/// RESULT 1
/// title                    Heat
/// year                     1995
/// ```
pub fn format_records(table: &ResultTable, label_width: usize) -> String {
    let mut out = String::new();
    for (n, row) in table.rows.iter().enumerate() {
        out.push_str(&format!("RESULT {}\n", n + 1));
        for (name, cell) in table.columns.iter().zip(row) {
            out.push_str(&pad(name, label_width));
            out.push_str(&cell_text(cell));
            out.push('\n');
        }
    }
    out
}

/// Render rows as an aligned grid with a header line.
pub fn format_table(table: &ResultTable) -> String {
    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|c| truncate(&cell_text(c), MAX_COLUMN_WIDTH))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|r| UnicodeWidthStr::width(r[i].as_str()))
                .chain(std::iter::once(UnicodeWidthStr::width(name.as_str())))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(name, w)| pad(&name.to_uppercase(), *w))
        .collect();
    let rule_width = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);

    let mut out = String::new();
    out.push_str(&format!("  {}\n", header.join("  ").trim_end()));
    out.push_str(&format!("  {}\n", "-".repeat(rule_width)));
    for row in &cells {
        let line: Vec<String> = row.iter().zip(&widths).map(|(c, w)| pad(c, *w)).collect();
        out.push_str(&format!("  {}\n", line.join("  ").trim_end()));
    }
    out
}

/// Print a query result in the chosen layout.
pub fn print_results(table: &ResultTable, layout: Layout, label_width: usize) {
    if table.is_empty() {
        println!("No movies match.");
        return;
    }

    println!(
        "{} movie{}:\n",
        table.len(),
        if table.len() == 1 { "" } else { "s" }
    );

    match layout {
        Layout::Records => print!("{}", format_records(table, label_width)),
        Layout::Table => print!("{}", format_table(table)),
    }
}

/// Print a pick list for `mvq values`.
pub fn print_values(values: &[String]) {
    if values.is_empty() {
        println!("No values found. Has the table been loaded?");
        return;
    }
    for v in values {
        println!("  {v}");
    }
    println!("\n{} value{}", values.len(), if values.len() == 1 { "" } else { "s" });
}

/// Print per-file loader results.
pub fn print_load_stats(stats: &[LoadStats], dry_run: bool) {
    let verb = if dry_run { "would load" } else { "loaded" };
    for s in stats {
        let skipped = if s.skipped > 0 {
            format!(" ({} skipped)", s.skipped)
        } else {
            String::new()
        };
        println!(
            "  {:<36} -> {:<18} {verb} {} rows{skipped}",
            s.file, s.table, s.rows
        );
    }
}

/// Print database stats.
pub fn print_stats(stats: &DbStats) {
    println!("Database Statistics:");
    for t in &stats.tables {
        println!("  {:<20} {}", t.table, t.rows);
    }
    println!("  {:<20} {}", "DB Size", format_bytes(stats.db_size_bytes));
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
