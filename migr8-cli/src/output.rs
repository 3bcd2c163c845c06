//! Terminal output
//!
//! Banner and end-of-run results table.

use colored::*;
use migr8_core::domain::manifest::Manifest;
use migr8_core::domain::run::RunMode;
use migr8_orchestrator::service::{ReportCell, ReportTable};

const NAME_HEADER: &str = "APPLICATION";

/// Prints the run banner
pub fn print_banner(mode: RunMode, manifest: &Manifest) {
    println!();
    println!("{}", format!("migr8 {}", mode.command_name()).cyan().bold());
    if !manifest.app.is_empty() {
        println!("  Stack:        {}", manifest.app.bold());
    }
    println!("  Organization: {}", manifest.org_url().dimmed());
    println!(
        "  Applications: {}",
        manifest.infrastructure.len().to_string().cyan()
    );
    println!();
}

/// Prints the results table of a run
pub fn print_summary(table: &ReportTable, elapsed: chrono::Duration) {
    println!();
    println!("{}", "Run Summary".bold());
    println!("{}", render_table(table, true));

    let failures = table.failures();
    if failures == 0 {
        println!(
            "{} ({}s)",
            "✓ All applications succeeded".green().bold(),
            elapsed.num_seconds()
        );
    } else {
        println!(
            "{} ({}s)",
            format!("✗ {} application(s) with failed stages", failures).red().bold(),
            elapsed.num_seconds()
        );
    }
    println!();
}

/// Renders the table as aligned text, optionally colored
fn render_table(table: &ReportTable, color: bool) -> String {
    let name_width = table
        .rows
        .iter()
        .map(|row| row.application.len())
        .chain(std::iter::once(NAME_HEADER.len()))
        .max()
        .unwrap_or(NAME_HEADER.len());

    let column_widths: Vec<usize> = table
        .stages
        .iter()
        .map(|stage| stage.label().len().max("SUCCESS".len()))
        .collect();

    let mut lines = Vec::with_capacity(table.rows.len() + 2);

    let mut header = format!("{:<width$}", NAME_HEADER, width = name_width);
    for (stage, width) in table.stages.iter().zip(&column_widths) {
        header.push_str(&format!("  {:<width$}", stage.label(), width = width));
    }
    let separator = "─".repeat(header.chars().count());
    lines.push(if color { header.bold().to_string() } else { header });
    lines.push(if color { separator.dimmed().to_string() } else { separator });

    for row in &table.rows {
        let mut line = format!("{:<width$}", row.application, width = name_width);
        for (cell, width) in row.cells.iter().zip(&column_widths) {
            let text = format!("{:<width$}", cell.to_string(), width = width);
            let text = if color { paint(*cell, &text) } else { text };
            line.push_str("  ");
            line.push_str(&text);
        }
        lines.push(line.trim_end().to_string());
    }

    lines.join("\n")
}

fn paint(cell: ReportCell, text: &str) -> String {
    match cell {
        ReportCell::Success => text.green().to_string(),
        ReportCell::Failed => text.red().bold().to_string(),
        ReportCell::NotApplicable => text.dimmed().to_string(),
    }
}
