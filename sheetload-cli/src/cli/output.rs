//! Terminal rendering shared by the commands

use colored::*;

use crate::load::{LoadReport, TargetTable};
use crate::schema::StorageType;

/// Failures listed per table before the rest are summarized
const MAX_LISTED_FAILURES: usize = 10;

fn colored_type(storage_type: StorageType) -> ColoredString {
    let label = storage_type.to_string();
    match storage_type {
        StorageType::Integer | StorageType::Decimal => label.cyan(),
        StorageType::Date => label.magenta(),
        StorageType::Text => label.normal(),
    }
}

pub fn print_columns(target: &TargetTable) {
    println!("Table: {}", target.name.bright_green().bold());
    let width = target
        .columns
        .iter()
        .map(|c| c.identifier.len())
        .max()
        .unwrap_or(0);

    for column in &target.columns {
        println!(
            "  {:width$}  {:8}  {}",
            column.identifier,
            colored_type(column.storage_type),
            column.original_label.dimmed(),
            width = width
        );
    }
}

pub fn print_report(report: &LoadReport) {
    println!();
    println!("{}", report.table.bright_green().bold());
    println!("  Inserted: {}", report.inserted.to_string().green());
    if report.failed > 0 {
        println!("  Failed:   {}", report.failed.to_string().red());
    } else {
        println!("  Failed:   {}", report.failed);
    }
    println!("  Skipped:  {} {}", report.skipped, "(empty rows)".dimmed());

    if report.verification_mismatch() {
        println!(
            "  Verified: {} {}",
            report.verified.to_string().yellow(),
            "(does not match inserted count)".yellow()
        );
    } else {
        println!("  Verified: {}", report.verified);
    }

    for failure in report.failures.iter().take(MAX_LISTED_FAILURES) {
        println!("    {} {}", "✗".red(), failure);
    }
    if report.failures.len() > MAX_LISTED_FAILURES {
        println!(
            "    {}",
            format!("... and {} more", report.failures.len() - MAX_LISTED_FAILURES).dimmed()
        );
    }
}
