//! Sheets command handler

use anyhow::Result;
use colored::*;

use super::SheetsCommands;
use crate::sheet::SpreadsheetSource;

pub async fn handle_sheets_command(args: SheetsCommands) -> Result<()> {
    let source = SpreadsheetSource::open(&args.source)?;
    let names = source.sheet_names()?;

    if names.is_empty() {
        println!("{}", "No sheets found".yellow());
        return Ok(());
    }

    println!(
        "{} sheet(s) in {}",
        names.len(),
        args.source.display().to_string().cyan()
    );
    for (i, name) in names.iter().enumerate() {
        let table = source.read_sheet(name)?;
        println!(
            "  {:>3}  {}  {}",
            i,
            name.bright_green(),
            format!("{} rows, {} columns", table.rows.len(), table.width()).dimmed()
        );
    }

    Ok(())
}
