//! Schema command handler

use anyhow::{Context, Result};
use colored::*;

use super::{SchemaCommands, SchemaFormat};
use crate::cli::output::print_columns;
use crate::load::{Dialect, TargetTable};
use crate::schema::{SAMPLE_SIZE, infer};
use crate::sheet::{SheetSelector, SpreadsheetSource, select_sheets};

pub async fn handle_schema_command(args: SchemaCommands) -> Result<()> {
    let selector = match (&args.sheet, args.sheet_index) {
        (Some(name), _) => SheetSelector::Name(name.clone()),
        (None, Some(index)) => SheetSelector::Index(index),
        (None, None) => SheetSelector::Only,
    };

    let source = SpreadsheetSource::open(&args.source)?;
    let sheets = select_sheets(&source, &selector)?;
    let Some(sheet) = sheets.into_iter().next() else {
        anyhow::bail!("No sheet selected in {}", args.source.display());
    };

    let target = TargetTable::new(&sheet.name, infer(&sheet.headers, &sheet.rows));

    match args.format {
        SchemaFormat::Json => {
            let json = serde_json::to_string_pretty(&target)
                .context("Failed to format JSON output")?;
            println!("{}", json);
        }
        SchemaFormat::Text => {
            let dialect = Dialect::from(args.dialect);
            println!("Sheet: {}", sheet.name.cyan());
            println!(
                "{}",
                format!(
                    "Types inferred from the first {} non-empty values of {} rows",
                    SAMPLE_SIZE,
                    sheet.rows.len()
                )
                .dimmed()
            );
            print_columns(&target);
            println!();
            println!("{};", target.create_sql(dialect));
        }
    }

    Ok(())
}
