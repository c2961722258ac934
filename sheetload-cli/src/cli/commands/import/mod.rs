pub mod handler;

use std::path::PathBuf;

use clap::Args;

use crate::config::ImportProfile;

pub use handler::handle_import_command;

#[derive(Args, Debug, Clone, Default)]
pub struct ImportCommands {
    /// Spreadsheet to import (.xlsx, .xlsm, .xlsb, .xls, .ods, .csv, .tsv)
    pub source: Option<PathBuf>,

    /// Import the sheet with this name
    #[arg(long, value_name = "NAME", conflicts_with_all = ["sheet_index", "all_sheets"])]
    pub sheet: Option<String>,

    /// Import the sheet at this 0-based position
    #[arg(long, value_name = "N", conflicts_with = "all_sheets")]
    pub sheet_index: Option<usize>,

    /// Import every sheet, one table each
    #[arg(long)]
    pub all_sheets: bool,

    /// Sheet to leave out with --all-sheets (repeatable)
    #[arg(long = "skip-sheet", value_name = "NAME")]
    pub skip_sheets: Vec<String>,

    /// Target table name (single sheet)
    #[arg(long, value_name = "NAME", conflicts_with = "table_prefix")]
    pub table: Option<String>,

    /// Prefix for per-sheet table names
    #[arg(long, value_name = "PREFIX")]
    pub table_prefix: Option<String>,

    /// Write the normalized records to this JSON file before loading
    #[arg(long, value_name = "FILE")]
    pub backup: Option<PathBuf>,

    /// Also save each imported sheet as TSV in this directory
    #[arg(long, value_name = "DIR")]
    pub export_tsv: Option<PathBuf>,

    /// Start from a profile in the config file
    #[arg(long, short)]
    pub profile: Option<String>,

    /// Infer and normalize only; do not touch the database
    #[arg(long)]
    pub dry_run: bool,
}

impl ImportCommands {
    /// Flags as a profile, to be layered over a saved one
    pub fn as_overrides(&self) -> ImportProfile {
        ImportProfile {
            source: self.source.clone(),
            sheet: self.sheet.clone(),
            sheet_index: self.sheet_index,
            all_sheets: self.all_sheets,
            skip_sheets: self.skip_sheets.clone(),
            table: self.table.clone(),
            table_prefix: self.table_prefix.clone(),
            backup: self.backup.clone(),
            export_tsv: self.export_tsv.clone(),
        }
    }
}
