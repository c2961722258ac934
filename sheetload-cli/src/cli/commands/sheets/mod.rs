pub mod handler;

use std::path::PathBuf;

use clap::Args;

pub use handler::handle_sheets_command;

#[derive(Args, Debug, Clone)]
pub struct SheetsCommands {
    /// Spreadsheet to inspect
    pub source: PathBuf,
}
