//! Command-line interface

pub mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::import::ImportCommands;
use commands::schema::SchemaCommands;
use commands::sheets::SheetsCommands;

#[derive(Parser, Debug)]
#[command(name = "sheetload")]
#[command(about = "Infer table schemas from spreadsheets and load them into a SQL database")]
#[command(version)]
pub struct Cli {
    /// Path to the config file (default: <config dir>/sheetload/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import sheets into tables, replacing any existing table of the same name
    Import(ImportCommands),

    /// List the sheets of a spreadsheet with their sizes
    Sheets(SheetsCommands),

    /// Show the inferred columns and CREATE TABLE for a sheet
    Schema(SchemaCommands),
}
