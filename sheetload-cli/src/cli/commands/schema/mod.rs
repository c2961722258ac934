pub mod handler;

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::load::Dialect;

pub use handler::handle_schema_command;

#[derive(Args, Debug, Clone)]
pub struct SchemaCommands {
    /// Spreadsheet to inspect
    pub source: PathBuf,

    /// Sheet name
    #[arg(long, value_name = "NAME", conflicts_with = "sheet_index")]
    pub sheet: Option<String>,

    /// Sheet position (0-based)
    #[arg(long, value_name = "N")]
    pub sheet_index: Option<usize>,

    /// SQL dialect of the generated CREATE TABLE
    #[arg(long, value_enum, default_value = "postgres")]
    pub dialect: DialectArg,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: SchemaFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DialectArg {
    Postgres,
    Sqlite,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Sqlite => Dialect::Sqlite,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SchemaFormat {
    /// Column list and CREATE TABLE
    Text,
    /// Column specs as JSON
    Json,
}
