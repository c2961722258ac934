//! Schema inference: identifiers and storage types for spreadsheet columns

mod identifier;
mod infer;

pub use identifier::{PLACEHOLDER, SURROGATE_KEY, identifier, quote, table_name, unique_identifiers};
pub use infer::{ColumnSpec, SAMPLE_SIZE, StorageType, column_sample, infer, infer_type};
