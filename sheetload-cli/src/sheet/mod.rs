//! Spreadsheet sources: workbooks and delimited files
//!
//! Workbooks (xlsx, xlsm, xlsb, xls, ods) are read with calamine, `.csv` and
//! `.tsv` files with the csv crate. The first row of a sheet is its header.

mod export;
mod reader;
mod select;
mod value;

pub use export::{export_tsv, tsv_file_name};
pub use reader::{RawTable, SpreadsheetSource};
pub use select::{SheetSelector, resolve_sheet_names, select_sheets};
pub use value::{NA_SENTINEL, RawValue, excel_serial_to_date, format_float};
