//! Read workbooks and delimited files into raw tables

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use calamine::{Reader, open_workbook_auto};

use super::value::RawValue;
use crate::error::ImportError;

/// One sheet's worth of untyped data
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Sheet name (file stem for delimited files)
    pub name: String,
    /// Header labels from the first row; `None` where the header cell is empty
    pub headers: Vec<Option<String>>,
    /// Data rows, each padded to the header width
    pub rows: Vec<Vec<RawValue>>,
    /// 1-based sheet row holding the headers
    pub header_row: usize,
}

impl RawTable {
    /// Build a table from a grid whose first row holds the headers
    pub fn from_grid(name: impl Into<String>, mut grid: Vec<Vec<RawValue>>) -> Self {
        let name = name.into();
        if grid.is_empty() {
            return Self {
                name,
                headers: Vec::new(),
                rows: Vec::new(),
                header_row: 1,
            };
        }

        let header_row = grid.remove(0);
        let width = grid
            .iter()
            .map(|r| r.len())
            .chain(std::iter::once(header_row.len()))
            .max()
            .unwrap_or(0);

        let mut headers: Vec<Option<String>> = header_row
            .iter()
            .map(|cell| {
                if cell.is_absent() {
                    None
                } else {
                    cell.as_text().map(|s| s.trim().to_string())
                }
            })
            .collect();
        headers.resize(width, None);

        let rows = grid
            .into_iter()
            .map(|mut row| {
                row.resize(width, RawValue::Absent);
                row
            })
            .collect();

        Self {
            name,
            headers,
            rows,
            header_row: 1,
        }
    }

    /// Place the header on a sheet row other than the first
    pub fn with_header_row(mut self, header_row: usize) -> Self {
        self.header_row = header_row;
        self
    }

    /// Sheet row number of the first data row
    pub fn first_data_row(&self) -> usize {
        self.header_row + 1
    }

    /// Whether the sheet has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns (header width)
    pub fn width(&self) -> usize {
        self.headers.len()
    }
}

/// Kind of file behind a source path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Workbook,
    Delimited(u8),
}

/// A spreadsheet file on disk
#[derive(Debug, Clone)]
pub struct SpreadsheetSource {
    path: PathBuf,
    kind: SourceKind,
}

impl SpreadsheetSource {
    /// Open a source, deciding the reader from the file extension
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ImportError::source(path.display().to_string(), "file does not exist").into());
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let kind = match extension.as_str() {
            "csv" => SourceKind::Delimited(b','),
            "tsv" | "tab" => SourceKind::Delimited(b'\t'),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => SourceKind::Workbook,
            other => {
                return Err(ImportError::source(
                    path.display().to_string(),
                    format!("unsupported file type '{}'", other),
                )
                .into());
            }
        };

        Ok(Self { path, kind })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without extension, used to name delimited sheets and TSV exports
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "sheet".to_string())
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> Result<Vec<String>> {
        match self.kind {
            SourceKind::Workbook => {
                let workbook = open_workbook_auto(&self.path).with_context(|| {
                    format!("Failed to open workbook: {}", self.path.display())
                })?;
                Ok(workbook.sheet_names().to_vec())
            }
            SourceKind::Delimited(_) => Ok(vec![self.stem()]),
        }
    }

    /// Read one sheet by its exact name
    pub fn read_sheet(&self, sheet_name: &str) -> Result<RawTable> {
        match self.kind {
            SourceKind::Workbook => self.read_workbook_sheet(sheet_name),
            SourceKind::Delimited(delimiter) => self.read_delimited(delimiter),
        }
    }

    fn read_workbook_sheet(&self, sheet_name: &str) -> Result<RawTable> {
        let mut workbook = open_workbook_auto(&self.path)
            .with_context(|| format!("Failed to open workbook: {}", self.path.display()))?;

        let range = workbook
            .worksheet_range(sheet_name)
            .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

        let grid: Vec<Vec<RawValue>> = range
            .rows()
            .map(|row| row.iter().map(RawValue::from_cell).collect())
            .collect();

        // The range starts at the first used cell, not at A1
        let header_row = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
        let table = RawTable::from_grid(sheet_name, grid).with_header_row(header_row);
        log::debug!(
            "Read sheet '{}': {} columns, {} rows",
            sheet_name,
            table.width(),
            table.rows.len()
        );
        Ok(table)
    }

    fn read_delimited(&self, delimiter: u8) -> Result<RawTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open file: {}", self.path.display()))?;

        let mut grid = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record
                .with_context(|| format!("Failed to parse line {} of {}", line + 1, self.path.display()))?;
            grid.push(record.iter().map(RawValue::from_field).collect());
        }

        Ok(RawTable::from_grid(self.stem(), grid))
    }
}
