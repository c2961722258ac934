//! Untyped cell values as read from a spreadsheet

use calamine::Data;
use chrono::{Duration, NaiveDate};

/// Text that marks a missing value in exported spreadsheets
pub const NA_SENTINEL: &str = "#N/A";

/// A single cell, before any type has been decided for its column
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// No data (empty cell, error cell, missing trailing cell)
    Absent,
    /// Text as typed into the cell
    Text(String),
    /// Whole number
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Boolean cell
    Bool(bool),
    /// Date cell (time of day is dropped)
    Date(NaiveDate),
}

impl RawValue {
    /// Whether this cell counts as "no data"
    ///
    /// Empty or whitespace-only text and the `#N/A` marker are absent too,
    /// whatever type the column ends up with.
    pub fn is_absent(&self) -> bool {
        match self {
            RawValue::Absent => true,
            RawValue::Text(s) => {
                let trimmed = s.trim();
                trimmed.is_empty() || trimmed == NA_SENTINEL
            }
            RawValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Text form of the cell, used for header labels and substring checks
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Absent => None,
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Int(i) => Some(i.to_string()),
            RawValue::Float(f) => Some(format_float(*f)),
            RawValue::Bool(b) => Some(b.to_string()),
            RawValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }

    /// Convert a calamine cell
    pub fn from_cell(cell: &Data) -> Self {
        match cell {
            Data::Empty => RawValue::Absent,
            Data::Error(_) => RawValue::Absent,
            Data::String(s) => RawValue::Text(s.clone()),
            Data::Int(i) => RawValue::Int(*i),
            Data::Float(f) => RawValue::Float(*f),
            Data::Bool(b) => RawValue::Bool(*b),
            Data::DateTime(dt) => match excel_serial_to_date(dt.as_f64()) {
                Some(date) => RawValue::Date(date),
                None => RawValue::Float(dt.as_f64()),
            },
            Data::DateTimeIso(s) => match parse_iso_date(s) {
                Some(date) => RawValue::Date(date),
                None => RawValue::Text(s.clone()),
            },
            Data::DurationIso(s) => RawValue::Text(s.clone()),
        }
    }

    /// Convert a field from a delimited text file
    pub fn from_field(field: &str) -> Self {
        if field.is_empty() {
            RawValue::Absent
        } else {
            RawValue::Text(field.to_string())
        }
    }
}

/// Render a float the way a spreadsheet shows it: whole values without a fraction
pub fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Convert an Excel serial day number (1900 date system) to a date
///
/// Serials below 61 fall before the phantom 1900-02-29 and are not dates
/// anyone types into a ledger, so they are rejected.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 61.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let date_part = s.split('T').next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
