//! Convert raw cells into storage-ready values for their column type

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::schema::StorageType;
use crate::sheet::{RawValue, format_float};

/// The only date layout accepted in text cells (month/day/2-digit year)
pub const DATE_FORMAT: &str = "%m/%d/%y";

/// A value ready to be bound to an insert
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedValue {
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
    Text(String),
}

impl Serialize for NormalizedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NormalizedValue::Integer(i) => serializer.serialize_i64(*i),
            NormalizedValue::Decimal(f) => serializer.serialize_f64(*f),
            NormalizedValue::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            NormalizedValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// A cell that cannot be stored in its column's type
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeError {
    pub value: String,
    pub storage_type: StorageType,
}

impl std::fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' is not a valid {} value", self.value, self.storage_type)
    }
}

impl std::error::Error for NormalizeError {}

/// Normalize one cell for a column of the given type
///
/// Returns `Ok(None)` for absent cells (empty, `#N/A`) and for dates that do
/// not parse; dates are best-effort and never fail a row.
pub fn normalize(raw: &RawValue, storage_type: StorageType) -> Result<Option<NormalizedValue>, NormalizeError> {
    if raw.is_absent() {
        return Ok(None);
    }

    let invalid = || NormalizeError {
        value: raw.as_text().unwrap_or_default(),
        storage_type,
    };

    match storage_type {
        StorageType::Integer => match raw {
            RawValue::Int(i) => Ok(Some(NormalizedValue::Integer(*i))),
            RawValue::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Ok(Some(NormalizedValue::Integer(*f as i64)))
            }
            RawValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| Some(NormalizedValue::Integer(i)))
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        },
        StorageType::Decimal => match raw {
            RawValue::Int(i) => Ok(Some(NormalizedValue::Decimal(*i as f64))),
            RawValue::Float(f) => Ok(Some(NormalizedValue::Decimal(*f))),
            RawValue::Text(s) => parse_decorated_number(s)
                .map(|f| Some(NormalizedValue::Decimal(f)))
                .ok_or_else(invalid),
            _ => Err(invalid()),
        },
        StorageType::Date => Ok(match raw {
            RawValue::Date(d) => Some(NormalizedValue::Date(*d)),
            RawValue::Text(s) => parse_date_text(s).map(NormalizedValue::Date),
            _ => None,
        }),
        StorageType::Text => Ok(Some(NormalizedValue::Text(match raw {
            RawValue::Text(s) => s.clone(),
            RawValue::Float(f) => format_float(*f),
            other => other.as_text().unwrap_or_default(),
        }))),
    }
}

/// Parse a plain number: no currency, percent or grouping decorations
pub fn parse_plain_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Parse a number that may carry currency, percent or grouping decorations
///
/// - `-$949.05` -> `-949.05`
/// - `$1,200.50` -> `1200.50`
/// - `37%` -> `37` (the percent sign is dropped, the value is not scaled)
/// - `1,200` -> `1200`
pub fn parse_decorated_number(s: &str) -> Option<f64> {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("-$") {
        return parse_grouped(rest).map(|f| -f);
    }
    if let Some(rest) = s.strip_prefix('$') {
        return parse_grouped(rest);
    }
    if let Some(rest) = s.strip_suffix('%') {
        return parse_grouped(rest);
    }
    parse_grouped(s)
}

fn parse_grouped(s: &str) -> Option<f64> {
    parse_plain_number(&s.replace(',', ""))
}

/// Parse a text date in [`DATE_FORMAT`]
pub fn parse_date_text(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}
