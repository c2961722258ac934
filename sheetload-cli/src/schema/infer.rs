//! Column type inference from a small content sample
//!
//! The rules are an ordered list, first match wins:
//!
//! 1. every sample is a whole number -> Integer
//! 2. every sample is numeric -> Decimal
//! 3. every sample is a date -> Date
//! 4. currency hint (`$` in a sample, or in the header with numeric samples) -> Decimal
//! 5. percent hint (`%` in a sample, or in the header with numeric samples) -> Decimal
//! 6. Text
//!
//! Known false positive: a free-text column whose first samples happen to
//! contain a literal `$` or `%` is typed Decimal, and its non-numeric rows
//! then fail normalization.

use serde::{Deserialize, Serialize};

use super::identifier::{SURROGATE_KEY, unique_identifiers};
use crate::normalize::{parse_date_text, parse_decorated_number, parse_plain_number};
use crate::sheet::RawValue;

/// Number of non-absent values examined per column
pub const SAMPLE_SIZE: usize = 5;

/// Relational type chosen for a spreadsheet column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Integer,
    Decimal,
    Date,
    Text,
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageType::Integer => write!(f, "Integer"),
            StorageType::Decimal => write!(f, "Decimal"),
            StorageType::Date => write!(f, "Date"),
            StorageType::Text => write!(f, "Text"),
        }
    }
}

/// One inferred column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Header label as it appeared in the sheet (empty when the header cell was blank)
    pub original_label: String,
    /// Unique SQL-safe identifier
    pub identifier: String,
    pub storage_type: StorageType,
}

/// Infer column specs for a header row and its data rows
///
/// Only the first [`SAMPLE_SIZE`] non-absent values of each column are looked at.
pub fn infer(headers: &[Option<String>], rows: &[Vec<RawValue>]) -> Vec<ColumnSpec> {
    let identifiers = unique_identifiers(headers.iter().map(|h| h.as_deref()), &[SURROGATE_KEY]);

    headers
        .iter()
        .zip(identifiers)
        .enumerate()
        .map(|(col, (header, identifier))| {
            let sample = column_sample(rows, col);
            let header = header.clone().unwrap_or_default();
            let storage_type = infer_type(&header, &sample);

            if sample.is_empty() {
                log::debug!("Column '{}' has no values, defaulting to Text", identifier);
            } else {
                log::debug!(
                    "Column '{}' inferred as {} from {} samples",
                    identifier,
                    storage_type,
                    sample.len()
                );
            }

            ColumnSpec {
                original_label: header,
                identifier,
                storage_type,
            }
        })
        .collect()
}

/// First non-absent values of one column
pub fn column_sample(rows: &[Vec<RawValue>], col: usize) -> Vec<&RawValue> {
    rows.iter()
        .filter_map(|row| row.get(col))
        .filter(|v| !v.is_absent())
        .take(SAMPLE_SIZE)
        .collect()
}

/// Apply the ordered rule list to one column's sample
pub fn infer_type(header: &str, sample: &[&RawValue]) -> StorageType {
    if sample.is_empty() {
        return StorageType::Text;
    }

    if sample.iter().all(|v| is_whole(v)) {
        return StorageType::Integer;
    }
    if sample.iter().all(|v| is_numeric(v)) {
        return StorageType::Decimal;
    }
    if sample.iter().all(|v| is_date(v)) {
        return StorageType::Date;
    }
    if has_marker_hint(header, sample, '$') || has_marker_hint(header, sample, '%') {
        return StorageType::Decimal;
    }

    StorageType::Text
}

fn is_whole(value: &RawValue) -> bool {
    match value {
        RawValue::Int(_) => true,
        RawValue::Float(f) => f.is_finite() && f.fract() == 0.0,
        RawValue::Text(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_numeric(value: &RawValue) -> bool {
    match value {
        RawValue::Int(_) => true,
        RawValue::Float(f) => f.is_finite(),
        RawValue::Text(s) => parse_plain_number(s).is_some(),
        _ => false,
    }
}

fn is_date(value: &RawValue) -> bool {
    match value {
        RawValue::Date(_) => true,
        RawValue::Text(s) => parse_date_text(s).is_some(),
        _ => false,
    }
}

/// A marker character hints at a decorated number column
///
/// Either a sampled text contains the marker, or the header carries it and
/// every sample reads as a number once decorations are stripped.
fn has_marker_hint(header: &str, sample: &[&RawValue], marker: char) -> bool {
    let in_values = sample
        .iter()
        .any(|v| matches!(v, RawValue::Text(s) if s.contains(marker)));
    if in_values {
        return true;
    }

    header.contains(marker)
        && sample.iter().all(|v| match v {
            RawValue::Text(s) => parse_decorated_number(s).is_some(),
            other => is_numeric(other),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn texts(values: &[&str]) -> Vec<Vec<RawValue>> {
        values
            .iter()
            .map(|v| vec![RawValue::from_field(v)])
            .collect()
    }

    fn infer_one(header: &str, values: &[&str]) -> StorageType {
        infer(&[Some(header.to_string())], &texts(values))[0].storage_type
    }

    #[test]
    fn test_integer_column() {
        assert_eq!(infer_one("qty", &["1", "2", "3", "", "5"]), StorageType::Integer);
    }

    #[test]
    fn test_decimal_column() {
        assert_eq!(infer_one("rate", &["1.5", "2"]), StorageType::Decimal);
    }

    #[test]
    fn test_currency_column() {
        assert_eq!(infer_one("amount", &["$1,200.50", "-$5.00"]), StorageType::Decimal);
    }

    #[test]
    fn test_percent_column() {
        assert_eq!(infer_one("margin", &["37%", "12.5%"]), StorageType::Decimal);
    }

    #[test]
    fn test_header_hint_with_grouped_numbers() {
        // Grouping commas are not plain numbers, but the header says money
        assert_eq!(infer_one("Total $", &["1,200.00", "350"]), StorageType::Decimal);
        assert_eq!(infer_one("Total", &["1,200.00", "350"]), StorageType::Text);
    }

    #[test]
    fn test_date_column() {
        assert_eq!(infer_one("date", &["01/15/25", "1/20/25"]), StorageType::Date);

        let rows = vec![vec![RawValue::Date(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap())]];
        assert_eq!(infer(&[Some("when".into())], &rows)[0].storage_type, StorageType::Date);
    }

    #[test]
    fn test_text_column() {
        assert_eq!(infer_one("item", &["Rent", "Utilities"]), StorageType::Text);
        // One stray value is enough to fall back to Text
        assert_eq!(infer_one("mixed", &["1", "2", "three"]), StorageType::Text);
    }

    #[test]
    fn test_only_first_five_samples_count() {
        assert_eq!(
            infer_one("qty", &["1", "2", "3", "4", "5", "not a number"]),
            StorageType::Integer
        );
    }

    #[test]
    fn test_absent_values_are_ignored() {
        assert_eq!(infer_one("qty", &["#N/A", "", "7"]), StorageType::Integer);
        assert_eq!(infer_one("empty", &["", "#N/A"]), StorageType::Text);
    }

    #[test]
    fn test_native_numbers() {
        let rows = vec![vec![RawValue::Float(3.0)], vec![RawValue::Int(4)]];
        assert_eq!(infer(&[Some("n".into())], &rows)[0].storage_type, StorageType::Integer);

        let rows = vec![vec![RawValue::Float(3.25)], vec![RawValue::Int(4)]];
        assert_eq!(infer(&[Some("n".into())], &rows)[0].storage_type, StorageType::Decimal);
    }

    #[test]
    fn test_literal_dollar_false_positive() {
        // Documented behavior: a stray `$` in free text still types the column Decimal
        assert_eq!(
            infer_one("notes", &["paid $5 cash", "n/a"]),
            StorageType::Decimal
        );
    }

    #[test]
    fn test_identifiers_are_unique_and_reserve_id() {
        let headers = vec![Some("ID".into()), Some("Name".into()), Some("name".into()), None];
        let specs = infer(&headers, &[]);
        let idents: Vec<_> = specs.iter().map(|c| c.identifier.as_str()).collect();
        assert_eq!(idents, vec!["id_2", "name", "name_2", "column"]);
        assert!(specs.iter().all(|c| c.storage_type == StorageType::Text));
        assert_eq!(specs[3].original_label, "");
    }
}
