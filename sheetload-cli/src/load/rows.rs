//! Per-row normalization outcomes

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::normalize::{NormalizedValue, normalize};
use crate::schema::ColumnSpec;
use crate::sheet::RawValue;

/// Sheet row number of the first data row (the header is row 1)
const FIRST_DATA_ROW: usize = 2;

/// A row with every cell normalized for its column
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    /// Sheet row number (header is row 1)
    pub row: usize,
    /// One entry per column, `None` where the cell is absent
    pub values: Vec<(String, Option<NormalizedValue>)>,
}

impl NormalizedRow {
    /// Columns that carry a value, in column order
    pub fn present(&self) -> impl Iterator<Item = (&str, &NormalizedValue)> {
        self.values
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name.as_str(), v)))
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|(_, v)| v.is_none())
    }
}

/// Serialized as an object in column order, absent values as `null`
impl Serialize for NormalizedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Step at which a row was given up on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Normalize,
    Insert,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::Normalize => write!(f, "normalize"),
            FailureStage::Insert => write!(f, "insert"),
        }
    }
}

/// A row that could not be stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    /// Sheet row number (header is row 1)
    pub row: usize,
    pub stage: FailureStage,
    pub message: String,
}

impl std::fmt::Display for RowFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {} ({}): {}", self.row, self.stage, self.message)
    }
}

/// What normalization made of one raw row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// Ready to insert
    Ready(NormalizedRow),
    /// Every cell absent; skipped without counting as success or failure
    Empty { row: usize },
    Failed(RowFailure),
}

impl RowOutcome {
    pub fn as_ready(&self) -> Option<&NormalizedRow> {
        match self {
            RowOutcome::Ready(row) => Some(row),
            _ => None,
        }
    }
}

/// Normalize one raw row against the column specs
///
/// The first cell that cannot be normalized fails the whole row.
pub fn normalize_row(columns: &[ColumnSpec], raw: &[RawValue], row: usize) -> RowOutcome {
    let mut values = Vec::with_capacity(columns.len());

    for (col, spec) in columns.iter().enumerate() {
        let cell = raw.get(col).unwrap_or(&RawValue::Absent);
        match normalize(cell, spec.storage_type) {
            Ok(value) => values.push((spec.identifier.clone(), value)),
            Err(e) => {
                return RowOutcome::Failed(RowFailure {
                    row,
                    stage: FailureStage::Normalize,
                    message: format!("{}: {}", spec.identifier, e),
                });
            }
        }
    }

    let normalized = NormalizedRow { row, values };
    if normalized.is_empty() {
        RowOutcome::Empty { row }
    } else {
        RowOutcome::Ready(normalized)
    }
}

/// Fold every raw row into an outcome, in sheet order
pub fn prepare_rows(columns: &[ColumnSpec], rows: &[Vec<RawValue>]) -> Vec<RowOutcome> {
    prepare_rows_at(columns, rows, FIRST_DATA_ROW)
}

/// Same as [`prepare_rows`] for data starting at sheet row `first_row`
pub fn prepare_rows_at(columns: &[ColumnSpec], rows: &[Vec<RawValue>], first_row: usize) -> Vec<RowOutcome> {
    rows.iter()
        .enumerate()
        .map(|(i, raw)| normalize_row(columns, raw, i + first_row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StorageType;
    use chrono::NaiveDate;

    fn spec(identifier: &str, storage_type: StorageType) -> ColumnSpec {
        ColumnSpec {
            original_label: identifier.to_string(),
            identifier: identifier.to_string(),
            storage_type,
        }
    }

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    fn columns() -> Vec<ColumnSpec> {
        vec![
            spec("item_name", StorageType::Text),
            spec("total", StorageType::Decimal),
            spec("date", StorageType::Date),
        ]
    }

    #[test]
    fn test_prepare_rows_partitions_outcomes() {
        let rows = vec![
            vec![text("Rent"), text("$1,000.00"), text("01/15/25")],
            vec![text(""), text(""), text("")],
            vec![text("Broken"), text("lots"), text("01/20/25")],
            vec![text("Utilities"), text("$250.50"), text("someday")],
        ];

        let outcomes = prepare_rows(&columns(), &rows);
        assert_eq!(outcomes.len(), 4);

        let first = outcomes[0].as_ready().unwrap();
        assert_eq!(first.row, 2);
        assert_eq!(
            first.values[2].1,
            Some(NormalizedValue::Date(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()))
        );

        assert_eq!(outcomes[1], RowOutcome::Empty { row: 3 });

        match &outcomes[2] {
            RowOutcome::Failed(failure) => {
                assert_eq!(failure.row, 4);
                assert_eq!(failure.stage, FailureStage::Normalize);
                assert!(failure.message.starts_with("total:"));
            }
            other => panic!("expected failure, got {:?}", other),
        }

        // An unparseable date is dropped, the row still goes in
        let last = outcomes[3].as_ready().unwrap();
        assert_eq!(last.present().count(), 2);
    }

    #[test]
    fn test_row_numbers_follow_header_position() {
        let rows = vec![
            vec![text("Rent"), text("$10.00"), text("01/15/25")],
            vec![text("Fuel"), text("plenty"), text("01/16/25")],
        ];
        match &prepare_rows_at(&columns(), &rows, 4)[1] {
            RowOutcome::Failed(failure) => assert_eq!(failure.row, 5),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_row_serializes_in_column_order() {
        let row = NormalizedRow {
            row: 2,
            values: vec![
                ("item_name".into(), Some(NormalizedValue::Text("Rent".into()))),
                ("total".into(), Some(NormalizedValue::Decimal(1000.0))),
                ("date".into(), None),
            ],
        };
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"item_name":"Rent","total":1000.0,"date":null}"#
        );
    }
}
