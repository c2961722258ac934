//! JSON backup of the normalized records, written before the database is touched

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::ser::SerializeMap;

use super::rows::{NormalizedRow, RowOutcome};

/// Records of one table as they will be inserted
pub struct TableBackup<'a> {
    pub table: &'a str,
    pub records: Vec<&'a NormalizedRow>,
}

impl<'a> TableBackup<'a> {
    pub fn new(table: &'a str, outcomes: &'a [RowOutcome]) -> Self {
        Self {
            table,
            records: outcomes.iter().filter_map(RowOutcome::as_ready).collect(),
        }
    }
}

struct Keyed<'b, 'a>(&'b [TableBackup<'a>]);

impl Serialize for Keyed<'_, '_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for backup in self.0 {
            map.serialize_entry(backup.table, &backup.records)?;
        }
        map.end()
    }
}

/// Write the backup file
///
/// A single table is written as a bare array of records; with `keyed` the
/// file is an object mapping each table name to its records.
pub fn write_backup(path: &Path, tables: &[TableBackup<'_>], keyed: bool) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create backup file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    if keyed {
        serde_json::to_writer_pretty(&mut writer, &Keyed(tables))?;
    } else {
        let records: Vec<&NormalizedRow> = tables
            .iter()
            .flat_map(|t| t.records.iter().copied())
            .collect();
        serde_json::to_writer_pretty(&mut writer, &records)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write backup file: {}", path.display()))?;

    let total: usize = tables.iter().map(|t| t.records.len()).sum();
    log::info!("Saved {} records to backup {}", total, path.display());
    Ok(())
}
