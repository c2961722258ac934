//! TSV snapshots of imported sheets

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::reader::RawTable;
use crate::schema::{SURROGATE_KEY, unique_identifiers};

/// Characters that cannot appear in file names on common filesystems
const UNSAFE_FILE_CHARS: &[char] = &['/', '\\', '?', '*', ':', '"', '<', '>', '|'];

/// File name for a sheet snapshot: `<stem> - <sheet>.tsv`
pub fn tsv_file_name(stem: &str, sheet_name: &str) -> String {
    let safe_sheet: String = sheet_name
        .chars()
        .map(|c| if UNSAFE_FILE_CHARS.contains(&c) { '_' } else { c })
        .collect();
    format!("{} - {}.tsv", stem, safe_sheet)
}

/// Write a sheet to `<dir>/<stem> - <sheet>.tsv` with sanitized headers
///
/// Cells are written as their text form; absent cells are empty.
pub fn export_tsv(table: &RawTable, dir: &Path, stem: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {}", dir.display()))?;

    let path = dir.join(tsv_file_name(stem, &table.name));
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(&path)
        .with_context(|| format!("Failed to create TSV file: {}", path.display()))?;

    let headers = unique_identifiers(table.headers.iter().map(|h| h.as_deref()), &[SURROGATE_KEY]);
    writer.write_record(&headers)?;

    for row in &table.rows {
        let record: Vec<String> = row
            .iter()
            .map(|cell| {
                if cell.is_absent() {
                    String::new()
                } else {
                    cell.as_text().unwrap_or_default()
                }
            })
            .collect();
        writer.write_record(&record)?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write TSV file: {}", path.display()))?;

    log::info!("Saved sheet '{}' to {}", table.name, path.display());
    Ok(path)
}
