//! Explicit sheet selection
//!
//! The caller always says which sheet is authoritative. A source with a
//! single sheet needs no selector; anything else without one is an error
//! listing the available sheets.

use anyhow::Result;

use super::reader::{RawTable, SpreadsheetSource};
use crate::error::ImportError;

/// Which sheet(s) of a source to import
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SheetSelector {
    /// Use the only sheet; fails on multi-sheet sources
    #[default]
    Only,
    /// Sheet by name (exact match first, then case-insensitive)
    Name(String),
    /// Sheet by 0-based position
    Index(usize),
    /// Every sheet except the named ones
    All { skip: Vec<String> },
}

impl std::fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetSelector::Only => write!(f, "only sheet"),
            SheetSelector::Name(name) => write!(f, "sheet '{}'", name),
            SheetSelector::Index(i) => write!(f, "sheet #{}", i),
            SheetSelector::All { skip } if skip.is_empty() => write!(f, "all sheets"),
            SheetSelector::All { skip } => write!(f, "all sheets except {}", skip.join(", ")),
        }
    }
}

/// Resolve a selector against a list of sheet names
pub fn resolve_sheet_names(
    selector: &SheetSelector,
    names: &[String],
    source: &str,
) -> Result<Vec<String>, ImportError> {
    let available = || {
        if names.is_empty() {
            "no sheets".to_string()
        } else {
            format!("available: {}", names.join(", "))
        }
    };

    match selector {
        SheetSelector::Only => match names {
            [single] => Ok(vec![single.clone()]),
            _ => Err(ImportError::source(
                source,
                format!("source has {} sheets, choose one ({})", names.len(), available()),
            )),
        },
        SheetSelector::Name(wanted) => names
            .iter()
            .find(|n| *n == wanted)
            .or_else(|| names.iter().find(|n| n.eq_ignore_ascii_case(wanted)))
            .map(|n| vec![n.clone()])
            .ok_or_else(|| {
                ImportError::source(source, format!("sheet '{}' not found ({})", wanted, available()))
            }),
        SheetSelector::Index(i) => names.get(*i).map(|n| vec![n.clone()]).ok_or_else(|| {
            ImportError::source(source, format!("sheet index {} out of range ({})", i, available()))
        }),
        SheetSelector::All { skip } => Ok(names
            .iter()
            .filter(|n| !skip.iter().any(|s| s.eq_ignore_ascii_case(n)))
            .cloned()
            .collect()),
    }
}

/// Read every sheet a selector picks, in workbook order
pub fn select_sheets(source: &SpreadsheetSource, selector: &SheetSelector) -> Result<Vec<RawTable>> {
    let names = source.sheet_names()?;
    let chosen = resolve_sheet_names(selector, &names, &source.path().display().to_string())?;

    log::info!(
        "Selected {} of {} sheets ({}): {}",
        chosen.len(),
        names.len(),
        selector,
        chosen.join(", ")
    );

    chosen.iter().map(|name| source.read_sheet(name)).collect()
}
