//! Runtime configuration: database URL and named import profiles
//!
//! Sources, later wins: `DATABASE_URL` from the environment (or `.env`), the
//! TOML config file, then command-line flags.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::sheet::SheetSelector;

pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database_url: Option<String>,
    pub profiles: HashMap<String, ImportProfile>,
}

/// Saved settings for a recurring import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportProfile {
    pub source: Option<PathBuf>,
    pub sheet: Option<String>,
    pub sheet_index: Option<usize>,
    pub all_sheets: bool,
    pub skip_sheets: Vec<String>,
    pub table: Option<String>,
    pub table_prefix: Option<String>,
    pub backup: Option<PathBuf>,
    pub export_tsv: Option<PathBuf>,
}

impl Config {
    /// `<config dir>/sheetload/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sheetload").join("config.toml"))
    }

    /// Load the config file
    ///
    /// An explicit path must exist. Without one the default location is
    /// used when present, otherwise an empty config.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file does not exist: {}", path.display());
                }
                path.to_path_buf()
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    log::debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Named profile, or an error listing the defined ones
    pub fn profile(&self, name: &str) -> Result<&ImportProfile> {
        self.profiles.get(name).ok_or_else(|| {
            let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
            names.sort_unstable();
            if names.is_empty() {
                anyhow::anyhow!("Profile '{}' not found (no profiles defined)", name)
            } else {
                anyhow::anyhow!("Profile '{}' not found (available: {})", name, names.join(", "))
            }
        })
    }

    /// Connection URL: the config file value, else `DATABASE_URL`
    pub fn database_url(&self) -> Result<String> {
        resolve_database_url(self.database_url.as_deref(), env::var(DATABASE_URL_VAR).ok())
    }
}

fn resolve_database_url(from_file: Option<&str>, from_env: Option<String>) -> Result<String> {
    match (from_file, from_env) {
        (Some(url), _) if !url.trim().is_empty() => Ok(url.trim().to_string()),
        (_, Some(url)) if !url.trim().is_empty() => Ok(url.trim().to_string()),
        _ => bail!(
            "No database configured. Set {} (environment or .env) or database_url in the config file",
            DATABASE_URL_VAR
        ),
    }
}

impl ImportProfile {
    fn has_selector(&self) -> bool {
        self.sheet.is_some() || self.sheet_index.is_some() || self.all_sheets
    }

    /// Apply `overrides` on top of this profile
    ///
    /// Sheet selection is replaced as a whole when the overrides name any
    /// selector, so a saved `sheet` never combines with `--all-sheets`.
    pub fn merged(self, overrides: ImportProfile) -> ImportProfile {
        let (sheet, sheet_index, all_sheets) = if overrides.has_selector() {
            (overrides.sheet, overrides.sheet_index, overrides.all_sheets)
        } else {
            (self.sheet, self.sheet_index, self.all_sheets)
        };

        ImportProfile {
            source: overrides.source.or(self.source),
            sheet,
            sheet_index,
            all_sheets,
            skip_sheets: if overrides.skip_sheets.is_empty() {
                self.skip_sheets
            } else {
                overrides.skip_sheets
            },
            table: overrides.table.or(self.table),
            table_prefix: overrides.table_prefix.or(self.table_prefix),
            backup: overrides.backup.or(self.backup),
            export_tsv: overrides.export_tsv.or(self.export_tsv),
        }
    }

    pub fn selector(&self) -> Result<SheetSelector> {
        let selector = match (&self.sheet, self.sheet_index, self.all_sheets) {
            (None, None, false) => SheetSelector::Only,
            (Some(name), None, false) => SheetSelector::Name(name.clone()),
            (None, Some(index), false) => SheetSelector::Index(index),
            (None, None, true) => SheetSelector::All {
                skip: self.skip_sheets.clone(),
            },
            _ => bail!("Choose only one of sheet, sheet_index or all_sheets"),
        };

        if !self.skip_sheets.is_empty() && !self.all_sheets {
            log::warn!("skip_sheets is ignored without all_sheets");
        }
        Ok(selector)
    }
}
