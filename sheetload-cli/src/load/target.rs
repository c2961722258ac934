//! Target table definition and the SQL generated for it

use serde::Serialize;

use super::store::Dialect;
use crate::schema::{ColumnSpec, SURROGATE_KEY, identifier, quote};

/// Table an import creates from scratch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetTable {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl TargetTable {
    /// Build a target table; the name is sanitized with the identifier rules
    pub fn new(name: &str, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: identifier(Some(name)),
            columns,
        }
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", quote(&self.name))
    }

    /// `CREATE TABLE` with the surrogate key followed by one column per `ColumnSpec`
    pub fn create_sql(&self, dialect: Dialect) -> String {
        let mut definitions = vec![format!(
            "    {} {}",
            quote(SURROGATE_KEY),
            dialect.surrogate_key_definition()
        )];
        definitions.extend(self.columns.iter().map(|c| {
            format!(
                "    {} {}",
                quote(&c.identifier),
                dialect.column_type(c.storage_type)
            )
        }));

        format!(
            "CREATE TABLE {} (\n{}\n)",
            quote(&self.name),
            definitions.join(",\n")
        )
    }

    /// `INSERT` for the given subset of columns, with one placeholder each
    pub fn insert_sql(&self, dialect: Dialect, columns: &[&str]) -> String {
        let names: Vec<String> = columns.iter().map(|c| quote(c)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|n| dialect.placeholder(n)).collect();

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(&self.name),
            names.join(", "),
            placeholders.join(", ")
        )
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", quote(&self.name))
    }
}
