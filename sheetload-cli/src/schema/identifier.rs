//! SQL-safe column and table identifiers

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Identifier used when a label sanitizes to nothing
pub const PLACEHOLDER: &str = "column";

/// Name of the surrogate key column the loader injects
pub const SURROGATE_KEY: &str = "id";

/// Longest identifier PostgreSQL keeps; longer names are silently truncated
pub const MAX_IDENTIFIER_LEN: usize = 63;

static INVALID_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_]").expect("valid identifier regex"));
static UNDERSCORE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("valid underscore regex"));

/// Derive an identifier from a header label
///
/// Lowercase, anything outside `[a-z0-9_]` becomes `_`, runs of `_` collapse,
/// edges are trimmed, a leading digit gets a `col_` prefix and an empty
/// result becomes [`PLACEHOLDER`]. The result is cut to
/// [`MAX_IDENTIFIER_LEN`] bytes. Applying it twice changes nothing.
pub fn identifier(label: Option<&str>) -> String {
    let lowered = label.unwrap_or_default().to_lowercase();
    let replaced = INVALID_CHARS.replace_all(&lowered, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches('_');

    if trimmed.is_empty() {
        PLACEHOLDER.to_string()
    } else if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        truncate(&format!("col_{}", trimmed), MAX_IDENTIFIER_LEN).to_string()
    } else {
        truncate(trimmed, MAX_IDENTIFIER_LEN).to_string()
    }
}

/// Cut an identifier to `max` bytes without leaving a trailing `_`
///
/// Identifiers are ASCII, so any byte offset is a char boundary.
fn truncate(ident: &str, max: usize) -> &str {
    if ident.len() <= max {
        ident
    } else {
        ident[..max].trim_end_matches('_')
    }
}

/// Derive unique identifiers for a header row
///
/// Later duplicates get `_2`, `_3`, ... in header order. Names in `reserved`
/// are treated as already taken.
pub fn unique_identifiers<'a, I>(labels: I, reserved: &[&str]) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut taken: HashSet<String> = reserved.iter().map(|s| s.to_string()).collect();
    let mut result = Vec::new();

    for label in labels {
        let base = identifier(label);
        let mut candidate = base.clone();
        let mut suffix = 2;

        while taken.contains(&candidate) {
            let tail = format!("_{}", suffix);
            candidate = format!("{}{}", truncate(&base, MAX_IDENTIFIER_LEN - tail.len()), tail);
            suffix += 1;
        }

        if candidate != base {
            log::debug!("Identifier '{}' already used, renamed to '{}'", base, candidate);
        }

        taken.insert(candidate.clone());
        result.push(candidate);
    }

    result
}

/// Table name for a sheet: optional prefix plus the sheet name's identifier
pub fn table_name(prefix: &str, sheet_name: &str) -> String {
    identifier(Some(&format!("{}{}", prefix, sheet_name)))
}

/// Quote an identifier for use in SQL
///
/// Identifiers produced here never contain quotes, but table names supplied
/// on the command line go through [`identifier`] first as well.
pub fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_examples() {
        assert_eq!(identifier(Some("Item Name")), "item_name");
        assert_eq!(identifier(Some("Total $")), "total");
        assert_eq!(identifier(Some("Date")), "date");
        assert_eq!(identifier(Some("  Profit -- %  ")), "profit");
        assert_eq!(identifier(Some("2025 Budget")), "col_2025_budget");
        assert_eq!(identifier(Some("__already_clean__")), "already_clean");
        assert_eq!(identifier(Some("Café Owner")), "caf_owner");
    }

    #[test]
    fn test_identifier_placeholder() {
        assert_eq!(identifier(Some("")), PLACEHOLDER);
        assert_eq!(identifier(None), PLACEHOLDER);
        assert_eq!(identifier(Some("$%!")), PLACEHOLDER);
    }

    #[test]
    fn test_identifier_properties() {
        let labels = [
            "Item Name",
            "Total $",
            "9 lives",
            "",
            "___",
            "MiXeD-Case/Path\\Thing",
            "Ünïcödé",
            "a__b",
            "0",
            "_9",
        ];
        for label in labels {
            let ident = identifier(Some(label));
            assert!(
                ident.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
                "{} -> {}",
                label,
                ident
            );
            assert!(!ident.starts_with(|c: char| c.is_ascii_digit()), "{}", ident);
            assert!(!ident.is_empty());
            assert_eq!(identifier(Some(&ident)), ident, "not idempotent for {}", label);
        }
    }

    #[test]
    fn test_unique_identifiers() {
        let labels = vec![Some("Amount"), Some("amount"), None, Some(""), Some("Amount_2")];
        assert_eq!(
            unique_identifiers(labels, &[]),
            vec!["amount", "amount_2", "column", "column_2", "amount_2_2"]
        );
    }

    #[test]
    fn test_reserved_surrogate_key() {
        let labels = vec![Some("ID"), Some("Name")];
        assert_eq!(unique_identifiers(labels, &[SURROGATE_KEY]), vec!["id_2", "name"]);
    }

    #[test]
    fn test_long_labels_stay_unique_after_truncation() {
        let first = format!("{} x", "a".repeat(78));
        let second = format!("{} y", "a".repeat(78));

        let idents = unique_identifiers(vec![Some(first.as_str()), Some(second.as_str())], &[]);
        assert_eq!(idents[0], "a".repeat(MAX_IDENTIFIER_LEN));
        assert_eq!(idents[1], format!("{}_2", "a".repeat(MAX_IDENTIFIER_LEN - 2)));
        assert!(idents.iter().all(|i| i.len() <= MAX_IDENTIFIER_LEN));
        assert_eq!(identifier(Some(&idents[1])), idents[1]);

        // No trailing underscore left at the cut
        let spaced = format!("{} tail", "b".repeat(MAX_IDENTIFIER_LEN - 1));
        assert_eq!(identifier(Some(&spaced)), "b".repeat(MAX_IDENTIFIER_LEN - 1));
    }

    #[test]
    fn test_table_name() {
        assert_eq!(table_name("job_costs_", "Actual Monthly"), "job_costs_actual_monthly");
        assert_eq!(table_name("", "2024"), "col_2024");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("date"), "\"date\"");
    }
}
