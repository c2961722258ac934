//! Import command handler

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use colored::*;

use super::ImportCommands;
use crate::cli::output::{print_columns, print_report};
use crate::config::{Config, ImportProfile};
use crate::load::{
    LoadReport, RowOutcome, TableBackup, TableLoader, TableStore, TargetTable, connect,
    prepare_rows_at, redact_url, write_backup,
};
use crate::schema::{identifier, infer, table_name, unique_identifiers};
use crate::sheet::{RawTable, SheetSelector, SpreadsheetSource, export_tsv, select_sheets};

/// A sheet ready to load: its target table and normalized rows
struct SheetPlan {
    sheet: String,
    target: TargetTable,
    outcomes: Vec<RowOutcome>,
}

impl SheetPlan {
    fn ready_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.as_ready().is_some()).count()
    }
}

pub async fn handle_import_command(args: ImportCommands, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    let profile = match &args.profile {
        Some(name) => {
            println!("Using profile: {}", name.bright_green().bold());
            config.profile(name)?.clone()
        }
        None => ImportProfile::default(),
    }
    .merged(args.as_overrides());

    let Some(source_path) = profile.source.clone() else {
        anyhow::bail!("No source given. Pass a spreadsheet path or use --profile");
    };
    let selector = profile.selector()?;
    let multi_sheet = matches!(selector, SheetSelector::All { .. });
    if multi_sheet && profile.table.is_some() {
        anyhow::bail!("--table names a single table; use --table-prefix with --all-sheets");
    }

    let source = SpreadsheetSource::open(&source_path)?;
    println!(
        "Reading {} ({})",
        source_path.display().to_string().cyan(),
        selector
    );

    let sheets: Vec<RawTable> = select_sheets(&source, &selector)?
        .into_iter()
        .filter(|sheet| {
            if sheet.width() == 0 {
                log::warn!("Skipping sheet '{}': no header row", sheet.name);
                false
            } else if multi_sheet && sheet.is_empty() {
                log::warn!("Skipping sheet '{}': no data rows", sheet.name);
                false
            } else {
                true
            }
        })
        .collect();

    if sheets.is_empty() {
        anyhow::bail!("Nothing to import from {}", source_path.display());
    }

    let names = target_names(&sheets, &profile, multi_sheet);
    let plans: Vec<SheetPlan> = sheets
        .iter()
        .zip(names)
        .map(|(sheet, name)| {
            let columns = infer(&sheet.headers, &sheet.rows);
            let target = TargetTable::new(&name, columns);
            let outcomes = prepare_rows_at(&target.columns, &sheet.rows, sheet.first_data_row());
            SheetPlan {
                sheet: sheet.name.clone(),
                target,
                outcomes,
            }
        })
        .collect();

    if let Some(dir) = &profile.export_tsv {
        let stem = source.stem();
        for sheet in &sheets {
            let path = export_tsv(sheet, dir, &stem)?;
            println!("Saved {}", path.display().to_string().dimmed());
        }
    }

    if let Some(path) = &profile.backup {
        let backups: Vec<TableBackup<'_>> = plans
            .iter()
            .map(|plan| TableBackup::new(&plan.target.name, &plan.outcomes))
            .collect();
        write_backup(path, &backups, multi_sheet)?;
        println!("Backup saved to {}", path.display().to_string().bright_green());
    }

    if args.dry_run {
        for plan in &plans {
            println!();
            println!("Sheet: {}", plan.sheet.cyan());
            print_columns(&plan.target);
            println!(
                "  {} of {} rows ready to insert",
                plan.ready_count(),
                plan.outcomes.len()
            );
        }
        println!();
        println!("{}", "Dry run: database not touched".yellow());
        return Ok(());
    }

    let url = config.database_url()?;
    println!("Connecting to {}", redact_url(&url).cyan());
    let mut store = connect(&url).await?;

    let start = Instant::now();
    let result = load_all(store.as_mut(), &plans).await;
    store.close().await;
    let (reports, failed_sheets, abandoned) = result;

    for report in &reports {
        print_report(report);
    }

    println!();
    let inserted: usize = reports.iter().map(|r| r.inserted).sum();
    let failed: usize = reports.iter().map(|r| r.failed).sum();
    println!(
        "Loaded {} records into {} table(s) in {:.2}s ({} failed rows)",
        inserted.to_string().green().bold(),
        reports.len(),
        start.elapsed().as_secs_f64(),
        failed
    );

    if !abandoned.is_empty() {
        println!(
            "{}",
            format!("Not attempted: {}", abandoned.join(", ")).yellow()
        );
    }
    if !failed_sheets.is_empty() || !abandoned.is_empty() {
        anyhow::bail!("Failed to load: {}", failed_sheets.join(", "));
    }
    Ok(())
}

/// Load each plan in turn
///
/// A statement failure rolls back that sheet only; a lost connection stops
/// the run and the remaining tables are returned as not attempted.
async fn load_all(
    store: &mut dyn TableStore,
    plans: &[SheetPlan],
) -> (Vec<LoadReport>, Vec<String>, Vec<String>) {
    let mut reports = Vec::new();
    let mut failed = Vec::new();

    for (i, plan) in plans.iter().enumerate() {
        log::info!("Loading sheet '{}' into {}", plan.sheet, plan.target.name);
        match TableLoader::new(store, &plan.target)
            .load_prepared(&plan.outcomes)
            .await
            .with_context(|| format!("Sheet '{}'", plan.sheet))
        {
            Ok(report) => reports.push(report),
            Err(e) => {
                log::error!("{:#}", e);
                failed.push(plan.target.name.clone());
                let fatal = e
                    .downcast_ref::<crate::error::ImportError>()
                    .is_some_and(|e| e.is_fatal());
                if fatal {
                    let abandoned = plans[i + 1..].iter().map(|p| p.target.name.clone()).collect();
                    return (reports, failed, abandoned);
                }
            }
        }
    }

    (reports, failed, Vec::new())
}

/// Table name for each sheet
///
/// `table` names a single sheet's table outright. Otherwise the name is
/// `table_prefix` plus the sheet name, with clashes between sheets given
/// numeric suffixes.
fn target_names(sheets: &[RawTable], profile: &ImportProfile, multi_sheet: bool) -> Vec<String> {
    if let (false, Some(table)) = (multi_sheet, &profile.table) {
        return sheets.iter().map(|_| identifier(Some(table))).collect();
    }

    let prefix = profile.table_prefix.as_deref().unwrap_or("");
    let names: Vec<String> = sheets
        .iter()
        .map(|sheet| table_name(prefix, &sheet.name))
        .collect();
    unique_identifiers(names.iter().map(|n| Some(n.as_str())), &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::{SqliteStore, prepare_rows};
    use crate::sheet::RawValue;

    fn sheet(name: &str) -> RawTable {
        RawTable::from_grid(
            name,
            vec![
                vec![RawValue::Text("Amount".into())],
                vec![RawValue::Text("$5.00".into())],
            ],
        )
    }

    #[test]
    fn test_single_sheet_names() {
        let sheets = vec![sheet("Actual Monthly")];
        assert_eq!(
            target_names(&sheets, &ImportProfile::default(), false),
            vec!["actual_monthly"]
        );

        let profile = ImportProfile {
            table: Some("Job Costs".into()),
            ..Default::default()
        };
        assert_eq!(target_names(&sheets, &profile, false), vec!["job_costs"]);
    }

    #[test]
    fn test_multi_sheet_names_are_prefixed_and_unique() {
        let sheets = vec![sheet("Jan"), sheet("jan"), sheet("Feb")];
        let profile = ImportProfile {
            table_prefix: Some("job_costs_".into()),
            ..Default::default()
        };
        assert_eq!(
            target_names(&sheets, &profile, true),
            vec!["job_costs_jan", "job_costs_jan_2", "job_costs_feb"]
        );
    }

    fn plans(names: &[&str]) -> Vec<SheetPlan> {
        names
            .iter()
            .map(|name| {
                let s = sheet(name);
                let target = TargetTable::new(&s.name, infer(&s.headers, &s.rows));
                let outcomes = prepare_rows(&target.columns, &s.rows);
                SheetPlan {
                    sheet: s.name.clone(),
                    target,
                    outcomes,
                }
            })
            .collect()
    }

    #[test]
    fn test_single_sheet_uses_prefix() {
        let sheets = vec![sheet("Actual")];
        let profile = ImportProfile {
            table_prefix: Some("job_costs_".into()),
            ..Default::default()
        };
        assert_eq!(target_names(&sheets, &profile, false), vec!["job_costs_actual"]);

        let both = ImportProfile {
            table: Some("ledger".into()),
            ..profile
        };
        assert_eq!(target_names(&sheets, &both, false), vec!["ledger"]);
    }

    #[tokio::test]
    async fn test_load_all_reports_each_sheet() {
        let plans = plans(&["Jan", "Feb"]);

        let mut store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        let (reports, failed, abandoned) = load_all(&mut store, &plans).await;
        assert!(failed.is_empty());
        assert!(abandoned.is_empty());
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.inserted == 1 && r.verified == 1));
        assert_eq!(store.table_columns("feb").await.unwrap(), vec!["id", "amount"]);
        store.close().await;
    }

    #[tokio::test]
    async fn test_lost_connection_stops_remaining_sheets() {
        let plans = plans(&["Jan", "Feb", "Mar"]);

        let mut store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        store.close().await;

        let (reports, failed, abandoned) = load_all(&mut store, &plans).await;
        assert!(reports.is_empty());
        assert_eq!(failed, vec!["jan"]);
        assert_eq!(abandoned, vec!["feb", "mar"]);
    }
}
