//! Destructive reload of one table
//!
//! One sheet is one transaction: drop, create and every insert are committed
//! together, so an interrupted run leaves the previous table in place rather
//! than a half-filled successor. Each insert runs under a savepoint so a bad
//! row is rolled back on its own and the batch carries on.

use serde::Serialize;

use super::rows::{FailureStage, RowFailure, RowOutcome, prepare_rows};
use super::store::TableStore;
use super::target::TargetTable;
use crate::error::{ImportError, is_connection_error};
use crate::normalize::NormalizedValue;
use crate::sheet::RawValue;

const ROW_SAVEPOINT: &str = "sheetload_row";

/// Progress of a load, in the only order it may advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotStarted,
    SchemaDropped,
    SchemaCreated,
    Populating,
    Verified,
}

/// Outcome of loading one table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub table: String,
    pub inserted: usize,
    pub failed: usize,
    /// Rows with no present values
    pub skipped: usize,
    /// Row count reported by the database after commit
    pub verified: i64,
    pub failures: Vec<RowFailure>,
}

impl LoadReport {
    /// Whether the post-load count disagrees with the number of inserts
    pub fn verification_mismatch(&self) -> bool {
        self.verified != self.inserted as i64
    }
}

/// Drives one table through drop, create, populate and verify
pub struct TableLoader<'a> {
    store: &'a mut dyn TableStore,
    target: &'a TargetTable,
    state: LoadState,
}

impl<'a> TableLoader<'a> {
    pub fn new(store: &'a mut dyn TableStore, target: &'a TargetTable) -> Self {
        Self {
            store,
            target,
            state: LoadState::NotStarted,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    fn advance(&mut self, from: LoadState, to: LoadState) -> Result<(), ImportError> {
        if self.state != from {
            return Err(ImportError::statement(
                format!("{:?} -> {:?}", from, to),
                format!("load of '{}' is in state {:?}", self.target.name, self.state),
            ));
        }
        log::debug!("{}: {:?} -> {:?}", self.target.name, from, to);
        self.state = to;
        Ok(())
    }

    /// Normalize and load raw rows
    pub async fn load(self, rows: &[Vec<RawValue>]) -> Result<LoadReport, ImportError> {
        let outcomes = prepare_rows(&self.target.columns, rows);
        self.load_prepared(&outcomes).await
    }

    /// Load rows that were already folded into outcomes
    pub async fn load_prepared(mut self, outcomes: &[RowOutcome]) -> Result<LoadReport, ImportError> {
        if let Err(e) = self.store.begin().await {
            return Err(ImportError::from_store("BEGIN", e));
        }

        match self.populate(outcomes).await {
            Ok((inserted, failures, skipped)) => {
                if let Err(e) = self.store.commit().await {
                    return Err(ImportError::from_store("COMMIT", e));
                }
                self.verify(inserted, failures, skipped).await
            }
            Err(err) => {
                if let Err(e) = self.store.rollback().await {
                    log::warn!("Rollback of '{}' failed: {}", self.target.name, e);
                }
                Err(err)
            }
        }
    }

    async fn run(&mut self, sql: &str) -> Result<(), ImportError> {
        self.store
            .execute(sql, &[])
            .await
            .map(|_| ())
            .map_err(|e| ImportError::from_store(sql, e))
    }

    async fn populate(
        &mut self,
        outcomes: &[RowOutcome],
    ) -> Result<(usize, Vec<RowFailure>, usize), ImportError> {
        self.replace_schema().await?;
        self.insert_rows(outcomes).await
    }

    async fn replace_schema(&mut self) -> Result<(), ImportError> {
        let drop = self.target.drop_sql();
        self.run(&drop).await?;
        self.advance(LoadState::NotStarted, LoadState::SchemaDropped)?;

        let create = self.target.create_sql(self.store.dialect());
        log::debug!("Creating table:\n{}", create);
        self.run(&create).await?;
        self.advance(LoadState::SchemaDropped, LoadState::SchemaCreated)
    }

    async fn insert_rows(
        &mut self,
        outcomes: &[RowOutcome],
    ) -> Result<(usize, Vec<RowFailure>, usize), ImportError> {
        self.advance(LoadState::SchemaCreated, LoadState::Populating)?;
        let dialect = self.store.dialect();
        let mut inserted = 0;
        let mut skipped = 0;
        let mut failures = Vec::new();

        for outcome in outcomes {
            let row = match outcome {
                RowOutcome::Ready(row) => row,
                RowOutcome::Empty { .. } => {
                    skipped += 1;
                    continue;
                }
                RowOutcome::Failed(failure) => {
                    log::warn!("{}: {}", self.target.name, failure);
                    failures.push(failure.clone());
                    continue;
                }
            };

            let (columns, params): (Vec<&str>, Vec<NormalizedValue>) =
                row.present().map(|(name, value)| (name, value.clone())).unzip();
            let insert = self.target.insert_sql(dialect, &columns);

            self.run(&format!("SAVEPOINT {}", ROW_SAVEPOINT)).await?;
            match self.store.execute(&insert, &params).await {
                Ok(_) => {
                    self.run(&format!("RELEASE SAVEPOINT {}", ROW_SAVEPOINT)).await?;
                    inserted += 1;
                }
                Err(e) if is_connection_error(&e) => {
                    return Err(ImportError::from_store(insert, e));
                }
                Err(e) => {
                    self.run(&format!("ROLLBACK TO SAVEPOINT {}", ROW_SAVEPOINT)).await?;
                    let failure = RowFailure {
                        row: row.row,
                        stage: FailureStage::Insert,
                        message: e.to_string(),
                    };
                    log::warn!("{}: {}", self.target.name, failure);
                    failures.push(failure);
                }
            }
        }

        log::info!(
            "{}: {} records inserted, {} errors, {} empty rows skipped",
            self.target.name,
            inserted,
            failures.len(),
            skipped
        );
        Ok((inserted, failures, skipped))
    }

    async fn verify(
        mut self,
        inserted: usize,
        failures: Vec<RowFailure>,
        skipped: usize,
    ) -> Result<LoadReport, ImportError> {
        let count_sql = self.target.count_sql();
        let verified = self
            .store
            .count(&count_sql)
            .await
            .map_err(|e| ImportError::from_store(&count_sql, e))?;
        self.advance(LoadState::Populating, LoadState::Verified)?;

        let report = LoadReport {
            table: self.target.name.clone(),
            inserted,
            failed: failures.len(),
            skipped,
            verified,
            failures,
        };

        if report.verification_mismatch() {
            log::warn!(
                "{}: verification mismatch, inserted {} but table holds {}",
                report.table,
                report.inserted,
                report.verified
            );
        } else {
            log::info!("Verified {} records in {}", verified, report.table);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::SqliteStore;
    use crate::schema::{ColumnSpec, StorageType, infer};

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    async fn memory_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    fn expense_sheet() -> (Vec<Option<String>>, Vec<Vec<RawValue>>) {
        let headers = vec![
            Some("Item Name".to_string()),
            Some("Total $".to_string()),
            Some("Date".to_string()),
        ];
        let rows = vec![
            vec![text("Rent"), text("$1,000.00"), text("01/15/25")],
            vec![text(""), text(""), text("")],
            vec![text("Utilities"), text("$250.50"), text("01/20/25")],
        ];
        (headers, rows)
    }

    #[tokio::test]
    async fn test_end_to_end_expense_sheet() {
        let (headers, rows) = expense_sheet();
        let columns = infer(&headers, &rows);
        let summary: Vec<_> = columns
            .iter()
            .map(|c| (c.identifier.as_str(), c.storage_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("item_name", StorageType::Text),
                ("total", StorageType::Decimal),
                ("date", StorageType::Date),
            ]
        );

        let mut store = memory_store().await;
        let target = TargetTable::new("job_costs", columns);
        let report = TableLoader::new(&mut store, &target).load(&rows).await.unwrap();

        assert_eq!(report.inserted, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.verified, 2);
        assert!(!report.verification_mismatch());

        let total = store
            .count("SELECT CAST(SUM(total) * 100 AS INTEGER) FROM job_costs")
            .await
            .unwrap();
        assert_eq!(total, 125050);

        let dated = store
            .count("SELECT COUNT(*) FROM job_costs WHERE date = '2025-01-20'")
            .await
            .unwrap();
        assert_eq!(dated, 1);

        store.close().await;
    }

    #[tokio::test]
    async fn test_reload_replaces_schema() {
        let mut store = memory_store().await;

        let first = TargetTable::new(
            "ledger",
            vec![ColumnSpec {
                original_label: "Old Column".into(),
                identifier: "old_column".into(),
                storage_type: StorageType::Text,
            }],
        );
        TableLoader::new(&mut store, &first)
            .load(&[vec![text("stale")]])
            .await
            .unwrap();

        let second = TargetTable::new(
            "ledger",
            vec![ColumnSpec {
                original_label: "Amount".into(),
                identifier: "amount".into(),
                storage_type: StorageType::Integer,
            }],
        );
        let report = TableLoader::new(&mut store, &second)
            .load(&[vec![RawValue::Int(1)], vec![RawValue::Int(2)]])
            .await
            .unwrap();

        assert_eq!(report.verified, 2);
        assert_eq!(
            store.table_columns("ledger").await.unwrap(),
            vec!["id".to_string(), "amount".to_string()]
        );
    }

    #[tokio::test]
    async fn test_bad_rows_do_not_stop_the_batch() {
        let mut store = memory_store().await;
        let target = TargetTable::new(
            "amounts",
            vec![ColumnSpec {
                original_label: "Amount".into(),
                identifier: "amount".into(),
                storage_type: StorageType::Decimal,
            }],
        );
        let rows = vec![
            vec![text("$10.00")],
            vec![text("ten dollars")],
            vec![text("#N/A")],
            vec![text("-$2.50")],
        ];

        let report = TableLoader::new(&mut store, &target).load(&rows).await.unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failures[0].row, 3);
        assert_eq!(report.failures[0].stage, FailureStage::Normalize);
        assert_eq!(report.verified, 2);
    }

    #[tokio::test]
    async fn test_insert_failure_rolls_back_only_that_row() {
        let mut store = memory_store().await;
        let target = TargetTable::new(
            "codes",
            vec![ColumnSpec {
                original_label: "Code".into(),
                identifier: "code".into(),
                storage_type: StorageType::Text,
            }],
        );
        let outcomes = prepare_rows(
            &target.columns,
            &[vec![text("ok")], vec![text("bad")], vec![text("fine")]],
        );

        let mut loader = TableLoader::new(&mut store, &target);
        loader.store.begin().await.unwrap();
        loader.replace_schema().await.unwrap();
        loader
            .run(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON codes WHEN NEW.code = 'bad' \
                 BEGIN SELECT RAISE(ABORT, 'bad code'); END",
            )
            .await
            .unwrap();
        let (inserted, failures, skipped) = loader.insert_rows(&outcomes).await.unwrap();
        loader.store.commit().await.unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(skipped, 0);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].row, 3);
        assert_eq!(failures[0].stage, FailureStage::Insert);
        assert!(failures[0].message.contains("bad code"));
        assert_eq!(store.count("SELECT COUNT(*) FROM codes").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_count_mismatch_is_reported_not_raised() {
        let mut store = memory_store().await;
        let target = TargetTable::new(
            "amounts",
            vec![ColumnSpec {
                original_label: "Amount".into(),
                identifier: "amount".into(),
                storage_type: StorageType::Integer,
            }],
        );
        let outcomes = prepare_rows(&target.columns, &[vec![RawValue::Int(1)], vec![RawValue::Int(2)]]);

        let mut loader = TableLoader::new(&mut store, &target);
        loader.store.begin().await.unwrap();
        loader.replace_schema().await.unwrap();
        loader
            .run(
                "CREATE TRIGGER drop_second AFTER INSERT ON amounts WHEN NEW.amount = 2 \
                 BEGIN DELETE FROM amounts WHERE id = NEW.id; END",
            )
            .await
            .unwrap();
        let (inserted, failures, skipped) = loader.insert_rows(&outcomes).await.unwrap();
        loader.store.commit().await.unwrap();

        let report = loader.verify(inserted, failures, skipped).await.unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.verified, 1);
        assert_eq!(report.failed, 0);
        assert!(report.verification_mismatch());
    }

    #[tokio::test]
    async fn test_closed_connection_is_fatal() {
        let mut store = memory_store().await;
        store.close().await;

        let target = TargetTable::new("t", Vec::new());
        let err = TableLoader::new(&mut store, &target)
            .load(&[vec![text("x")]])
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Connection { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_states_advance_in_order() {
        let mut store = memory_store().await;
        let target = TargetTable::new("t", Vec::new());
        let mut loader = TableLoader::new(&mut store, &target);
        assert_eq!(loader.state(), LoadState::NotStarted);
        assert!(loader.advance(LoadState::SchemaCreated, LoadState::Populating).is_err());
        loader.advance(LoadState::NotStarted, LoadState::SchemaDropped).unwrap();
        assert_eq!(loader.state(), LoadState::SchemaDropped);
    }
}
