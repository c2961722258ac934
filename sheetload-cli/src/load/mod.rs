mod backup;
mod loader;
mod postgres;
mod rows;
mod sqlite;
mod store;
mod target;

pub use backup::{TableBackup, write_backup};
pub use loader::{LoadReport, LoadState, TableLoader};
pub use postgres::PostgresStore;
pub use rows::{FailureStage, NormalizedRow, RowFailure, RowOutcome, normalize_row, prepare_rows, prepare_rows_at};
pub use sqlite::SqliteStore;
pub use store::{Dialect, TableStore, connect, redact_url};
pub use target::TargetTable;
