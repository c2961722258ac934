//! SQLite backend

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};

use super::store::{Dialect, TableStore, bind_value, redact_url};
use crate::error::ImportError;
use crate::normalize::NormalizedValue;

const TABLE_COLUMNS_SQL: &str = "SELECT name FROM pragma_table_info(?) ORDER BY cid";

pub struct SqliteStore {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteStore {
    /// Connect to a database file (created if missing) or `sqlite::memory:`
    ///
    /// The pool holds exactly one connection, so an in-memory database lives
    /// as long as the store.
    pub async fn connect(url: &str) -> Result<Self, ImportError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| ImportError::connection(redact_url(url), e))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| ImportError::connection(redact_url(url), e))?;

        log::info!("Connected to {}", redact_url(url));
        Ok(Self { pool, tx: None })
    }
}

#[async_trait(?Send)]
impl TableStore for SqliteStore {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn begin(&mut self) -> Result<(), sqlx::Error> {
        self.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn execute(&mut self, sql: &str, params: &[NormalizedValue]) -> Result<u64, sqlx::Error> {
        let result = if params.is_empty() {
            let statement = sqlx::raw_sql(sql);
            match self.tx.as_mut() {
                Some(tx) => statement.execute(&mut **tx).await?,
                None => statement.execute(&self.pool).await?,
            }
        } else {
            let query = params
                .iter()
                .fold(sqlx::query::<Sqlite>(sql), |q, v| bind_value(q, v));
            match self.tx.as_mut() {
                Some(tx) => query.execute(&mut **tx).await?,
                None => query.execute(&self.pool).await?,
            }
        };
        Ok(result.rows_affected())
    }

    async fn count(&mut self, sql: &str) -> Result<i64, sqlx::Error> {
        let query = sqlx::query_scalar::<Sqlite, i64>(sql);
        match self.tx.as_mut() {
            Some(tx) => query.fetch_one(&mut **tx).await,
            None => query.fetch_one(&self.pool).await,
        }
    }

    async fn table_columns(&mut self, table: &str) -> Result<Vec<String>, sqlx::Error> {
        let query = sqlx::query_scalar::<Sqlite, String>(TABLE_COLUMNS_SQL).bind(table.to_string());
        match self.tx.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await,
            None => query.fetch_all(&self.pool).await,
        }
    }

    async fn commit(&mut self) -> Result<(), sqlx::Error> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), sqlx::Error> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.rollback().await {
            log::warn!("Rollback on close failed: {}", e);
        }
        self.pool.close().await;
        log::debug!("Closed sqlite connection");
    }
}
