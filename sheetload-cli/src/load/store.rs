//! Database collaborator used by the loader
//!
//! Both backends keep a single connection (pool capped at one) and at most
//! one open transaction. Statements run inside the transaction when one is
//! open, directly on the pool otherwise. Store futures are not `Send`; imports
//! run on a current-thread runtime.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::query::Query;
use sqlx::{Database, Encode, Type};

use super::postgres::PostgresStore;
use super::sqlite::SqliteStore;
use crate::error::ImportError;
use crate::normalize::NormalizedValue;
use crate::schema::StorageType;

/// SQL flavour of the connected database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Pick the dialect from a connection URL scheme
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?.to_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Some(Dialect::Postgres),
            "sqlite" => Some(Dialect::Sqlite),
            _ => None,
        }
    }

    /// Column definition for the injected surrogate key
    pub fn surrogate_key_definition(&self) -> &'static str {
        match self {
            Dialect::Postgres => "SERIAL PRIMARY KEY",
            Dialect::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
        }
    }

    /// Column type for a storage type
    pub fn column_type(&self, storage_type: StorageType) -> &'static str {
        match (self, storage_type) {
            (Dialect::Postgres, StorageType::Integer) => "BIGINT",
            (Dialect::Sqlite, StorageType::Integer) => "INTEGER",
            (_, StorageType::Decimal) => "DECIMAL(15,2)",
            (_, StorageType::Date) => "DATE",
            (_, StorageType::Text) => "TEXT",
        }
    }

    /// Bind parameter marker for the 1-based position `n`
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", n),
            Dialect::Sqlite => "?".to_string(),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Postgres => write!(f, "postgres"),
            Dialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Run-SQL-fetch-rows interface over one database connection
#[async_trait(?Send)]
pub trait TableStore: Send {
    fn dialect(&self) -> Dialect;

    /// Open the transaction subsequent statements run in
    async fn begin(&mut self) -> Result<(), sqlx::Error>;

    /// Execute a statement, returning the number of affected rows
    async fn execute(&mut self, sql: &str, params: &[NormalizedValue]) -> Result<u64, sqlx::Error>;

    /// Run a query returning a single integer (e.g. `COUNT(*)`)
    async fn count(&mut self, sql: &str) -> Result<i64, sqlx::Error>;

    /// Column names of a table in definition order (empty if it does not exist)
    async fn table_columns(&mut self, table: &str) -> Result<Vec<String>, sqlx::Error>;

    async fn commit(&mut self) -> Result<(), sqlx::Error>;

    async fn rollback(&mut self) -> Result<(), sqlx::Error>;

    /// Release the connection; an open transaction is rolled back
    async fn close(&mut self);
}

/// Connect to the database behind `url`
pub async fn connect(url: &str) -> Result<Box<dyn TableStore>, ImportError> {
    match Dialect::from_url(url) {
        Some(Dialect::Postgres) => Ok(Box::new(PostgresStore::connect(url).await?)),
        Some(Dialect::Sqlite) => Ok(Box::new(SqliteStore::connect(url).await?)),
        None => Err(ImportError::connection(
            redact_url(url),
            "unsupported database URL (expected postgres://, postgresql:// or sqlite:)",
        )),
    }
}

/// Hide the password of a connection URL for logging
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
        None => url.to_string(),
    }
}

/// Bind a normalized value to a query of any backend
pub(crate) fn bind_value<'q, DB>(
    query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    value: &NormalizedValue,
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    NaiveDate: Encode<'q, DB> + Type<DB>,
    String: Encode<'q, DB> + Type<DB>,
{
    match value {
        NormalizedValue::Integer(i) => query.bind(*i),
        NormalizedValue::Decimal(f) => query.bind(*f),
        NormalizedValue::Date(d) => query.bind(*d),
        NormalizedValue::Text(s) => query.bind(s.clone()),
    }
}
