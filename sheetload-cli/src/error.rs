//! Error taxonomy for an import run
//!
//! Only run-level failures live here. Per-row problems are recorded as
//! [`RowFailure`](crate::load::RowFailure) values and never abort a load.

/// Fatal error for an import run (or for one sheet of it)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// Could not reach or open the database
    Connection { target: String, message: String },
    /// Could not read the source file or resolve the requested sheet
    Source { path: String, message: String },
    /// A schema or transaction statement failed; the sheet's transaction is rolled back
    Statement { sql: String, message: String },
}

impl ImportError {
    pub fn connection(target: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ImportError::Connection {
            target: target.into(),
            message: err.to_string(),
        }
    }

    pub fn source(path: impl Into<String>, message: impl Into<String>) -> Self {
        ImportError::Source {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn statement(sql: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ImportError::Statement {
            sql: sql.into(),
            message: err.to_string(),
        }
    }

    /// Classify a database error raised while running `sql`
    ///
    /// Transport and pool failures mean the connection is gone and become
    /// [`ImportError::Connection`]; anything the database itself rejected
    /// stays a [`ImportError::Statement`].
    pub fn from_store(sql: impl Into<String>, err: sqlx::Error) -> Self {
        if is_connection_error(&err) {
            ImportError::connection("database", err)
        } else {
            ImportError::statement(sql, err)
        }
    }

    /// Whether the whole run must stop (as opposed to just the current sheet)
    pub fn is_fatal(&self) -> bool {
        matches!(self, ImportError::Connection { .. } | ImportError::Source { .. })
    }
}

/// Errors after which no further statement can succeed on this connection
pub fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::WorkerCrashed
    )
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Connection { target, message } => {
                write!(f, "failed to connect to {}: {}", target, message)
            }
            ImportError::Source { path, message } => {
                write!(f, "failed to read {}: {}", path, message)
            }
            ImportError::Statement { sql, message } => {
                write!(f, "statement failed ({}): {}", sql, message)
            }
        }
    }
}

impl std::error::Error for ImportError {}
