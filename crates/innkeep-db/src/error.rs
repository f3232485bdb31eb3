//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineError (innkeep-engine) ← kind + offending field                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ErrorReport serialized for the API layer                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Message prefix raised by the BUSY interval overlap trigger.
pub const OVERLAP_TRIGGER_MESSAGE: &str = "ROOM_UNAVAILABLE";

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate room label within a template
    /// - Duplicate fee schedule for a room type
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Referencing a non-existent template, room type or property
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation.
    ///
    /// ## When This Occurs
    /// - A write would drive `merchant_accounts.balance` below zero
    #[error("Check constraint failed: {field}")]
    CheckViolation { field: String },

    /// The overlap trigger rejected a BUSY interval.
    ///
    /// ## When This Occurs
    /// - Two transactions reserve the same room for overlapping dates;
    ///   the second insert aborts
    #[error("Busy interval overlaps an existing one: {message}")]
    IntervalOverlap { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// SQLite could not take the write lock within `busy_timeout`.
    ///
    /// ## When This Occurs
    /// - Another connection holds the write lock for longer than the wait
    /// - A snapshot went stale between a read and the following write
    ///
    /// Nothing was written; the transition can be retried as a whole.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Stored data could not be decoded (e.g. malformed tier JSON).
    #[error("Corrupt column {column}: {reason}")]
    Decode { column: String, reason: String },

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether retrying the whole transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Busy(_) | DbError::PoolExhausted)
    }

    /// Whether this error is a constraint rejection rather than an I/O fault.
    pub fn is_constraint(&self) -> bool {
        matches!(
            self,
            DbError::UniqueViolation { .. }
                | DbError::ForeignKeyViolation { .. }
                | DbError::CheckViolation { .. }
                | DbError::IntervalOverlap { .. }
        )
    }
}

/// Returns the column part of "UNIQUE constraint failed: table.column".
fn constraint_target(msg: &str, marker: &str) -> String {
    msg.split(marker)
        .nth(1)
        .map(|rest| rest.trim())
        .map(|rest| rest.rsplit('.').next().unwrap_or(rest).to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_BUSY_SNAPSHOT (517).
fn is_busy(code: Option<&str>, msg: &str) -> bool {
    matches!(code, Some("5" | "6" | "517")) || msg.contains("database is locked")
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → DbError::Busy for lock codes, else
///                               analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();

                if is_busy(code.as_deref(), msg) {
                    return DbError::Busy(msg.to_string());
                }

                // SQLite messages:
                //   "UNIQUE constraint failed: <table>.<column>"
                //   "FOREIGN KEY constraint failed"
                //   "CHECK constraint failed: <expr or name>"
                //   "ROOM_UNAVAILABLE: ..." from the overlap trigger
                if msg.contains(OVERLAP_TRIGGER_MESSAGE) {
                    DbError::IntervalOverlap {
                        message: msg.to_string(),
                    }
                } else if msg.contains("UNIQUE constraint failed") {
                    DbError::UniqueViolation {
                        field: constraint_target(msg, "UNIQUE constraint failed:"),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    let target = constraint_target(msg, "CHECK constraint failed:");
                    let field = target
                        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                        .find(|s| !s.is_empty())
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::CheckViolation { field }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::ColumnDecode { index, source } => DbError::Decode {
                column: index,
                reason: source.to_string(),
            },

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
