//! # Engine Error Types
//!
//! Every engine operation returns [`EngineResult`]. On `Err` the operation's
//! transaction has already been dropped, so nothing it wrote is visible.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Error Flow                                       │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──┐                                      │
//! │                                  ├──► EngineError ──► kind() / report() │
//! │  sqlx::Error ──────► DbError ────┘                                      │
//! │                                                                         │
//! │  DbError::NotFound          → RecordNotFound                            │
//! │  DbError::IntervalOverlap   → RoomUnavailable                           │
//! │  DbError::CheckViolation    → InsufficientBalance (balance_cents)       │
//! │                               PersistenceConstraintViolation (other)    │
//! │  Unique / ForeignKey        → PersistenceConstraintViolation            │
//! │  DbError::Busy / PoolExhausted → StoreBusy (retryable)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use innkeep_core::{CoreError, ValidationError};
use innkeep_db::DbError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Domain failure (pricing, availability, balance, lifecycle, lookup).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Store failure.
    #[error(transparent)]
    Db(DbError),

    /// Invalid engine configuration.
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::Core(CoreError::RecordNotFound { entity, id }),
            other => EngineError::Db(other),
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Kinds
// =============================================================================

/// The category a caller branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    RoomUnavailable,
    PriceUndefined,
    InsufficientBalance,
    InvalidStatusTransition,
    RecordNotFound,
    PersistenceConstraintViolation,
    Validation,
    Configuration,
    /// The write lock or a connection was not free in time. Nothing was
    /// written; the same call may be repeated.
    StoreBusy,
    Internal,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::RoomUnavailable => "ROOM_UNAVAILABLE",
            ErrorKind::PriceUndefined => "PRICE_UNDEFINED",
            ErrorKind::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorKind::InvalidStatusTransition => "INVALID_STATUS_TRANSITION",
            ErrorKind::RecordNotFound => "RECORD_NOT_FOUND",
            ErrorKind::PersistenceConstraintViolation => "PERSISTENCE_CONSTRAINT_VIOLATION",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Configuration => "CONFIGURATION",
            ErrorKind::StoreBusy => "STORE_BUSY",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::StoreBusy)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Structured error for the calling layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub code: &'static str,
    pub message: String,
    /// Offending field or line, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Core(core) => match core {
                CoreError::PriceUndefined { .. } => ErrorKind::PriceUndefined,
                CoreError::RoomUnavailable { .. } => ErrorKind::RoomUnavailable,
                CoreError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
                CoreError::InvalidStatusTransition { .. } => ErrorKind::InvalidStatusTransition,
                CoreError::RecordNotFound { .. } => ErrorKind::RecordNotFound,
                CoreError::Validation(_) => ErrorKind::Validation,
            },
            EngineError::Db(db) => match db {
                DbError::NotFound { .. } => ErrorKind::RecordNotFound,
                DbError::IntervalOverlap { .. } => ErrorKind::RoomUnavailable,
                DbError::CheckViolation { field } if field == "balance_cents" => ErrorKind::InsufficientBalance,
                DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } | DbError::CheckViolation { .. } => {
                    ErrorKind::PersistenceConstraintViolation
                }
                DbError::Busy(_) | DbError::PoolExhausted => ErrorKind::StoreBusy,
                _ => ErrorKind::Internal,
            },
            EngineError::InvalidConfig(_) | EngineError::ConfigLoadFailed(_) => ErrorKind::Configuration,
        }
    }

    /// The field or line the error points at.
    pub fn field(&self) -> Option<String> {
        match self {
            EngineError::Core(core) => match core {
                CoreError::PriceUndefined { line, .. } => Some(format!("rooms[{line}].occupant_count")),
                CoreError::RoomUnavailable { .. } => Some("physical_room_id".to_string()),
                CoreError::InsufficientBalance { .. } => Some("balance".to_string()),
                CoreError::InvalidStatusTransition { .. } => Some("status".to_string()),
                CoreError::RecordNotFound { entity, .. } => Some(id_field(entity)),
                CoreError::Validation(v) => Some(v.field().to_string()),
            },
            EngineError::Db(db) => match db {
                DbError::UniqueViolation { field, .. } | DbError::CheckViolation { field } => Some(field.clone()),
                DbError::NotFound { entity, .. } => Some(id_field(entity)),
                DbError::IntervalOverlap { .. } => Some("physical_room_id".to_string()),
                _ => None,
            },
            EngineError::InvalidConfig(_) | EngineError::ConfigLoadFailed(_) => None,
        }
    }

    /// Whether repeating the operation unchanged may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.kind().code(),
            message: self.to_string(),
            field: self.field(),
        }
    }
}

/// "ActiveProperty" → "active_property_id".
fn id_field(entity: &str) -> String {
    let mut field = String::with_capacity(entity.len() + 4);
    for (i, c) in entity.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                field.push('_');
            }
            field.extend(c.to_lowercase());
        } else {
            field.push(c);
        }
    }
    field.push_str("_id");
    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use innkeep_core::Money;

    #[test]
    fn test_db_not_found_becomes_record_not_found() {
        let err: EngineError = DbError::not_found("Booking", "b-1").into();
        assert!(matches!(err, EngineError::Core(CoreError::RecordNotFound { .. })));
        assert_eq!(err.kind(), ErrorKind::RecordNotFound);
        assert_eq!(err.field().as_deref(), Some("booking_id"));
    }

    #[test]
    fn test_constraint_kinds() {
        let unique: EngineError = DbError::duplicate("room_label", "A1").into();
        assert_eq!(unique.kind(), ErrorKind::PersistenceConstraintViolation);
        assert_eq!(unique.field().as_deref(), Some("room_label"));

        let balance: EngineError = DbError::CheckViolation {
            field: "balance_cents".to_string(),
        }
        .into();
        assert_eq!(balance.kind(), ErrorKind::InsufficientBalance);

        let overlap: EngineError = DbError::IntervalOverlap {
            message: "ROOM_UNAVAILABLE".to_string(),
        }
        .into();
        assert_eq!(overlap.kind(), ErrorKind::RoomUnavailable);
    }

    #[test]
    fn test_lock_timeout_is_retryable_not_internal() {
        let busy: EngineError = DbError::Busy("database is locked".to_string()).into();
        assert_eq!(busy.kind(), ErrorKind::StoreBusy);
        assert!(busy.is_retryable());
        assert_eq!(busy.report().code, "STORE_BUSY");

        let exhausted: EngineError = DbError::PoolExhausted.into();
        assert_eq!(exhausted.kind(), ErrorKind::StoreBusy);

        let query: EngineError = DbError::QueryFailed("disk I/O error".to_string()).into();
        assert_eq!(query.kind(), ErrorKind::Internal);
        assert!(!query.is_retryable());
    }

    #[test]
    fn test_report() {
        let err = EngineError::from(CoreError::InsufficientBalance {
            account_id: "acc".to_string(),
            required: Money::from_cents(10),
            available: Money::from_cents(4),
        });
        let report = err.report();
        assert_eq!(report.code, "INSUFFICIENT_BALANCE");
        assert_eq!(report.field.as_deref(), Some("balance"));
        assert!(report.message.contains("0.10"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["code"], "INSUFFICIENT_BALANCE");
    }

    #[test]
    fn test_price_undefined_names_line() {
        let err = EngineError::from(CoreError::PriceUndefined {
            template_id: "tpl".to_string(),
            occupants: 3,
            line: 1,
        });
        assert_eq!(err.field().as_deref(), Some("rooms[1].occupant_count"));
    }

    #[test]
    fn test_id_field() {
        assert_eq!(id_field("ActiveProperty"), "active_property_id");
        assert_eq!(id_field("RoomTemplate"), "room_template_id");
        assert_eq!(id_field("Booking"), "booking_id");
    }
}
