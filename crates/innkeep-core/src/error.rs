//! # Error Types
//!
//! Domain-specific error types for innkeep-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  innkeep-core errors (this file)                                       │
//! │  ├── CoreError        - Booking/inventory/ledger rule violations       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  innkeep-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  innkeep-engine errors                                                 │
//! │  └── EngineError      - What the API layer sees (kind + field)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError ← DbError             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the booking engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No discount tier matches the requested occupancy.
    ///
    /// ## When This Occurs
    /// - Occupancy below max guests with no active tier for that count
    /// - Occupancy above max guests
    ///
    /// The whole booking is rejected; `line` is the index of the offending
    /// request line.
    #[error("No price defined for template {template_id} with {occupants} occupants (line {line})")]
    PriceUndefined {
        template_id: String,
        occupants: i64,
        line: usize,
    },

    /// A physical room conflicts with an existing BUSY interval.
    #[error("Room {room_id} is unavailable from {from} until {until}")]
    RoomUnavailable {
        room_id: String,
        from: chrono::NaiveDate,
        until: chrono::NaiveDate,
    },

    /// The merchant balance cannot cover the requested debit.
    ///
    /// ## User Workflow
    /// ```text
    /// Accept booking (2 rooms × fee 5)
    ///      │
    ///      ▼
    /// Σ fees = 10, balance = 4
    ///      │
    ///      ▼
    /// InsufficientBalance { required: 10, available: 4 }
    ///      │
    ///      ▼
    /// UI: "Top up your balance to accept the order"
    /// ```
    #[error("Insufficient balance on account {account_id}: required {required}, available {available}")]
    InsufficientBalance {
        account_id: String,
        required: Money,
        available: Money,
    },

    /// Operation attempted from a state that forbids it.
    #[error("Booking {booking_id} is {from}, cannot {action}")]
    InvalidStatusTransition {
        booking_id: String,
        from: String,
        action: String,
    },

    /// Record missing or not owned by the caller.
    #[error("{entity} not found: {id}")]
    RecordNotFound { entity: String, id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a RecordNotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::RecordNotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a request doesn't meet requirements and are
/// raised before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, inverted date range).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate room label).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Returns the name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::Duplicate { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
