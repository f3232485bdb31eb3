//! # innkeep-core: Pure Business Logic for Innkeep
//!
//! Pricing, fees, booking status rules and money math, with no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Innkeep Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 API layer (out of this workspace)               │   │
//! │  │      guest requests, merchant dashboard, notifications          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 innkeep-engine (state machine)                  │   │
//! │  │      create, accept, cancel, close; ledger; inventory           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ innkeep-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │ pricing  │ │   fees   │ │  status  │ │   stay   │          │   │
//! │  │   │ price()  │ │ service_ │ │  graph   │ │ overlap  │          │   │
//! │  │   │ tiers    │ │ fee()    │ │          │ │ nights   │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 innkeep-db (Database Layer)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - Room templates and the nightly price calculation
//! - [`fees`] - Service fee schedules
//! - [`status`] - Booking lifecycle graph
//! - [`stay`] - Half-open date ranges
//! - [`types`] - Domain entities and request shapes
//! - [`reporting`] - Dashboard periods and result shapes
//! - [`validation`] - Field rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use innkeep_core::{BookingAction, BookingStatus, Money};
//!
//! let nightly = Money::from_cents(8_000);
//! assert_eq!(nightly.multiply_nights(2).cents(), 16_000);
//!
//! let status = BookingStatus::Pending.next(BookingAction::Accept);
//! assert_eq!(status, Some(BookingStatus::Confirmed));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fees;
pub mod money;
pub mod pricing;
pub mod reporting;
pub mod status;
pub mod stay;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use fees::FeeSchedule;
pub use money::Money;
pub use pricing::{RoomTemplate, TemplateDraft};
pub use reporting::{
    AccountingSummary, BookingStatistics, FinishedFilter, OrderSort, OrderStatistics, ServingFilter, StatsPeriod,
};
pub use status::{BookingAction, BookingStatus, CanceledBy};
pub use stay::StayRange;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines in a single booking.
pub const MAX_ROOMS_PER_BOOKING: usize = 20;

/// Maximum occupants on one booking line.
pub const MAX_OCCUPANTS_PER_ROOM: i64 = 50;

/// Fee taken per accepted line when its room type has no fee schedule.
///
/// Engines read the effective value from configuration; this is the default.
pub const DEFAULT_SERVICE_FEE_CENTS: i64 = 1_000;
