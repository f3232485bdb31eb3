//! # innkeep-engine: Booking, Inventory and Ledger Engine
//!
//! Runs every booking transition against the store. Each public operation
//! opens one SQLite transaction, does all of its reads and writes on that
//! transaction's connection, and commits only if every step succeeded.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Innkeep Layers                                 │
//! │                                                                         │
//! │  API layer (HTTP, auth, notifications: out of scope)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  innkeep-engine (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   booking ──► inventory ──► ledger        catalogue  reports   │   │
//! │  │      │            │            │              │          │      │   │
//! │  └──────┼────────────┼────────────┼──────────────┼──────────┼──────┘   │
//! │         ▼            ▼            ▼              ▼          ▼          │
//! │  innkeep-core (pricing, fees, status graph)  innkeep-db (SQLite)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - The [`Engine`] handle: database, config, clock
//! - [`booking`] - Booking state machine (create, update, accept, cancel, close)
//! - [`inventory`] - Room reservation, release and administrative blocks
//! - [`ledger`] - Fee debits, reversals and operator top-ups
//! - [`catalogue`] - Accounts, properties, room types, templates
//! - [`reports`] - Guest lists, merchant listings, statistics, accounting
//! - [`config`] - TOML configuration with environment overrides
//! - [`error`] - Engine errors and their caller-facing kinds
//!
//! ## Usage
//!
//! ```rust,ignore
//! use innkeep_engine::{Engine, EngineConfig};
//!
//! let engine = Engine::open(EngineConfig::load(None)?).await?;
//!
//! let booking = engine.create_booking(&guest_id, &request).await?;
//! let outcome = engine.accept_booking(&account_id, &booking.booking.id, &assignments).await?;
//! println!("charged {}", outcome.total_fee());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod booking;
pub mod catalogue;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod reports;

#[cfg(test)]
pub(crate) mod fixtures;

// =============================================================================
// Re-exports
// =============================================================================

pub use booking::AcceptOutcome;
pub use catalogue::TemplateWithRooms;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, EngineResult, ErrorKind, ErrorReport};
pub use ledger::LedgerContext;
