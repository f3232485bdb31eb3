//! # innkeep-db: Database Layer for Innkeep
//!
//! This crate provides database access for the Innkeep booking engine.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Innkeep Data Flow                                │
//! │                                                                         │
//! │  Engine operation (accept, cancel, reports)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     innkeep-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ MerchantRepo  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ RoomRepo      │    │ 001_initial  │  │   │
//! │  │   │ Transactions  │    │ InventoryRepo │    │   _schema    │  │   │
//! │  │   │               │    │ BookingRepo   │    │              │  │   │
//! │  │   │               │    │ LedgerRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   SQLite: overlap trigger, balance CHECK, immutable ledger      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use innkeep_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("innkeep.db")).await?;
//!
//! let free = db.inventory().free_rooms(&template_id, from, until).await?;
//! let statement = db.ledger().statement(&account_id, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::booking::BookingRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::ledger::{LedgerRepository, NewLedgerEntry};
pub use repository::merchant::MerchantRepository;
pub use repository::room::RoomRepository;
