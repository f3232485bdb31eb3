//! # Repository Module
//!
//! Database repository implementations for Innkeep.
//!
//! ## Two Kinds of Methods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Reads vs. Transactional Writes                       │
//! │                                                                         │
//! │  Read models (listings, statements, schedules)                         │
//! │       │  db.bookings().list_for_requester(user, &[..])                 │
//! │       ▼                                                                 │
//! │  &self methods on the pool                                             │
//! │                                                                         │
//! │  State transitions (accept, cancel, update, close)                     │
//! │       │  let mut tx = db.begin().await?;                               │
//! │       │  MerchantRepository::lock_account(&mut tx, ..)                 │
//! │       │  InventoryRepository::insert_interval(&mut tx, ..)             │
//! │       │  LedgerRepository::record(&mut tx, ..)                         │
//! │       │  tx.commit().await?;                                           │
//! │       ▼                                                                 │
//! │  associated fns taking `&mut SqliteConnection`                         │
//! │                                                                         │
//! │  Decision reads (balance, free rooms) go through the transaction so    │
//! │  they see exactly what the following writes will change.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`MerchantRepository`](merchant::MerchantRepository) - Accounts, properties, active property
//! - [`RoomRepository`](room::RoomRepository) - Room types, templates, physical rooms, fee schedules
//! - [`InventoryRepository`](inventory::InventoryRepository) - Occupancy intervals
//! - [`BookingRepository`](booking::BookingRepository) - Bookings and their lines
//! - [`LedgerRepository`](ledger::LedgerRepository) - Balance mutations and statements

pub mod booking;
pub mod inventory;
pub mod ledger;
pub mod merchant;
pub mod room;
