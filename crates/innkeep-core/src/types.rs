//! # Domain Types
//!
//! Core domain types used throughout Innkeep.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ MerchantAccount │   │    Property     │   │  RoomTemplate   │       │
//! │  │  ─────────────  │──►│  ─────────────  │──►│  (pricing.rs)   │       │
//! │  │  balance_cents  │   │  account_id     │   │  prices, tiers  │       │
//! │  │  active_prop.   │   │  name           │   │  max_guests     │       │
//! │  └────────┬────────┘   └─────────────────┘   └────────┬────────┘       │
//! │           │                                           │                 │
//! │           ▼                                           ▼                 │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   LedgerEntry   │   │     Booking     │   │  PhysicalRoom   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  amount_cents   │   │  status         │   │  label "A1"     │       │
//! │  │  balance_after  │   │  total_price    │   │  status (cache) │       │
//! │  └─────────────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │                                 │ 1..n                │ 0..n            │
//! │                                 ▼                     ▼                 │
//! │                        ┌─────────────────┐   ┌──────────────────┐      │
//! │                        │   BookedRoom    │◄──│RoomStatusInterval│      │
//! │                        │  price, fee     │   │ [from, until)    │      │
//! │                        └─────────────────┘   └──────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity is keyed by a UUID v4 string. Physical rooms also carry a
//! human label unique within their template.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::status::{BookingStatus, CanceledBy};
use crate::stay::StayRange;

// =============================================================================
// Billing Unit
// =============================================================================

/// How a discount or fee amount is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BillingUnit {
    /// Amount is in minor currency units.
    FixedValue,
    /// Amount is in basis points (1000 = 10%).
    Percentage,
}

impl BillingUnit {
    /// Applies this unit to `amount` against `base`, returning the part taken.
    ///
    /// ```rust
    /// use innkeep_core::{BillingUnit, Money};
    ///
    /// let base = Money::from_cents(10_000);
    /// assert_eq!(BillingUnit::FixedValue.portion(base, 2_000).cents(), 2_000);
    /// assert_eq!(BillingUnit::Percentage.portion(base, 1_500).cents(), 1_500);
    /// ```
    pub fn portion(self, base: Money, amount: i64) -> Money {
        match self {
            BillingUnit::FixedValue => Money::from_cents(amount),
            BillingUnit::Percentage => base.percentage(amount),
        }
    }
}

// =============================================================================
// Room Status
// =============================================================================

/// Coarse status of a physical room, or of an occupancy interval.
///
/// On a [`PhysicalRoom`] this is a display cache; overlap checks always go
/// through [`RoomStatusInterval`] rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Empty,
    Busy,
    UnderRenovation,
}

impl Default for RoomStatus {
    fn default() -> Self {
        RoomStatus::Empty
    }
}

// =============================================================================
// Merchant Account & Property
// =============================================================================

/// A merchant's prepaid balance plus the property its staff currently act on.
///
/// `balance_cents` is only ever changed through the ledger, which appends a
/// [`LedgerEntry`] in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MerchantAccount {
    pub id: String,
    pub title: String,
    pub balance_cents: i64,
    pub active_property_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl MerchantAccount {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

/// A hotel or guest house owned by a merchant account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Property {
    pub id: String,
    pub account_id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Room Catalogue
// =============================================================================

/// Platform-wide room category ("Double", "Suite"); fee schedules hang off it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RoomType {
    pub id: String,
    pub name: String,
    pub max_guests: i64,
}

/// One concrete bookable unit under a room template.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PhysicalRoom {
    pub id: String,
    pub template_id: String,
    /// Human label, e.g. "A1". Unique within the template.
    pub label: String,
    /// Cached status for display.
    pub status: RoomStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// An occupancy record: the source of truth for availability.
///
/// `booked_room_id` is NULL for administrative blocks. `physical_room_id`
/// is NULL once the room has been removed from its template.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RoomStatusInterval {
    pub id: String,
    pub physical_room_id: Option<String>,
    pub booked_room_id: Option<String>,
    pub status: RoomStatus,
    #[ts(as = "String")]
    pub status_from: NaiveDate,
    #[ts(as = "String")]
    pub status_until: NaiveDate,
    /// Administrative block rather than a guest stay.
    pub disabled: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Booking
// =============================================================================

/// A guest reservation spanning one date range and one or more lines.
///
/// ## Invariant
/// `total_price_cents == Σ(line.price_cents) × nights`
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Booking {
    pub id: String,
    pub requester_id: String,
    pub property_id: String,
    #[ts(as = "String")]
    pub booked_from: NaiveDate,
    #[ts(as = "String")]
    pub booked_until: NaiveDate,
    pub total_price_cents: i64,
    pub occupant_count: i64,
    pub status: BookingStatus,
    pub canceled_by: Option<CanceledBy>,
    pub cancellation_reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }

    /// Returns the stay range. Persisted bookings always have `until > from`.
    pub fn stay(&self) -> Option<StayRange> {
        StayRange::new(self.booked_from, self.booked_until).ok()
    }

    /// Guests may leave a review only once the stay is over.
    pub fn is_reviewable(&self) -> bool {
        self.status == BookingStatus::Closed
    }
}

/// One priced line inside a booking.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BookedRoom {
    pub id: String,
    pub booking_id: String,
    pub template_id: String,
    /// Assigned at acceptance.
    pub physical_room_id: Option<String>,
    #[ts(as = "String")]
    pub booked_from: NaiveDate,
    #[ts(as = "String")]
    pub booked_until: NaiveDate,
    pub status: BookingStatus,
    /// Nightly price after discounts.
    pub price_cents: i64,
    pub occupant_count: i64,
    pub resident: bool,
    pub bed_type_id: Option<String>,
    pub bed_for_children: bool,
    /// Service fee debited when the booking was accepted.
    pub fee_cents: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl BookedRoom {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// The fee debited at acceptance; `None` while the line is unassigned.
    #[inline]
    pub fn fee(&self) -> Option<Money> {
        self.fee_cents.map(Money::from_cents)
    }
}

/// A booking with its lines, as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookingDetails {
    pub booking: Booking,
    pub rooms: Vec<BookedRoom>,
}

// =============================================================================
// Ledger Entry
// =============================================================================

/// What a ledger entry was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LedgerTitle {
    /// Platform fee taken at acceptance, or its reversal.
    ServiceFee,
    /// Operator edited the balance directly.
    TopUp,
}

/// Outcome tag on a ledger entry.
///
/// Debits and top-ups are `Success`; fee reversals on cancellation are
/// recorded as `Error` (the service was not delivered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LedgerOutcome {
    Success,
    Error,
}

/// Immutable record of one balance mutation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LedgerEntry {
    pub id: String,
    pub account_id: String,
    pub title: LedgerTitle,
    pub outcome: LedgerOutcome,
    /// Signed delta: negative for debits.
    pub amount_cents: i64,
    /// Balance right after this entry was applied.
    pub balance_after_cents: i64,
    pub booking_id: Option<String>,
    pub property_id: Option<String>,
    pub room_type_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Requests
// =============================================================================

/// One requested line in a create/update call.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoomRequest {
    pub template_id: String,
    pub occupant_count: i64,
    #[serde(default)]
    pub resident: bool,
    #[serde(default)]
    pub bed_type_id: Option<String>,
    #[serde(default)]
    pub bed_for_children: bool,
}

/// A guest's booking request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookingRequest {
    pub property_id: String,
    #[ts(as = "String")]
    pub booked_from: NaiveDate,
    #[ts(as = "String")]
    pub booked_until: NaiveDate,
    pub rooms: Vec<RoomRequest>,
}

/// Merchant's choice of physical room for one booking line at acceptance.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoomAssignment {
    pub booked_room_id: String,
    pub physical_room_id: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
