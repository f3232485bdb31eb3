//! # Money Module
//!
//! Provides the `Money` type for nightly prices, service fees and balances.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  A merchant balance of 0.30 debited by fees of 0.10 and 0.20:          │
//! │    0.30 - 0.1 - 0.2 = 5.55e-17   ❌ balance "never" reaches zero        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    30 - 10 - 20 = 0              ✅ ledger snapshot matches balance     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use innkeep_core::money::Money;
//!
//! let nightly = Money::from_cents(8000);
//! let stay = nightly.multiply_nights(3);
//! assert_eq!(stay.cents(), 24000);
//!
//! // 15% of the nightly price (basis points)
//! assert_eq!(nightly.percentage(1500).cents(), 1200);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

/// Basis points in 100%.
pub const BPS_SCALE: i64 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: ledger deltas are negative for debits
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **No float constructor**: every amount enters the system as an integer
///
/// ## Where Money is Used
/// ```text
/// RoomTemplate.base_price ──► price() ──► BookedRoom.price ──► Booking.total
///                                              │
///                                              └──► service_fee() ──► LedgerEntry.amount
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use innkeep_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative values to zero.
    ///
    /// ## Example
    /// ```rust
    /// use innkeep_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-50).clamp_to_zero(), Money::zero());
    /// assert_eq!(Money::from_cents(50).clamp_to_zero().cents(), 50);
    /// ```
    #[inline]
    pub const fn clamp_to_zero(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Returns `bps` basis points of this amount, rounded half up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`. The i128 intermediate
    /// keeps large balances from overflowing.
    ///
    /// ## Example
    /// ```rust
    /// use innkeep_core::money::Money;
    ///
    /// let price = Money::from_cents(1000);
    /// assert_eq!(price.percentage(825).cents(), 83); // 82.5 rounds up
    /// ```
    pub fn percentage(&self, bps: i64) -> Money {
        let part = (self.0 as i128 * bps as i128 + (BPS_SCALE as i128 / 2)) / BPS_SCALE as i128;
        Money::from_cents(part as i64)
    }

    /// Multiplies a nightly amount by the number of nights stayed.
    ///
    /// ## Example
    /// ```rust
    /// use innkeep_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(299).multiply_nights(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_nights(&self, nights: i64) -> Self {
        Money(self.0 * nights)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering for logs; the frontend owns currency formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
