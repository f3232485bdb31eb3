//! # Booking Status Graph
//!
//! The only legal transitions a booking can make.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Booking Lifecycle                                 │
//! │                                                                         │
//! │   PENDING ──accept──► CONFIRMED ──activate──► ACTIVE ──close──► CLOSED  │
//! │      │                    │                                             │
//! │      │ reject /           │ cancel (guest or merchant)                  │
//! │      │ guest cancel       │                                             │
//! │      ▼                    ▼                                             │
//! │   CANCELED ◄──────────────┘                                             │
//! │                                                                         │
//! │   update: PENDING → PENDING, CONFIRMED → PENDING (rooms released)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Anything else fails with `CoreError::InvalidStatusTransition`.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Booking Status
// =============================================================================

/// The status of a booking and of each of its lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Requested by the guest; holds no physical room.
    Pending,
    /// Accepted by the merchant; rooms reserved and fees debited.
    Confirmed,
    /// Guest checked in.
    Active,
    /// Stay over; terminal.
    Closed,
    /// Canceled by guest or merchant; terminal.
    Canceled,
}

impl Default for BookingStatus {
    fn default() -> Self {
        BookingStatus::Pending
    }
}

impl BookingStatus {
    /// Returns the status reached by applying `action`, if legal.
    pub fn next(self, action: BookingAction) -> Option<BookingStatus> {
        use BookingAction::*;
        use BookingStatus::*;

        match (self, action) {
            (Pending | Confirmed, Update) => Some(Pending),
            (Pending, Accept) => Some(Confirmed),
            (Pending, Reject) => Some(Canceled),
            (Pending | Confirmed, CancelByGuest) => Some(Canceled),
            (Confirmed, CancelByMerchant) => Some(Canceled),
            (Confirmed, Activate) => Some(Active),
            (Active, Close) => Some(Closed),
            _ => None,
        }
    }

    /// Like [`BookingStatus::next`], but reports an illegal move as an error.
    ///
    /// ## Example
    /// ```rust
    /// use innkeep_core::{BookingAction, BookingStatus};
    ///
    /// let next = BookingStatus::Pending.transition("b-1", BookingAction::Accept).unwrap();
    /// assert_eq!(next, BookingStatus::Confirmed);
    /// assert!(BookingStatus::Closed.transition("b-1", BookingAction::Activate).is_err());
    /// ```
    pub fn transition(self, booking_id: &str, action: BookingAction) -> CoreResult<BookingStatus> {
        self.next(action)
            .ok_or_else(|| CoreError::InvalidStatusTransition {
                booking_id: booking_id.to_string(),
                from: self.to_string(),
                action: action.to_string(),
            })
    }

    /// Confirmed and active bookings own BUSY intervals and debited fees.
    pub fn holds_inventory(self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Active)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Active => "active",
            BookingStatus::Closed => "closed",
            BookingStatus::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Booking Action
// =============================================================================

/// Operations that move a booking through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingAction {
    Update,
    Accept,
    Reject,
    CancelByGuest,
    CancelByMerchant,
    Activate,
    Close,
}

impl fmt::Display for BookingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingAction::Update => "update",
            BookingAction::Accept => "accept",
            BookingAction::Reject => "reject",
            BookingAction::CancelByGuest => "cancel by guest",
            BookingAction::CancelByMerchant => "cancel by merchant",
            BookingAction::Activate => "activate",
            BookingAction::Close => "close",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Who Canceled
// =============================================================================

/// Which side canceled a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CanceledBy {
    Guest,
    Merchant,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Active,
        BookingStatus::Closed,
        BookingStatus::Canceled,
    ];

    const ALL_ACTIONS: [BookingAction; 7] = [
        BookingAction::Update,
        BookingAction::Accept,
        BookingAction::Reject,
        BookingAction::CancelByGuest,
        BookingAction::CancelByMerchant,
        BookingAction::Activate,
        BookingAction::Close,
    ];

    #[test]
    fn test_happy_path() {
        let s = BookingStatus::Pending;
        let s = s.next(BookingAction::Accept).unwrap();
        let s = s.next(BookingAction::Activate).unwrap();
        let s = s.next(BookingAction::Close).unwrap();
        assert_eq!(s, BookingStatus::Closed);
    }

    #[test]
    fn test_side_branches() {
        assert_eq!(
            BookingStatus::Pending.next(BookingAction::Reject),
            Some(BookingStatus::Canceled)
        );
        assert_eq!(
            BookingStatus::Confirmed.next(BookingAction::CancelByMerchant),
            Some(BookingStatus::Canceled)
        );
        assert_eq!(
            BookingStatus::Confirmed.next(BookingAction::Update),
            Some(BookingStatus::Pending)
        );
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        for status in [BookingStatus::Closed, BookingStatus::Canceled] {
            for action in ALL_ACTIONS {
                assert!(status.next(action).is_none(), "{status} + {action}");
            }
        }
    }

    #[test]
    fn test_legal_transition_count() {
        let legal = ALL_STATUSES
            .iter()
            .flat_map(|s| ALL_ACTIONS.iter().map(move |a| (*s, *a)))
            .filter(|(s, a)| s.next(*a).is_some())
            .count();
        // update×2, accept, reject, guest cancel×2, merchant cancel, activate, close
        assert_eq!(legal, 9);
    }

    #[test]
    fn test_active_cannot_be_canceled() {
        let err = BookingStatus::Active
            .transition("b-9", BookingAction::CancelByGuest)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidStatusTransition { .. }));
        assert_eq!(err.to_string(), "Booking b-9 is active, cannot cancel by guest");
    }

    #[test]
    fn test_holds_inventory() {
        assert!(!BookingStatus::Pending.holds_inventory());
        assert!(BookingStatus::Confirmed.holds_inventory());
        assert!(BookingStatus::Active.holds_inventory());
        assert!(!BookingStatus::Closed.holds_inventory());
    }
}
