//! # Stay Ranges
//!
//! Half-open date ranges `[from, until)` used for bookings and occupancy
//! intervals. `from` is the check-in date, `until` the check-out date; the
//! guest does not occupy the room on the night of `until`.
//!
//! ```text
//!   from                until
//!    │  night 1 │ night 2 │
//!    ▼          ▼         ▼
//!   10th       11th      12th      nights() = 2
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A validated half-open date range with at least one night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StayRange {
    from: NaiveDate,
    until: NaiveDate,
}

impl StayRange {
    /// Creates a range, rejecting empty or inverted ranges.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use innkeep_core::StayRange;
    ///
    /// let d = |day| NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
    /// assert_eq!(StayRange::new(d(10), d(12)).unwrap().nights(), 2);
    /// assert!(StayRange::new(d(12), d(12)).is_err());
    /// ```
    pub fn new(from: NaiveDate, until: NaiveDate) -> Result<Self, ValidationError> {
        if until <= from {
            return Err(ValidationError::InvalidFormat {
                field: "booked_until".to_string(),
                reason: "check-out must be after check-in".to_string(),
            });
        }
        Ok(StayRange { from, until })
    }

    #[inline]
    pub fn from(&self) -> NaiveDate {
        self.from
    }

    #[inline]
    pub fn until(&self) -> NaiveDate {
        self.until
    }

    /// Number of nights stayed.
    pub fn nights(&self) -> i64 {
        (self.until - self.from).num_days()
    }
}
