//! # Reporting Types
//!
//! Periods, sort orders and result shapes for the merchant dashboard.
//! Queries live in innkeep-db; this module only decides what a period means.

use chrono::{DateTime, Days, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::status::BookingStatus;

// =============================================================================
// Statistics Period
// =============================================================================

/// A reporting window relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StatsPeriod {
    Last30Days,
    Last15Days,
    LastWeek,
    Yesterday,
    Today,
}

impl StatsPeriod {
    /// Half-open `[start, end)` window for this period.
    ///
    /// Rolling periods end at the start of tomorrow so they include the
    /// whole of today.
    ///
    /// ```text
    ///            Yesterday        Today
    ///         ├─────────────┼─────────────┤
    ///  ───────┴─────────────┴──────●──────┴──► time
    ///    LastWeek: [now - 7d, start of tomorrow)
    /// ```
    pub fn window(self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let tomorrow = today + Duration::days(1);

        match self {
            StatsPeriod::Today => (today, tomorrow),
            StatsPeriod::Yesterday => (today - Duration::days(1), today),
            StatsPeriod::LastWeek => (now - Duration::days(7), tomorrow),
            StatsPeriod::Last15Days => (now - Duration::days(15), tomorrow),
            StatsPeriod::Last30Days => (now - Duration::days(30), tomorrow),
        }
    }
}

/// Start of the day after `now`, as used by rolling windows.
pub fn end_of_today(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .checked_add_days(Days::new(1))
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or(now)
}

// =============================================================================
// Listing Options
// =============================================================================

/// Sort order for the merchant's pending order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderSort {
    /// Newest first.
    #[default]
    ByDate,
    /// Most expensive first.
    ByPrice,
    /// Largest party first.
    ByOccupants,
}

/// Filter for bookings the merchant is currently serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ServingFilter {
    Confirmed,
    Active,
}

impl ServingFilter {
    pub fn status(self) -> BookingStatus {
        match self {
            ServingFilter::Confirmed => BookingStatus::Confirmed,
            ServingFilter::Active => BookingStatus::Active,
        }
    }
}

/// Filter for finished bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FinishedFilter {
    Closed,
    Canceled,
}

impl FinishedFilter {
    pub fn status(self) -> BookingStatus {
        match self {
            FinishedFilter::Closed => BookingStatus::Closed,
            FinishedFilter::Canceled => BookingStatus::Canceled,
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Order counts for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderStatistics {
    pub total: i64,
    pub last_30_days: i64,
    pub yesterday: i64,
    pub today: i64,
}

/// Booking counts for a property within a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookingStatistics {
    pub total: i64,
    /// Pending bookings created in the period.
    pub booked: i64,
    /// Active bookings (guests in residence) in the period.
    pub reside: i64,
}

/// Revenue against platform fees for a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AccountingSummary {
    pub revenue_cents: i64,
    pub fees_cents: i64,
    pub profit_cents: i64,
}

impl AccountingSummary {
    /// `fees` is the net outflow (debits minus reversals) as a positive amount.
    pub fn new(revenue: Money, fees: Money) -> Self {
        AccountingSummary {
            revenue_cents: revenue.cents(),
            fees_cents: fees.cents(),
            profit_cents: (revenue - fees).cents(),
        }
    }
}
