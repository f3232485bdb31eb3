//! # Service Fees
//!
//! The platform takes a fee from the merchant balance for every booking line
//! it accepts. The fee is configured per room type, separately for resident
//! and non-resident guests.
//!
//! ```text
//! line ──► room type ──► FeeSchedule?
//!                           │ some                    │ none
//!                           ▼                         ▼
//!                  resident ? resident_* : *     default fee (config)
//!                           │
//!              fixed ─► amount    percentage ─► line price × bps
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::BillingUnit;

/// Fee configuration for one room type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FeeSchedule {
    pub room_type_id: String,
    pub unit: BillingUnit,
    pub amount: i64,
    pub resident_unit: BillingUnit,
    pub resident_amount: i64,
}

impl FeeSchedule {
    /// Same fee for residents and non-residents.
    pub fn uniform(room_type_id: impl Into<String>, unit: BillingUnit, amount: i64) -> Self {
        FeeSchedule {
            room_type_id: room_type_id.into(),
            unit,
            amount,
            resident_unit: unit,
            resident_amount: amount,
        }
    }

    /// Fee for one line priced at `line_price`.
    pub fn fee_for(&self, line_price: Money, resident: bool) -> Money {
        let (unit, amount) = if resident {
            (self.resident_unit, self.resident_amount)
        } else {
            (self.unit, self.amount)
        };
        unit.portion(line_price, amount).clamp_to_zero()
    }
}

/// Fee for one line, falling back to `default_fee` when the room type has
/// no schedule.
///
/// ## Example
/// ```rust
/// use innkeep_core::fees::{service_fee, FeeSchedule};
/// use innkeep_core::{BillingUnit, Money};
///
/// let default_fee = Money::from_cents(1000);
/// let schedule = FeeSchedule::uniform("rt-1", BillingUnit::FixedValue, 5);
///
/// assert_eq!(service_fee(Some(&schedule), Money::from_cents(8000), false, default_fee).cents(), 5);
/// assert_eq!(service_fee(None, Money::from_cents(8000), false, default_fee).cents(), 1000);
/// ```
pub fn service_fee(
    schedule: Option<&FeeSchedule>,
    line_price: Money,
    resident: bool,
    default_fee: Money,
) -> Money {
    match schedule {
        Some(schedule) => schedule.fee_for(line_price, resident),
        None => default_fee,
    }
}
