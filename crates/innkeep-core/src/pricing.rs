//! # Pricing Engine
//!
//! Computes the nightly price of one booking line from its room template.
//!
//! ## Decision Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  price(template, occupants, resident, now)                              │
//! │                                                                         │
//! │  track = resident ? template.resident : template.standard               │
//! │                                                                         │
//! │  occupants == max_guests ?                                              │
//! │     │ yes                               │ no                            │
//! │     ▼                                   ▼                               │
//! │  primary discount active at now?     OccupancyDiscounts[occupants]      │
//! │     │ yes          │ no                 │ found         │ none          │
//! │     ▼              ▼                    ▼               ▼               │
//! │  base - discount   base              base - tier     Undefined         │
//! │                                                      (PriceUndefined)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Results are clamped at zero. The function reads no clock and holds no
//! state: identical inputs give identical output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::BillingUnit;

// =============================================================================
// Discounts
// =============================================================================

/// An amount taken off a base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Discount {
    pub unit: BillingUnit,
    /// Minor units for `FixedValue`, basis points for `Percentage`.
    pub amount: i64,
}

impl Discount {
    pub const fn fixed(cents: i64) -> Self {
        Discount {
            unit: BillingUnit::FixedValue,
            amount: cents,
        }
    }

    pub const fn percentage(bps: i64) -> Self {
        Discount {
            unit: BillingUnit::Percentage,
            amount: bps,
        }
    }

    /// Discounted price, never below zero.
    pub fn apply(&self, base: Money) -> Money {
        (base - self.unit.portion(base, self.amount)).clamp_to_zero()
    }
}

/// Inclusive time window during which a primary discount applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountWindow {
    #[ts(as = "String")]
    pub from: DateTime<Utc>,
    #[ts(as = "String")]
    pub until: DateTime<Utc>,
}

impl DiscountWindow {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.from <= now && now <= self.until
    }
}

/// The discount applied when a room is booked at full capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PrimaryDiscount {
    #[serde(flatten)]
    pub discount: Discount,
    /// `None` means always active.
    pub window: Option<DiscountWindow>,
}

impl PrimaryDiscount {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.window.map_or(true, |w| w.contains(now))
    }
}

/// A discount for a specific occupancy below capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OccupancyTier {
    pub occupants: i64,
    #[serde(flatten)]
    pub discount: Discount,
    pub is_active: bool,
}

/// Lookup of occupancy tiers keyed by occupant count.
///
/// Built from the stored tier list in order; when several active tiers name
/// the same occupant count, the first one wins. Inactive tiers are skipped.
#[derive(Debug, Clone, Default)]
pub struct OccupancyDiscounts {
    by_occupants: BTreeMap<i64, Discount>,
}

impl OccupancyDiscounts {
    pub fn new(tiers: &[OccupancyTier]) -> Self {
        let mut by_occupants = BTreeMap::new();
        for tier in tiers.iter().filter(|t| t.is_active) {
            by_occupants.entry(tier.occupants).or_insert(tier.discount);
        }
        OccupancyDiscounts { by_occupants }
    }

    pub fn get(&self, occupants: i64) -> Option<&Discount> {
        self.by_occupants.get(&occupants)
    }

    pub fn len(&self) -> usize {
        self.by_occupants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_occupants.is_empty()
    }
}

// =============================================================================
// Room Template
// =============================================================================

/// Base price and discounts for one guest category (resident or not).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceTrack {
    pub base_price_cents: i64,
    pub discount: Option<PrimaryDiscount>,
    #[serde(default)]
    pub occupancy_tiers: Vec<OccupancyTier>,
}

impl PriceTrack {
    pub fn flat(base_price_cents: i64) -> Self {
        PriceTrack {
            base_price_cents,
            discount: None,
            occupancy_tiers: Vec::new(),
        }
    }

    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }
}

/// A rentable room category belonging to one property.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoomTemplate {
    pub id: String,
    pub property_id: String,
    pub room_type_id: String,
    pub name: String,
    pub standard: PriceTrack,
    pub resident: PriceTrack,
    pub max_guests: i64,
    pub max_children: i64,
    /// Number of physical rooms under this template.
    pub room_count: i64,
    /// Retired templates stay for history but cannot be booked.
    pub is_deleted: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl RoomTemplate {
    /// Picks the price track for the guest category.
    pub fn track(&self, resident: bool) -> &PriceTrack {
        if resident {
            &self.resident
        } else {
            &self.standard
        }
    }
}

/// Pricing and capacity fields a merchant supplies when creating or
/// updating a template.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TemplateDraft {
    pub room_type_id: String,
    pub name: String,
    pub standard: PriceTrack,
    pub resident: PriceTrack,
    pub max_guests: i64,
    #[serde(default)]
    pub max_children: i64,
}

// =============================================================================
// Price Calculation
// =============================================================================

/// Computes the nightly price, or `None` when no tier covers `occupants`.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use innkeep_core::pricing::{price, Discount, PriceTrack, PrimaryDiscount, RoomTemplate};
///
/// let track = PriceTrack {
///     base_price_cents: 100,
///     discount: Some(PrimaryDiscount { discount: Discount::fixed(20), window: None }),
///     occupancy_tiers: vec![],
/// };
/// let template = RoomTemplate {
///     id: "t".into(), property_id: "p".into(), room_type_id: "rt".into(), name: "Double".into(),
///     standard: track.clone(), resident: track, max_guests: 2, max_children: 0,
///     room_count: 1, is_deleted: false, created_at: Utc::now(), updated_at: Utc::now(),
/// };
///
/// assert_eq!(price(&template, 2, false, Utc::now()).unwrap().cents(), 80);
/// assert!(price(&template, 1, false, Utc::now()).is_none());
/// ```
pub fn price(
    template: &RoomTemplate,
    occupants: i64,
    resident: bool,
    now: DateTime<Utc>,
) -> Option<Money> {
    let track = template.track(resident);
    let base = track.base_price().clamp_to_zero();

    if occupants == template.max_guests {
        let price = match track.discount {
            Some(primary) if primary.is_active(now) => primary.discount.apply(base),
            _ => base,
        };
        return Some(price);
    }

    OccupancyDiscounts::new(&track.occupancy_tiers)
        .get(occupants)
        .map(|discount| discount.apply(base))
}

/// Prices one request line, naming the line in the error.
pub fn price_line(
    template: &RoomTemplate,
    occupants: i64,
    resident: bool,
    now: DateTime<Utc>,
    line: usize,
) -> CoreResult<Money> {
    price(template, occupants, resident, now).ok_or_else(|| CoreError::PriceUndefined {
        template_id: template.id.clone(),
        occupants,
        line,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
    }

    fn template(standard: PriceTrack, resident: PriceTrack, max_guests: i64) -> RoomTemplate {
        RoomTemplate {
            id: "tpl-1".to_string(),
            property_id: "prop-1".to_string(),
            room_type_id: "rt-1".to_string(),
            name: "Double".to_string(),
            standard,
            resident,
            max_guests,
            max_children: 1,
            room_count: 3,
            is_deleted: false,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn with_primary(base: i64, discount: Discount, window: Option<DiscountWindow>) -> PriceTrack {
        PriceTrack {
            base_price_cents: base,
            discount: Some(PrimaryDiscount { discount, window }),
            occupancy_tiers: Vec::new(),
        }
    }

    fn tier(occupants: i64, discount: Discount, is_active: bool) -> OccupancyTier {
        OccupancyTier {
            occupants,
            discount,
            is_active,
        }
    }

    #[test]
    fn test_full_capacity_fixed_discount() {
        let track = with_primary(100, Discount::fixed(20), None);
        let t = template(track.clone(), track, 2);
        assert_eq!(price(&t, 2, false, now()), Some(Money::from_cents(80)));
    }

    #[test]
    fn test_full_capacity_percentage_discount() {
        let track = with_primary(10_000, Discount::percentage(1_500), None);
        let t = template(track.clone(), track, 2);
        assert_eq!(price(&t, 2, false, now()), Some(Money::from_cents(8_500)));
    }

    #[test]
    fn test_discount_window() {
        let open = DiscountWindow {
            from: now() - Duration::days(1),
            until: now() + Duration::days(1),
        };
        let expired = DiscountWindow {
            from: now() - Duration::days(10),
            until: now() - Duration::days(1),
        };

        let t = template(with_primary(100, Discount::fixed(30), Some(open)), PriceTrack::flat(100), 2);
        assert_eq!(price(&t, 2, false, now()).unwrap().cents(), 70);

        let t = template(with_primary(100, Discount::fixed(30), Some(expired)), PriceTrack::flat(100), 2);
        assert_eq!(price(&t, 2, false, now()).unwrap().cents(), 100);

        // Bounds are inclusive.
        let edge = DiscountWindow { from: now(), until: now() };
        assert!(edge.contains(now()));
    }

    #[test]
    fn test_no_discount_is_base_price() {
        let t = template(PriceTrack::flat(12_345), PriceTrack::flat(10_000), 3);
        assert_eq!(price(&t, 3, false, now()).unwrap().cents(), 12_345);
        assert_eq!(price(&t, 3, true, now()).unwrap().cents(), 10_000);
    }

    #[test]
    fn test_resident_track_is_separate() {
        let standard = with_primary(100, Discount::fixed(10), None);
        let resident = with_primary(60, Discount::percentage(5_000), None);
        let t = template(standard, resident, 2);
        assert_eq!(price(&t, 2, false, now()).unwrap().cents(), 90);
        assert_eq!(price(&t, 2, true, now()).unwrap().cents(), 30);
    }

    #[test]
    fn test_occupancy_tier_first_active_match_wins() {
        let track = PriceTrack {
            base_price_cents: 1_000,
            discount: Some(PrimaryDiscount {
                discount: Discount::fixed(999),
                window: None,
            }),
            occupancy_tiers: vec![
                tier(1, Discount::fixed(500), false),
                tier(1, Discount::fixed(200), true),
                tier(1, Discount::fixed(100), true),
                tier(2, Discount::percentage(1_000), true),
            ],
        };
        let t = template(track, PriceTrack::flat(1_000), 3);

        assert_eq!(price(&t, 1, false, now()).unwrap().cents(), 800);
        assert_eq!(price(&t, 2, false, now()).unwrap().cents(), 900);
    }

    #[test]
    fn test_no_tier_is_undefined() {
        let track = PriceTrack {
            base_price_cents: 1_000,
            discount: None,
            occupancy_tiers: vec![tier(1, Discount::fixed(100), false)],
        };
        let t = template(track, PriceTrack::flat(1_000), 2);

        assert!(price(&t, 1, false, now()).is_none());
        // Above capacity never matches a tier either.
        assert!(price(&t, 5, false, now()).is_none());

        let err = price_line(&t, 1, false, now(), 3).unwrap_err();
        assert!(matches!(err, CoreError::PriceUndefined { line: 3, occupants: 1, .. }));
    }

    #[test]
    fn test_negative_price_clamps_to_zero() {
        let track = with_primary(50, Discount::fixed(80), None);
        let t = template(track.clone(), track, 1);
        assert_eq!(price(&t, 1, false, now()), Some(Money::zero()));
    }

    #[test]
    fn test_price_never_exceeds_base() {
        let track = PriceTrack {
            base_price_cents: 777,
            discount: Some(PrimaryDiscount {
                discount: Discount::percentage(333),
                window: None,
            }),
            occupancy_tiers: (1..4)
                .map(|n| tier(n, Discount::percentage(n * 700), true))
                .collect(),
        };
        let t = template(track, PriceTrack::flat(777), 4);

        for occupants in 1..=4 {
            let first = price(&t, occupants, false, now()).unwrap();
            let second = price(&t, occupants, false, now()).unwrap();
            assert_eq!(first, second);
            assert!(first.cents() <= 777);
            assert!(!first.is_negative());
        }
    }

    #[test]
    fn test_tier_json_shape() {
        let tier: OccupancyTier = serde_json::from_str(
            r#"{"occupants":1,"unit":"percentage","amount":1000,"is_active":true}"#,
        )
        .unwrap();
        assert_eq!(tier.discount, Discount::percentage(1_000));
        assert_eq!(OccupancyDiscounts::new(&[tier]).len(), 1);
    }
}
