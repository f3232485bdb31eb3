//! # Validation Module
//!
//! Input validation for booking requests and catalogue edits.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: API layer                                                    │
//! │  ├── Deserialization into request types                                │
//! │  └── Authentication, ownership                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: innkeep-engine (Rust)                                        │
//! │  └── THIS MODULE: field rules before any transaction opens             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE / FOREIGN KEY / CHECK constraints                          │
//! │  └── Overlap trigger on BUSY intervals                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use innkeep_core::validation::{validate_occupant_count, validate_room_label};
//!
//! validate_room_label("A1").unwrap();
//! validate_occupant_count(2).unwrap();
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::money::BPS_SCALE;
use crate::pricing::{Discount, PriceTrack, TemplateDraft};
use crate::stay::StayRange;
use crate::types::{BillingUnit, BookingRequest};
use crate::{MAX_OCCUPANTS_PER_ROOM, MAX_ROOMS_PER_BOOKING};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a physical room label.
///
/// ## Rules
/// - Must not be empty
/// - At most 20 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use innkeep_core::validation::validate_room_label;
///
/// assert!(validate_room_label("A1").is_ok());
/// assert!(validate_room_label("").is_err());
/// assert!(validate_room_label("room 12").is_err());
/// ```
pub fn validate_room_label(label: &str) -> ValidationResult<()> {
    let label = label.trim();

    if label.is_empty() {
        return Err(ValidationError::Required {
            field: "room_label".to_string(),
        });
    }

    if label.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "room_label".to_string(),
            max: 20,
        });
    }

    if !label
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "room_label".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a list of labels: each label valid, none repeated.
pub fn validate_room_labels(labels: &[String]) -> ValidationResult<()> {
    if labels.is_empty() {
        return Err(ValidationError::Required {
            field: "room_labels".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for label in labels {
        validate_room_label(label)?;
        if !seen.insert(label.trim()) {
            return Err(ValidationError::Duplicate {
                field: "room_label".to_string(),
                value: label.trim().to_string(),
            });
        }
    }

    Ok(())
}

/// Validates a display name (property, template, account title).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an optional cancellation reason and returns it trimmed.
pub fn validate_reason(reason: Option<&str>) -> ValidationResult<Option<String>> {
    let reason = reason.map(str::trim).filter(|r| !r.is_empty());

    if let Some(r) = reason {
        if r.len() > 500 {
            return Err(ValidationError::TooLong {
                field: "reason".to_string(),
                max: 500,
            });
        }
    }

    Ok(reason.map(str::to_string))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the occupant count of one booking line.
pub fn validate_occupant_count(count: i64) -> ValidationResult<()> {
    if count <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "occupant_count".to_string(),
        });
    }

    if count > MAX_OCCUPANTS_PER_ROOM {
        return Err(ValidationError::OutOfRange {
            field: "occupant_count".to_string(),
            min: 1,
            max: MAX_OCCUPANTS_PER_ROOM,
        });
    }

    Ok(())
}

/// Validates an amount in minor units (zero allowed).
///
/// ## Example
/// ```rust
/// use innkeep_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents("base_price", 0).is_ok());
/// assert!(validate_amount_cents("base_price", -100).is_err());
/// ```
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a basis point percentage (0% to 100%).
pub fn validate_bps(field: &str, bps: i64) -> ValidationResult<()> {
    if !(0..=BPS_SCALE).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: BPS_SCALE,
        });
    }

    Ok(())
}

/// Validates a billing amount given its unit.
pub fn validate_billing(field: &str, unit: BillingUnit, amount: i64) -> ValidationResult<()> {
    match unit {
        BillingUnit::FixedValue => validate_amount_cents(field, amount),
        BillingUnit::Percentage => validate_bps(field, amount),
    }
}

/// A discount may not take more than the whole base price.
fn validate_discount(field: &str, base_cents: i64, discount: &Discount) -> ValidationResult<()> {
    validate_billing(field, discount.unit, discount.amount)?;

    if discount.unit == BillingUnit::FixedValue && discount.amount > base_cents {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: base_cents,
        });
    }

    Ok(())
}

fn validate_price_track(prefix: &str, track: &PriceTrack, max_guests: i64) -> ValidationResult<()> {
    validate_amount_cents(&format!("{prefix}base_price"), track.base_price_cents)?;

    if let Some(primary) = &track.discount {
        validate_discount(&format!("{prefix}discount"), track.base_price_cents, &primary.discount)?;
        if let Some(window) = primary.window {
            if window.until < window.from {
                return Err(ValidationError::InvalidFormat {
                    field: format!("{prefix}discount_window"),
                    reason: "window ends before it starts".to_string(),
                });
            }
        }
    }

    for tier in &track.occupancy_tiers {
        if tier.occupants < 1 || tier.occupants > max_guests {
            return Err(ValidationError::OutOfRange {
                field: format!("{prefix}occupancy_tiers.occupants"),
                min: 1,
                max: max_guests,
            });
        }
        validate_discount(
            &format!("{prefix}occupancy_tiers.amount"),
            track.base_price_cents,
            &tier.discount,
        )?;
    }

    Ok(())
}

/// Validates a template draft before insert or update.
///
/// ## Rules
/// - Name required; max guests at least 1; max children not negative
/// - Prices non-negative on both tracks
/// - Fixed discounts no larger than the base price, percentages at most 100%
/// - Tier occupancy between 1 and max guests
pub fn validate_template(draft: &TemplateDraft) -> ValidationResult<()> {
    validate_name("name", &draft.name)?;

    if draft.max_guests < 1 {
        return Err(ValidationError::MustBePositive {
            field: "max_guests".to_string(),
        });
    }

    if draft.max_children < 0 || draft.max_children > draft.max_guests {
        return Err(ValidationError::OutOfRange {
            field: "max_children".to_string(),
            min: 0,
            max: draft.max_guests,
        });
    }

    validate_price_track("", &draft.standard, draft.max_guests)?;
    validate_price_track("resident_", &draft.resident, draft.max_guests)?;

    Ok(())
}

// =============================================================================
// Booking Request
// =============================================================================

/// Validates the shape of a create/update request and returns its stay.
///
/// ## Rules
/// - check-out after check-in
/// - between 1 and MAX_ROOMS_PER_BOOKING lines
/// - every line has a valid occupant count
pub fn validate_booking_request(request: &BookingRequest) -> ValidationResult<StayRange> {
    let stay = StayRange::new(request.booked_from, request.booked_until)?;

    if request.rooms.is_empty() {
        return Err(ValidationError::Required {
            field: "rooms".to_string(),
        });
    }

    if request.rooms.len() > MAX_ROOMS_PER_BOOKING {
        return Err(ValidationError::OutOfRange {
            field: "rooms".to_string(),
            min: 1,
            max: MAX_ROOMS_PER_BOOKING as i64,
        });
    }

    for room in &request.rooms {
        validate_occupant_count(room.occupant_count)?;
    }

    Ok(stay)
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use innkeep_core::validation::validate_uuid;
///
/// assert!(validate_uuid("booking_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("booking_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{OccupancyTier, PrimaryDiscount};
    use crate::types::RoomRequest;
    use chrono::NaiveDate;

    fn draft() -> TemplateDraft {
        TemplateDraft {
            room_type_id: "rt-1".to_string(),
            name: "Double".to_string(),
            standard: PriceTrack::flat(10_000),
            resident: PriceTrack::flat(8_000),
            max_guests: 2,
            max_children: 1,
        }
    }

    fn request(rooms: Vec<RoomRequest>) -> BookingRequest {
        BookingRequest {
            property_id: "p-1".to_string(),
            booked_from: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            booked_until: NaiveDate::from_ymd_opt(2026, 7, 3).unwrap(),
            rooms,
        }
    }

    fn line(occupants: i64) -> RoomRequest {
        RoomRequest {
            template_id: "t-1".to_string(),
            occupant_count: occupants,
            resident: false,
            bed_type_id: None,
            bed_for_children: false,
        }
    }

    #[test]
    fn test_validate_room_label() {
        assert!(validate_room_label("A1").is_ok());
        assert!(validate_room_label("north_wing-12").is_ok());

        assert!(validate_room_label("").is_err());
        assert!(validate_room_label("   ").is_err());
        assert!(validate_room_label("A 1").is_err());
        assert!(validate_room_label(&"A".repeat(21)).is_err());
    }

    #[test]
    fn test_validate_room_labels_rejects_duplicates() {
        let labels = vec!["A1".to_string(), "A2".to_string(), "A1".to_string()];
        let err = validate_room_labels(&labels).unwrap_err();
        assert!(matches!(err, ValidationError::Duplicate { .. }));
        assert!(validate_room_labels(&[]).is_err());
    }

    #[test]
    fn test_validate_occupant_count() {
        assert!(validate_occupant_count(1).is_ok());
        assert!(validate_occupant_count(MAX_OCCUPANTS_PER_ROOM).is_ok());
        assert!(validate_occupant_count(0).is_err());
        assert!(validate_occupant_count(MAX_OCCUPANTS_PER_ROOM + 1).is_err());
    }

    #[test]
    fn test_validate_bps() {
        assert!(validate_bps("fee", 0).is_ok());
        assert!(validate_bps("fee", 10_000).is_ok());
        assert!(validate_bps("fee", 10_001).is_err());
        assert!(validate_bps("fee", -1).is_err());
    }

    #[test]
    fn test_validate_template() {
        assert!(validate_template(&draft()).is_ok());

        let mut d = draft();
        d.max_guests = 0;
        assert_eq!(validate_template(&d).unwrap_err().field(), "max_guests");

        let mut d = draft();
        d.standard.discount = Some(PrimaryDiscount {
            discount: Discount::fixed(10_001),
            window: None,
        });
        assert_eq!(validate_template(&d).unwrap_err().field(), "discount");

        let mut d = draft();
        d.resident.discount = Some(PrimaryDiscount {
            discount: Discount::percentage(12_000),
            window: None,
        });
        assert_eq!(validate_template(&d).unwrap_err().field(), "resident_discount");

        let mut d = draft();
        d.standard.occupancy_tiers.push(OccupancyTier {
            occupants: 3,
            discount: Discount::fixed(100),
            is_active: true,
        });
        assert!(validate_template(&d).is_err());
    }

    #[test]
    fn test_validate_booking_request() {
        let stay = validate_booking_request(&request(vec![line(2), line(1)])).unwrap();
        assert_eq!(stay.nights(), 2);

        assert!(validate_booking_request(&request(vec![])).is_err());
        assert!(validate_booking_request(&request(vec![line(0)])).is_err());

        let mut inverted = request(vec![line(1)]);
        inverted.booked_until = inverted.booked_from;
        assert!(validate_booking_request(&inverted).is_err());
    }

    #[test]
    fn test_validate_reason() {
        assert_eq!(validate_reason(None).unwrap(), None);
        assert_eq!(validate_reason(Some("  ")).unwrap(), None);
        assert_eq!(validate_reason(Some(" plans changed ")).unwrap().as_deref(), Some("plans changed"));
        assert!(validate_reason(Some(&"x".repeat(501))).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "123").is_err());
    }
}
