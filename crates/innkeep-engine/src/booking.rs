//! # Booking State Machine
//!
//! Drives a booking through its lifecycle. Each transition is one SQLite
//! transaction: on any error the transaction is dropped and nothing it
//! wrote survives.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create ──► PENDING ──accept──► CONFIRMED ──activate──► ACTIVE         │
//! │               │  ▲                 │    │                   │           │
//! │               │  └────update───────┘    │                 close         │
//! │        reject │                         │                   ▼           │
//! │   cancel(guest)                 cancel(guest|merchant)    CLOSED        │
//! │               ▼                         ▼                               │
//! │            CANCELED ◄───────────────────┘                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Effects per Transition
//! ```text
//! ┌────────────────────┬─────────────────────────┬────────────────────────┐
//! │ transition         │ inventory               │ ledger                 │
//! ├────────────────────┼─────────────────────────┼────────────────────────┤
//! │ create             │ -                       │ -                      │
//! │ update (pending)   │ -                       │ -                      │
//! │ update (confirmed) │ release all lines       │ credit every line fee  │
//! │ accept             │ reserve assigned rooms  │ debit every line fee   │
//! │ reject             │ -                       │ -                      │
//! │ cancel (pending)   │ -                       │ -                      │
//! │ cancel (confirmed) │ release all lines       │ credit every line fee  │
//! │ activate           │ -                       │ -                      │
//! │ close              │ release all lines       │ -                      │
//! └────────────────────┴─────────────────────────┴────────────────────────┘
//! ```
//!
//! Every transition that can touch money or rooms starts by locking the
//! owning merchant account, so two of them on the same account run one
//! after the other.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::inventory;
use crate::ledger::{self, LedgerContext};
use innkeep_core::fees::service_fee;
use innkeep_core::pricing::price_line;
use innkeep_core::validation::{validate_booking_request, validate_reason};
use innkeep_core::{
    BookedRoom, Booking, BookingAction, BookingDetails, BookingRequest, BookingStatus, CanceledBy, CoreError,
    LedgerEntry, MerchantAccount, Money, RoomAssignment, RoomTemplate, StayRange, ValidationError,
};
use innkeep_db::{BookingRepository, MerchantRepository, RoomRepository};

/// Result of a successful acceptance.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptOutcome {
    pub details: BookingDetails,
    /// One debit per line, in line order.
    pub entries: Vec<LedgerEntry>,
}

impl AcceptOutcome {
    pub fn total_fee(&self) -> Money {
        self.entries.iter().map(|e| -e.amount()).sum()
    }
}

// =============================================================================
// Lookups
// =============================================================================

async fn fetch_template(conn: &mut SqliteConnection, template_id: &str) -> EngineResult<RoomTemplate> {
    RoomRepository::fetch_template(conn, template_id)
        .await?
        .ok_or_else(|| CoreError::not_found("RoomTemplate", template_id).into())
}

async fn fetch_booking(conn: &mut SqliteConnection, booking_id: &str) -> EngineResult<Booking> {
    BookingRepository::fetch_booking(conn, booking_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Booking", booking_id).into())
}

/// A guest's own booking; someone else's is reported as missing.
pub(crate) async fn guest_booking(
    conn: &mut SqliteConnection,
    requester_id: &str,
    booking_id: &str,
) -> EngineResult<Booking> {
    let booking = fetch_booking(conn, booking_id).await?;
    if booking.requester_id != requester_id {
        return Err(CoreError::not_found("Booking", booking_id).into());
    }
    Ok(booking)
}

/// The account's active property.
pub(crate) fn active_property(account: &MerchantAccount) -> EngineResult<&str> {
    account
        .active_property_id
        .as_deref()
        .ok_or_else(|| CoreError::not_found("ActiveProperty", &account.id).into())
}

/// A booking of the account's active property, with the locked account.
async fn merchant_booking(
    conn: &mut SqliteConnection,
    account_id: &str,
    booking_id: &str,
    now: DateTime<Utc>,
) -> EngineResult<(MerchantAccount, Booking)> {
    let account = MerchantRepository::lock_account(conn, account_id, now).await?;
    let property_id = active_property(&account)?;

    let booking = fetch_booking(conn, booking_id).await?;
    if booking.property_id != property_id {
        return Err(CoreError::not_found("Booking", booking_id).into());
    }
    Ok((account, booking))
}

/// Locks the account owning a property.
async fn lock_owner(conn: &mut SqliteConnection, property_id: &str, now: DateTime<Utc>) -> EngineResult<MerchantAccount> {
    let property = MerchantRepository::fetch_property(conn, property_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Property", property_id))?;
    Ok(MerchantRepository::lock_account(conn, &property.account_id, now).await?)
}

fn stay_of(booking: &Booking) -> EngineResult<StayRange> {
    Ok(StayRange::new(booking.booked_from, booking.booked_until)?)
}

// =============================================================================
// Lines
// =============================================================================

/// Priced lines for a request, plus total price and occupant count.
struct PricedLines {
    lines: Vec<BookedRoom>,
    total: Money,
    occupants: i64,
}

/// Prices every requested line. Fails on the first line without a price;
/// nothing is written.
async fn price_request(
    conn: &mut SqliteConnection,
    booking_id: &str,
    request: &BookingRequest,
    stay: StayRange,
    now: DateTime<Utc>,
) -> EngineResult<PricedLines> {
    let mut templates: HashMap<&str, RoomTemplate> = HashMap::new();
    let mut lines = Vec::with_capacity(request.rooms.len());
    let mut nightly = Money::zero();
    let mut occupants = 0;

    for (index, room) in request.rooms.iter().enumerate() {
        if !templates.contains_key(room.template_id.as_str()) {
            let template = fetch_template(conn, &room.template_id).await?;
            if template.is_deleted || template.property_id != request.property_id {
                return Err(CoreError::not_found("RoomTemplate", &room.template_id).into());
            }
            templates.insert(room.template_id.as_str(), template);
        }
        let template = &templates[room.template_id.as_str()];

        let price = price_line(template, room.occupant_count, room.resident, now, index)?;
        nightly += price;
        occupants += room.occupant_count;

        lines.push(BookedRoom {
            id: Uuid::new_v4().to_string(),
            booking_id: booking_id.to_string(),
            template_id: template.id.clone(),
            physical_room_id: None,
            booked_from: stay.from(),
            booked_until: stay.until(),
            status: BookingStatus::Pending,
            price_cents: price.cents(),
            occupant_count: room.occupant_count,
            resident: room.resident,
            bed_type_id: room.bed_type_id.clone(),
            bed_for_children: room.bed_for_children,
            fee_cents: None,
            created_at: now,
        });
    }

    Ok(PricedLines {
        lines,
        total: nightly.multiply_nights(stay.nights()),
        occupants,
    })
}

fn ledger_context(booking: &Booking, room_type_id: &str) -> LedgerContext {
    LedgerContext {
        booking_id: Some(booking.id.clone()),
        property_id: Some(booking.property_id.clone()),
        room_type_id: Some(room_type_id.to_string()),
    }
}

/// Releases every line's rooms and credits back the fees taken at
/// acceptance.
async fn reverse_acceptance(
    conn: &mut SqliteConnection,
    account_id: &str,
    booking: &Booking,
    lines: &[BookedRoom],
    today: NaiveDate,
    now: DateTime<Utc>,
) -> EngineResult<Vec<LedgerEntry>> {
    let mut entries = Vec::new();

    for line in lines {
        inventory::release_line(conn, line, today).await?;

        if let Some(fee) = line.fee() {
            let template = fetch_template(conn, &line.template_id).await?;
            let entry = ledger::credit(
                conn,
                account_id,
                fee,
                &ledger_context(booking, &template.room_type_id),
                now,
            )
            .await?;
            entries.push(entry);
        }
    }

    Ok(entries)
}

async fn release_all(conn: &mut SqliteConnection, lines: &[BookedRoom], today: NaiveDate) -> EngineResult<()> {
    for line in lines {
        inventory::release_line(conn, line, today).await?;
    }
    Ok(())
}

async fn details(conn: &mut SqliteConnection, booking_id: &str) -> EngineResult<BookingDetails> {
    let booking = fetch_booking(conn, booking_id).await?;
    let rooms = BookingRepository::fetch_lines(conn, booking_id).await?;
    Ok(BookingDetails { booking, rooms })
}

/// Pairs each line with its assigned room. Every line needs exactly one
/// assignment and every assignment must name a line of this booking.
fn match_assignments<'a>(
    booking_id: &str,
    lines: &'a [BookedRoom],
    assignments: &'a [RoomAssignment],
) -> EngineResult<Vec<(&'a BookedRoom, &'a str)>> {
    let line_ids: HashSet<&str> = lines.iter().map(|l| l.id.as_str()).collect();
    let mut by_line: HashMap<&str, &str> = HashMap::new();

    for assignment in assignments {
        if !line_ids.contains(assignment.booked_room_id.as_str()) {
            return Err(CoreError::not_found("BookedRoom", &assignment.booked_room_id).into());
        }
        if by_line
            .insert(assignment.booked_room_id.as_str(), assignment.physical_room_id.as_str())
            .is_some()
        {
            return Err(ValidationError::Duplicate {
                field: "booked_room_id".to_string(),
                value: assignment.booked_room_id.clone(),
            }
            .into());
        }
    }

    lines
        .iter()
        .map(|line| {
            by_line
                .get(line.id.as_str())
                .map(|room| (line, *room))
                .ok_or_else(|| {
                    debug!(booking_id = %booking_id, line_id = %line.id, "Line has no room assignment");
                    EngineError::from(ValidationError::Required {
                        field: "assignments".to_string(),
                    })
                })
        })
        .collect()
}

impl Engine {
    // =========================================================================
    // Guest transitions
    // =========================================================================

    /// Creates a PENDING booking. No rooms are held and nothing is charged.
    ///
    /// ## Errors
    /// * `PriceUndefined` - a line's occupancy has no price; nothing is created
    /// * `RecordNotFound` - unknown property, or a template that is retired or
    ///   belongs to another property
    pub async fn create_booking(&self, requester_id: &str, request: &BookingRequest) -> EngineResult<BookingDetails> {
        let stay = validate_booking_request(request)?;
        let now = self.now();
        let booking_id = Uuid::new_v4().to_string();

        let mut tx = self.db().begin().await?;
        MerchantRepository::fetch_property(&mut tx, &request.property_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Property", &request.property_id))?;

        let priced = price_request(&mut tx, &booking_id, request, stay, now).await?;
        let booking = Booking {
            id: booking_id,
            requester_id: requester_id.to_string(),
            property_id: request.property_id.clone(),
            booked_from: stay.from(),
            booked_until: stay.until(),
            total_price_cents: priced.total.cents(),
            occupant_count: priced.occupants,
            status: BookingStatus::Pending,
            canceled_by: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };

        BookingRepository::insert_booking(&mut tx, &booking).await?;
        for line in &priced.lines {
            BookingRepository::insert_line(&mut tx, line).await?;
        }
        tx.commit().await?;

        info!(
            booking_id = %booking.id,
            requester_id = %requester_id,
            lines = priced.lines.len(),
            nights = stay.nights(),
            total = %priced.total,
            "Booking created"
        );
        Ok(BookingDetails {
            booking,
            rooms: priced.lines,
        })
    }

    /// Replaces the lines of a PENDING or CONFIRMED booking.
    ///
    /// A CONFIRMED booking gives back its rooms and fees and returns to
    /// PENDING; the merchant has to accept it again.
    pub async fn update_booking(
        &self,
        requester_id: &str,
        booking_id: &str,
        request: &BookingRequest,
    ) -> EngineResult<BookingDetails> {
        let stay = validate_booking_request(request)?;
        let now = self.now();
        let today = self.today();

        let mut tx = self.db().begin().await?;
        let booking = guest_booking(&mut tx, requester_id, booking_id).await?;
        let next = booking.status.transition(booking_id, BookingAction::Update)?;
        if request.property_id != booking.property_id {
            return Err(ValidationError::InvalidFormat {
                field: "property_id".to_string(),
                reason: "a booking cannot move to another property".to_string(),
            }
            .into());
        }

        let account = lock_owner(&mut tx, &booking.property_id, now).await?;

        if booking.status.holds_inventory() {
            let old_lines = BookingRepository::fetch_lines(&mut tx, booking_id).await?;
            let credits = reverse_acceptance(&mut tx, &account.id, &booking, &old_lines, today, now).await?;
            debug!(booking_id = %booking_id, credits = credits.len(), "Confirmed booking reopened");
        }

        let priced = price_request(&mut tx, booking_id, request, stay, now).await?;
        BookingRepository::delete_lines(&mut tx, booking_id).await?;
        for line in &priced.lines {
            BookingRepository::insert_line(&mut tx, line).await?;
        }
        BookingRepository::update_stay(
            &mut tx,
            booking_id,
            (stay.from(), stay.until()),
            priced.total.cents(),
            priced.occupants,
            next,
            now,
        )
        .await?;

        let updated = details(&mut tx, booking_id).await?;
        tx.commit().await?;

        info!(booking_id = %booking_id, from = %booking.status, total = %priced.total, "Booking updated");
        Ok(updated)
    }

    /// Guest cancels a PENDING or CONFIRMED booking.
    pub async fn cancel_booking(&self, requester_id: &str, booking_id: &str, reason: Option<&str>) -> EngineResult<Booking> {
        let reason = validate_reason(reason)?;
        let now = self.now();
        let today = self.today();

        let mut tx = self.db().begin().await?;
        let booking = guest_booking(&mut tx, requester_id, booking_id).await?;
        booking.status.transition(booking_id, BookingAction::CancelByGuest)?;
        let account = lock_owner(&mut tx, &booking.property_id, now).await?;

        if booking.status.holds_inventory() {
            let lines = BookingRepository::fetch_lines(&mut tx, booking_id).await?;
            reverse_acceptance(&mut tx, &account.id, &booking, &lines, today, now).await?;
        }
        BookingRepository::cancel(&mut tx, booking_id, CanceledBy::Guest, reason.as_deref(), now).await?;

        let canceled = fetch_booking(&mut tx, booking_id).await?;
        tx.commit().await?;

        info!(booking_id = %booking_id, from = %booking.status, "Booking canceled by guest");
        Ok(canceled)
    }

    // =========================================================================
    // Merchant transitions
    // =========================================================================

    /// Confirms a PENDING booking, reserving the assigned rooms and debiting
    /// one service fee per line.
    ///
    /// All or nothing: if the fees exceed the balance, or any room turns
    /// out to be taken, no room is held and no fee is charged.
    ///
    /// ## Errors
    /// * `InsufficientBalance` - Σ fees > balance
    /// * `RoomUnavailable` - an assigned room is busy for the stay
    /// * `Validation` - a line without an assignment, or a room from another template
    pub async fn accept_booking(
        &self,
        account_id: &str,
        booking_id: &str,
        assignments: &[RoomAssignment],
    ) -> EngineResult<AcceptOutcome> {
        let now = self.now();

        let mut tx = self.db().begin().await?;
        let (account, booking) = merchant_booking(&mut tx, account_id, booking_id, now).await?;
        let next = booking.status.transition(booking_id, BookingAction::Accept)?;
        let stay = stay_of(&booking)?;

        let lines = BookingRepository::fetch_lines(&mut tx, booking_id).await?;
        let pairs = match_assignments(booking_id, &lines, assignments)?;

        // Price every fee first so the balance check sees the whole sum.
        let mut planned = Vec::with_capacity(pairs.len());
        for (line, room_id) in pairs {
            let room = RoomRepository::fetch_room(&mut tx, room_id)
                .await?
                .ok_or_else(|| CoreError::not_found("PhysicalRoom", room_id))?;
            if room.template_id != line.template_id {
                return Err(ValidationError::InvalidFormat {
                    field: "physical_room_id".to_string(),
                    reason: format!("room {} does not belong to the booked template", room.label),
                }
                .into());
            }

            let template = fetch_template(&mut tx, &line.template_id).await?;
            let schedule = RoomRepository::fetch_fee_schedule(&mut tx, &template.room_type_id).await?;
            let fee = service_fee(schedule.as_ref(), line.price(), line.resident, self.default_fee());
            planned.push((line, room_id, template.room_type_id, fee));
        }

        let required: Money = planned.iter().map(|(_, _, _, fee)| *fee).sum();
        if required > account.balance() {
            warn!(
                account_id = %account_id,
                booking_id = %booking_id,
                %required,
                available = %account.balance(),
                "Acceptance refused: insufficient balance"
            );
            return Err(CoreError::InsufficientBalance {
                account_id: account_id.to_string(),
                required,
                available: account.balance(),
            }
            .into());
        }

        let mut entries = Vec::with_capacity(planned.len());
        for (line, room_id, room_type_id, fee) in planned {
            inventory::reserve(&mut tx, room_id, &line.id, stay, now).await?;
            let entry = ledger::debit(&mut tx, account_id, fee, &ledger_context(&booking, &room_type_id), now).await?;
            BookingRepository::assign_line(&mut tx, &line.id, room_id, fee.cents()).await?;
            entries.push(entry);
        }
        BookingRepository::set_status(&mut tx, booking_id, next, now).await?;

        let details = details(&mut tx, booking_id).await?;
        tx.commit().await?;

        info!(
            booking_id = %booking_id,
            account_id = %account_id,
            lines = entries.len(),
            fees = %required,
            "Booking accepted"
        );
        Ok(AcceptOutcome { details, entries })
    }

    /// Merchant declines a PENDING booking.
    pub async fn reject_booking(&self, account_id: &str, booking_id: &str, reason: Option<&str>) -> EngineResult<Booking> {
        let reason = validate_reason(reason)?;
        let now = self.now();

        let mut tx = self.db().begin().await?;
        let (_, booking) = merchant_booking(&mut tx, account_id, booking_id, now).await?;
        booking.status.transition(booking_id, BookingAction::Reject)?;
        BookingRepository::cancel(&mut tx, booking_id, CanceledBy::Merchant, reason.as_deref(), now).await?;

        let rejected = fetch_booking(&mut tx, booking_id).await?;
        tx.commit().await?;

        info!(booking_id = %booking_id, account_id = %account_id, "Booking rejected");
        Ok(rejected)
    }

    /// Merchant cancels a CONFIRMED booking: rooms released, fees credited.
    pub async fn cancel_accepted_booking(
        &self,
        account_id: &str,
        booking_id: &str,
        reason: Option<&str>,
    ) -> EngineResult<Booking> {
        let reason = validate_reason(reason)?;
        let now = self.now();
        let today = self.today();

        let mut tx = self.db().begin().await?;
        let (_, booking) = merchant_booking(&mut tx, account_id, booking_id, now).await?;
        booking.status.transition(booking_id, BookingAction::CancelByMerchant)?;

        let lines = BookingRepository::fetch_lines(&mut tx, booking_id).await?;
        let credits = reverse_acceptance(&mut tx, account_id, &booking, &lines, today, now).await?;
        BookingRepository::cancel(&mut tx, booking_id, CanceledBy::Merchant, reason.as_deref(), now).await?;

        let canceled = fetch_booking(&mut tx, booking_id).await?;
        tx.commit().await?;

        info!(booking_id = %booking_id, account_id = %account_id, credits = credits.len(), "Accepted booking canceled");
        Ok(canceled)
    }

    /// Guest has checked in.
    pub async fn activate_booking(&self, account_id: &str, booking_id: &str) -> EngineResult<Booking> {
        let now = self.now();

        let mut tx = self.db().begin().await?;
        let (_, booking) = merchant_booking(&mut tx, account_id, booking_id, now).await?;
        let next = booking.status.transition(booking_id, BookingAction::Activate)?;
        BookingRepository::set_status(&mut tx, booking_id, next, now).await?;

        let active = fetch_booking(&mut tx, booking_id).await?;
        tx.commit().await?;

        info!(booking_id = %booking_id, "Booking active");
        Ok(active)
    }

    /// Stay is over: rooms are free again. No ledger effect.
    pub async fn close_booking(&self, account_id: &str, booking_id: &str) -> EngineResult<Booking> {
        let now = self.now();
        let today = self.today();

        let mut tx = self.db().begin().await?;
        let (_, booking) = merchant_booking(&mut tx, account_id, booking_id, now).await?;
        let next = booking.status.transition(booking_id, BookingAction::Close)?;

        let lines = BookingRepository::fetch_lines(&mut tx, booking_id).await?;
        release_all(&mut tx, &lines, today).await?;
        BookingRepository::set_status(&mut tx, booking_id, next, now).await?;

        let closed = fetch_booking(&mut tx, booking_id).await?;
        tx.commit().await?;

        info!(booking_id = %booking_id, "Booking closed");
        Ok(closed)
    }
}
