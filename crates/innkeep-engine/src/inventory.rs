//! # Inventory Index
//!
//! Reserves and releases physical rooms. Intervals in
//! `room_status_intervals` are the truth; `physical_rooms.status` is a
//! display cache kept in step here.
//!
//! ## Reserve
//! ```text
//! reserve(room, line, stay)
//!   │
//!   ├── any BUSY interval overlapping stay? ──► RoomUnavailable
//!   │
//!   ├── INSERT interval ──► trigger finds overlap ──► RoomUnavailable
//!   │                       (a concurrent writer got there first)
//!   │
//!   └── physical_rooms.status = busy
//! ```
//!
//! Release deletes the interval and sets the cached status back to EMPTY
//! once nothing keeps the room busy today. Rooms under renovation keep
//! their status.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use innkeep_core::{BookedRoom, CoreError, PhysicalRoom, RoomStatus, RoomStatusInterval, StayRange};
use innkeep_db::{DbError, InventoryRepository, RoomRepository};

fn unavailable(room_id: &str, stay: StayRange) -> EngineError {
    CoreError::RoomUnavailable {
        room_id: room_id.to_string(),
        from: stay.from(),
        until: stay.until(),
    }
    .into()
}

async fn fetch_room(conn: &mut SqliteConnection, room_id: &str) -> EngineResult<PhysicalRoom> {
    RoomRepository::fetch_room(conn, room_id)
        .await?
        .ok_or_else(|| CoreError::not_found("PhysicalRoom", room_id).into())
}

/// Rooms of the template with no BUSY interval overlapping the stay.
pub async fn free_rooms(
    conn: &mut SqliteConnection,
    template_id: &str,
    stay: StayRange,
) -> EngineResult<Vec<PhysicalRoom>> {
    Ok(InventoryRepository::fetch_free_rooms(conn, template_id, stay.from(), stay.until()).await?)
}

async fn insert_busy(
    conn: &mut SqliteConnection,
    room_id: &str,
    booked_room_id: Option<&str>,
    stay: StayRange,
    now: DateTime<Utc>,
) -> EngineResult<RoomStatusInterval> {
    if !InventoryRepository::is_room_free(conn, room_id, stay.from(), stay.until()).await? {
        return Err(unavailable(room_id, stay));
    }

    let interval = RoomStatusInterval {
        id: Uuid::new_v4().to_string(),
        physical_room_id: Some(room_id.to_string()),
        booked_room_id: booked_room_id.map(str::to_string),
        status: RoomStatus::Busy,
        status_from: stay.from(),
        status_until: stay.until(),
        disabled: booked_room_id.is_none(),
        created_at: now,
    };

    match InventoryRepository::insert_interval(conn, &interval).await {
        Ok(()) => Ok(interval),
        Err(DbError::IntervalOverlap { .. }) => Err(unavailable(room_id, stay)),
        Err(e) => Err(e.into()),
    }
}

/// Holds a room for a booking line and marks it busy.
///
/// ## Errors
/// * `RoomUnavailable` - another BUSY interval overlaps the stay
pub async fn reserve(
    conn: &mut SqliteConnection,
    room_id: &str,
    booked_room_id: &str,
    stay: StayRange,
    now: DateTime<Utc>,
) -> EngineResult<RoomStatusInterval> {
    let interval = insert_busy(conn, room_id, Some(booked_room_id), stay, now).await?;
    RoomRepository::set_room_status(conn, room_id, RoomStatus::Busy).await?;

    debug!(room_id = %room_id, booked_room_id = %booked_room_id, from = %stay.from(), until = %stay.until(), "Room reserved");
    Ok(interval)
}

/// Removes an interval and resets the room's cached status if it is free today.
pub async fn release(
    conn: &mut SqliteConnection,
    room_id: &str,
    interval_id: &str,
    today: NaiveDate,
) -> EngineResult<()> {
    InventoryRepository::delete_interval(conn, interval_id).await?;

    let room = fetch_room(conn, room_id).await?;
    if room.status == RoomStatus::Busy {
        let tomorrow = today.succ_opt().unwrap_or(today);
        if InventoryRepository::is_room_free(conn, room_id, today, tomorrow).await? {
            RoomRepository::set_room_status(conn, room_id, RoomStatus::Empty).await?;
        }
    }

    debug!(room_id = %room_id, interval_id = %interval_id, "Room released");
    Ok(())
}

/// Releases every interval held for one booking line.
pub async fn release_line(conn: &mut SqliteConnection, line: &BookedRoom, today: NaiveDate) -> EngineResult<usize> {
    let intervals = InventoryRepository::fetch_for_booked_room(conn, &line.id).await?;
    let mut released = 0;
    for interval in intervals {
        // Rooms deleted since acceptance leave intervals without a room.
        match interval.physical_room_id.as_deref() {
            Some(room_id) => release(conn, room_id, &interval.id, today).await?,
            None => InventoryRepository::delete_interval(conn, &interval.id).await?,
        }
        released += 1;
    }
    Ok(released)
}

impl Engine {
    /// Guest-facing availability for a template.
    pub async fn free_room_count(&self, template_id: &str, from: NaiveDate, until: NaiveDate) -> EngineResult<usize> {
        let stay = StayRange::new(from, until)?;
        let mut conn = self.db().pool().acquire().await?;
        let template = RoomRepository::fetch_template(&mut conn, template_id)
            .await?
            .filter(|t| !t.is_deleted)
            .ok_or_else(|| CoreError::not_found("RoomTemplate", template_id))?;

        Ok(free_rooms(&mut conn, &template.id, stay).await?.len())
    }

    /// Administrative block on a room, outside any booking.
    pub async fn block_room(&self, room_id: &str, from: NaiveDate, until: NaiveDate) -> EngineResult<RoomStatusInterval> {
        let stay = StayRange::new(from, until)?;
        let now = self.now();
        let mut tx = self.db().begin().await?;
        fetch_room(&mut tx, room_id).await?;
        let interval = insert_busy(&mut tx, room_id, None, stay, now).await?;
        tx.commit().await?;

        info!(room_id = %room_id, %from, %until, interval_id = %interval.id, "Room blocked");
        Ok(interval)
    }

    /// Lifts an administrative block. Intervals held by bookings are not
    /// blocks and are reported as not found.
    pub async fn unblock_room(&self, room_id: &str, interval_id: &str) -> EngineResult<()> {
        let today = self.today();
        let mut tx = self.db().begin().await?;
        let interval = InventoryRepository::fetch_interval(&mut tx, interval_id)
            .await?
            .filter(|i| i.physical_room_id.as_deref() == Some(room_id) && i.booked_room_id.is_none())
            .ok_or_else(|| CoreError::not_found("RoomBlock", interval_id))?;

        release(&mut tx, room_id, &interval.id, today).await?;
        tx.commit().await?;

        info!(room_id = %room_id, interval_id = %interval_id, "Room unblocked");
        Ok(())
    }

    /// Sets the cached display status of a room.
    pub async fn set_room_status(&self, room_id: &str, status: RoomStatus) -> EngineResult<()> {
        let mut conn = self.db().pool().acquire().await?;
        RoomRepository::set_room_status(&mut conn, room_id, status).await?;
        info!(room_id = %room_id, ?status, "Room status set");
        Ok(())
    }

    /// Intervals of a room ending after `from_date`, in date order.
    pub async fn room_schedule(&self, room_id: &str, from_date: NaiveDate) -> EngineResult<Vec<RoomStatusInterval>> {
        Ok(self.db().inventory().schedule(room_id, from_date).await?)
    }
}
