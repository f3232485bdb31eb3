//! Shared setup for engine tests.
//!
//! One merchant with an active property, a "Double" room type charging a
//! fixed fee of 5 per line, and one template with rooms A1, A2, A3.
//! The clock is pinned to 2026-06-15 12:00 UTC.
//!
//! [`Fixture::on_disk`] uses a temp-file database with a pool of several
//! connections, for tests where transitions race each other.

use chrono::{NaiveDate, TimeZone, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::clock::FixedClock;
use crate::config::EngineConfig;
use crate::engine::Engine;
use innkeep_core::pricing::{Discount, OccupancyTier, PriceTrack, PrimaryDiscount};
use innkeep_core::{
    BillingUnit, BookingDetails, BookingRequest, FeeSchedule, Money, RoomAssignment, RoomRequest, TemplateDraft,
};
use innkeep_db::{Database, DbConfig};

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
}

/// Base 100 for both tracks; 2 guests get 20 off, 1 guest gets 10% off.
pub fn double_room_draft(room_type_id: &str) -> TemplateDraft {
    let track = PriceTrack {
        base_price_cents: 100,
        discount: Some(PrimaryDiscount {
            discount: Discount::fixed(20),
            window: None,
        }),
        occupancy_tiers: vec![OccupancyTier {
            occupants: 1,
            discount: Discount::percentage(1_000),
            is_active: true,
        }],
    };

    TemplateDraft {
        room_type_id: room_type_id.to_string(),
        name: "Double".to_string(),
        standard: track.clone(),
        resident: track,
        max_guests: 2,
        max_children: 0,
    }
}

pub struct Fixture {
    pub engine: Engine,
    pub clock: Arc<FixedClock>,
    pub account_id: String,
    pub property_id: String,
    pub room_type_id: String,
    pub template_id: String,
    pub room_ids: Vec<String>,
    /// Database file removed on drop; `None` for in-memory fixtures.
    db_path: Option<PathBuf>,
}

impl Fixture {
    pub async fn new(balance: i64) -> Self {
        Self::build(DbConfig::in_memory(), None, balance, true, 3).await
    }

    /// Same setup, but the room type has no fee schedule so the configured
    /// default fee applies.
    pub async fn without_fee_schedule(balance: i64) -> Self {
        Self::build(DbConfig::in_memory(), None, balance, false, 3).await
    }

    /// File-backed store with eight pooled connections and `rooms` rooms
    /// (A1, A2, ...) in the template.
    pub async fn on_disk(balance: i64, rooms: usize) -> Self {
        let path = std::env::temp_dir().join(format!("innkeep-engine-{}.db", Uuid::new_v4()));
        let config = DbConfig::new(&path)
            .max_connections(8)
            .busy_timeout(Duration::from_secs(10));
        Self::build(config, Some(path), balance, true, rooms).await
    }

    async fn build(
        config: DbConfig,
        db_path: Option<PathBuf>,
        balance: i64,
        with_fee_schedule: bool,
        rooms: usize,
    ) -> Self {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()));
        let db = Database::new(config).await.unwrap();
        let engine = Engine::with_clock(db, EngineConfig::default(), clock.clone());

        let account = engine.create_merchant_account("Seaside Hotels").await.unwrap();
        let property = engine.create_property(&account.id, "Seaside Inn").await.unwrap();
        engine.set_active_property(&account.id, &property.id).await.unwrap();

        let room_type = engine.create_room_type("Double", 2).await.unwrap();
        if with_fee_schedule {
            engine
                .upsert_fee_schedule(&FeeSchedule::uniform(room_type.id.clone(), BillingUnit::FixedValue, 5))
                .await
                .unwrap();
        }

        let labels: Vec<String> = (1..=rooms).map(|n| format!("A{n}")).collect();
        let created = engine
            .create_template(&property.id, &double_room_draft(&room_type.id), &labels)
            .await
            .unwrap();

        engine
            .record_external_top_up(&account.id, Money::from_cents(balance))
            .await
            .unwrap();

        Fixture {
            engine,
            clock,
            account_id: account.id,
            property_id: property.id,
            room_type_id: room_type.id,
            template_id: created.template.id,
            room_ids: created.rooms.into_iter().map(|r| r.id).collect(),
            db_path,
        }
    }

    pub async fn balance(&self) -> i64 {
        self.engine
            .db()
            .merchants()
            .get_account(&self.account_id)
            .await
            .unwrap()
            .unwrap()
            .balance_cents
    }

    /// A 1 July to 3 July request with one line per occupant count.
    pub fn request(&self, occupants: &[i64]) -> BookingRequest {
        BookingRequest {
            property_id: self.property_id.clone(),
            booked_from: date(7, 1),
            booked_until: date(7, 3),
            rooms: occupants
                .iter()
                .map(|&occupant_count| RoomRequest {
                    template_id: self.template_id.clone(),
                    occupant_count,
                    resident: false,
                    bed_type_id: None,
                    bed_for_children: false,
                })
                .collect(),
        }
    }

    /// Creates a pending booking for the guest "guest".
    pub async fn create(&self, occupants: &[i64]) -> BookingDetails {
        self.engine.create_booking("guest", &self.request(occupants)).await.unwrap()
    }

    /// Assigns line `i` to `room_ids[rooms[i]]`.
    pub fn assign(&self, details: &BookingDetails, rooms: &[usize]) -> Vec<RoomAssignment> {
        details
            .rooms
            .iter()
            .zip(rooms)
            .map(|(line, &room)| RoomAssignment {
                booked_room_id: line.id.clone(),
                physical_room_id: self.room_ids[room].clone(),
            })
            .collect()
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        if let Some(path) = &self.db_path {
            for suffix in ["", "-wal", "-shm"] {
                let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
            }
        }
    }
}
