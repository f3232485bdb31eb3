//! # Seed Data Generator
//!
//! Populates the database with a demo merchant for development.
//!
//! ## Usage
//! ```bash
//! # One property with 3 templates of 4 rooms each (default)
//! cargo run -p innkeep-db --bin seed
//!
//! # More rooms per template
//! cargo run -p innkeep-db --bin seed -- --rooms 10
//!
//! # Specify database path
//! cargo run -p innkeep-db --bin seed -- --db ./data/innkeep.db
//! ```
//!
//! ## Generated Data
//! - One merchant account topped up through the ledger
//! - One property, set as the account's active property
//! - Room types with fee schedules (fixed and percentage)
//! - One template per room type, with a primary discount and occupancy tiers
//! - Physical rooms labelled `{PREFIX}{N}`

use chrono::Utc;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use innkeep_core::pricing::{Discount, OccupancyTier, PriceTrack, PrimaryDiscount, RoomTemplate};
use innkeep_core::{
    BillingUnit, FeeSchedule, LedgerOutcome, LedgerTitle, MerchantAccount, PhysicalRoom, Property, RoomStatus,
    RoomType,
};
use innkeep_db::{Database, DbConfig, LedgerRepository, MerchantRepository, NewLedgerEntry, RoomRepository};

/// (label prefix, room type, max guests, nightly price, fee unit, fee amount)
const ROOM_KINDS: &[(&str, &str, i64, i64, BillingUnit, i64)] = &[
    ("S", "Single", 1, 4_500, BillingUnit::FixedValue, 300),
    ("D", "Double", 2, 8_000, BillingUnit::Percentage, 1_000),
    ("F", "Family Suite", 4, 15_000, BillingUnit::Percentage, 800),
];

/// Opening balance of the demo account.
const OPENING_BALANCE_CENTS: i64 = 50_000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut rooms_per_template: usize = 4;
    let mut db_path = String::from("./innkeep_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rooms" | "-r" => {
                if i + 1 < args.len() {
                    rooms_per_template = args[i + 1].parse().unwrap_or(4);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Innkeep Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -r, --rooms <N>    Physical rooms per template (default: 4)");
                println!("  -d, --db <PATH>    Database file path (default: ./innkeep_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, rooms_per_template, "Seeding demo merchant");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM merchant_accounts")
        .fetch_one(db.pool())
        .await?;
    if existing > 0 {
        warn!(existing, "Database already has merchant accounts, skipping seed");
        return Ok(());
    }

    let now = Utc::now();
    let account_id = Uuid::new_v4().to_string();
    let property_id = Uuid::new_v4().to_string();

    let mut tx = db.begin().await?;

    MerchantRepository::insert_account(
        &mut tx,
        &MerchantAccount {
            id: account_id.clone(),
            title: "Seaside Hotels".to_string(),
            balance_cents: 0,
            active_property_id: None,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;
    MerchantRepository::insert_property(
        &mut tx,
        &Property {
            id: property_id.clone(),
            account_id: account_id.clone(),
            name: "Harbour View".to_string(),
            created_at: now,
        },
    )
    .await?;
    MerchantRepository::set_active_property(&mut tx, &account_id, Some(&property_id), now).await?;

    LedgerRepository::record(
        &mut tx,
        &NewLedgerEntry {
            account_id: account_id.clone(),
            title: LedgerTitle::TopUp,
            outcome: LedgerOutcome::Success,
            amount_cents: OPENING_BALANCE_CENTS,
            booking_id: None,
            property_id: None,
            room_type_id: None,
        },
        now,
    )
    .await?;

    let mut total_rooms = 0;
    for (prefix, type_name, max_guests, price_cents, fee_unit, fee_amount) in ROOM_KINDS {
        let room_type_id = Uuid::new_v4().to_string();
        RoomRepository::insert_room_type(
            &mut tx,
            &RoomType {
                id: room_type_id.clone(),
                name: type_name.to_string(),
                max_guests: *max_guests,
            },
        )
        .await?;
        RoomRepository::upsert_fee_schedule(&mut tx, &FeeSchedule::uniform(&room_type_id, *fee_unit, *fee_amount))
            .await?;

        let template_id = Uuid::new_v4().to_string();
        RoomRepository::insert_template(
            &mut tx,
            &RoomTemplate {
                id: template_id.clone(),
                property_id: property_id.clone(),
                room_type_id,
                name: type_name.to_string(),
                standard: demo_track(*price_cents, *max_guests),
                resident: demo_track(price_cents * 9 / 10, *max_guests),
                max_guests: *max_guests,
                max_children: (max_guests - 1).max(0),
                room_count: 0,
                is_deleted: false,
                created_at: now,
                updated_at: now,
            },
        )
        .await?;

        for n in 1..=rooms_per_template {
            RoomRepository::insert_room(
                &mut tx,
                &PhysicalRoom {
                    id: Uuid::new_v4().to_string(),
                    template_id: template_id.clone(),
                    label: format!("{prefix}{n}"),
                    status: RoomStatus::Empty,
                    created_at: now,
                },
            )
            .await?;
        }
        let count = RoomRepository::refresh_room_count(&mut tx, &template_id).await?;
        total_rooms += count;
        info!(template = %type_name, rooms = count, "Template seeded");
    }

    tx.commit().await?;

    info!(
        account_id = %account_id,
        property_id = %property_id,
        templates = ROOM_KINDS.len(),
        rooms = total_rooms,
        balance_cents = OPENING_BALANCE_CENTS,
        "Seed complete"
    );

    Ok(())
}

/// 10% off at full capacity, plus a tier for every smaller party.
fn demo_track(base_price_cents: i64, max_guests: i64) -> PriceTrack {
    let occupancy_tiers = (1..max_guests)
        .map(|occupants| OccupancyTier {
            occupants,
            discount: Discount::percentage((max_guests - occupants) * 1_500),
            is_active: true,
        })
        .collect();

    PriceTrack {
        base_price_cents,
        discount: Some(PrimaryDiscount {
            discount: Discount::percentage(1_000),
            window: None,
        }),
        occupancy_tiers,
    }
}
