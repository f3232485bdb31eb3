//! # Schema Migrations
//!
//! The Innkeep schema ships inside the binary via `sqlx::migrate!` and is
//! applied by [`Database::new`](crate::Database::new) when
//! `DbConfig::run_migrations` is set.
//!
//! `001_initial_schema.sql` creates:
//!
//! | Tables | Guards |
//! |--------|--------|
//! | `merchant_accounts`, `properties` | `CHECK (balance_cents >= 0)` |
//! | `room_types`, `fee_schedules` | one schedule per room type |
//! | `room_templates`, `physical_rooms` | unique room label per template |
//! | `bookings`, `booked_rooms` | `booked_until > booked_from` |
//! | `room_status_intervals` | `trg_intervals_no_overlap_*` raise `ROOM_UNAVAILABLE` |
//! | `ledger_entries` | `trg_ledger_no_update` / `_no_delete` keep it append-only |
//!
//! Later schema changes go in a new `NNN_description.sql` file next to it;
//! applied files are checksummed by sqlx and must stay untouched.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from the workspace `migrations/sqlite` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// Idempotent: applied migrations are skipped.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)` for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
