//! # Inventory Repository
//!
//! Occupancy intervals: the source of truth for room availability.
//!
//! ## Availability Query
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  free rooms of template T for [from, until)                             │
//! │                                                                         │
//! │  physical_rooms WHERE template_id = T                                   │
//! │    AND NOT EXISTS busy interval i ON that room WITH                     │
//! │        i.status_from < until AND i.status_until > from                  │
//! │                                                                         │
//! │  room A1:  ████████░░░░░░░░░░  busy 1st-8th                             │
//! │  room A2:  ░░░░░░░░░░░░██████  busy 13th-18th                           │
//! │  request:        [6th ─── 14th)                                         │
//! │                                                                         │
//! │  → both overlap; neither is free                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The query is advisory. The `trg_intervals_no_overlap_insert` trigger is
//! the authoritative guard and surfaces as [`DbError::IntervalOverlap`].

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use innkeep_core::{PhysicalRoom, RoomStatusInterval};

const INTERVAL_COLUMNS: &str =
    "id, physical_room_id, booked_room_id, status, status_from, status_until, disabled, created_at";

/// Repository for occupancy intervals.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Intervals of a room ending after `from_date`, in date order.
    pub async fn schedule(&self, room_id: &str, from_date: NaiveDate) -> DbResult<Vec<RoomStatusInterval>> {
        let sql = format!(
            r#"
            SELECT {INTERVAL_COLUMNS}
            FROM room_status_intervals
            WHERE physical_room_id = ?1 AND status_until > ?2
            ORDER BY status_from, created_at
            "#
        );
        let intervals = sqlx::query_as::<_, RoomStatusInterval>(&sql)
            .bind(room_id)
            .bind(from_date)
            .fetch_all(&self.pool)
            .await?;

        Ok(intervals)
    }

    /// Free physical rooms of a template for `[from, until)`.
    pub async fn free_rooms(
        &self,
        template_id: &str,
        from: NaiveDate,
        until: NaiveDate,
    ) -> DbResult<Vec<PhysicalRoom>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_free_rooms(&mut conn, template_id, from, until).await
    }

    // -------------------------------------------------------------------------
    // Transactional
    // -------------------------------------------------------------------------

    pub async fn fetch_free_rooms(
        conn: &mut SqliteConnection,
        template_id: &str,
        from: NaiveDate,
        until: NaiveDate,
    ) -> DbResult<Vec<PhysicalRoom>> {
        let rooms = sqlx::query_as::<_, PhysicalRoom>(
            r#"
            SELECT r.id, r.template_id, r.label, r.status, r.created_at
            FROM physical_rooms r
            WHERE r.template_id = ?1
              AND NOT EXISTS (
                  SELECT 1 FROM room_status_intervals i
                  WHERE i.physical_room_id = r.id
                    AND i.status = 'busy'
                    AND i.status_from < ?3
                    AND i.status_until > ?2
              )
            ORDER BY r.label
            "#,
        )
        .bind(template_id)
        .bind(from)
        .bind(until)
        .fetch_all(&mut *conn)
        .await?;

        debug!(template_id = %template_id, %from, %until, free = rooms.len(), "Free rooms");
        Ok(rooms)
    }

    /// Whether the room has no BUSY interval overlapping `[from, until)`.
    pub async fn is_room_free(
        conn: &mut SqliteConnection,
        room_id: &str,
        from: NaiveDate,
        until: NaiveDate,
    ) -> DbResult<bool> {
        let busy: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM room_status_intervals
            WHERE physical_room_id = ?1
              AND status = 'busy'
              AND status_from < ?3
              AND status_until > ?2
            "#,
        )
        .bind(room_id)
        .bind(from)
        .bind(until)
        .fetch_one(&mut *conn)
        .await?;

        Ok(busy == 0)
    }

    /// Whether the room holds a BUSY interval ending after `date`.
    pub async fn has_busy_after(conn: &mut SqliteConnection, room_id: &str, date: NaiveDate) -> DbResult<bool> {
        let busy: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM room_status_intervals
            WHERE physical_room_id = ?1 AND status = 'busy' AND status_until > ?2
            "#,
        )
        .bind(room_id)
        .bind(date)
        .fetch_one(&mut *conn)
        .await?;

        Ok(busy > 0)
    }

    /// Inserts an interval.
    ///
    /// ## Errors
    /// * `DbError::IntervalOverlap` - a BUSY interval of the same room overlaps
    pub async fn insert_interval(conn: &mut SqliteConnection, interval: &RoomStatusInterval) -> DbResult<()> {
        debug!(
            id = %interval.id,
            room_id = ?interval.physical_room_id,
            from = %interval.status_from,
            until = %interval.status_until,
            "Inserting status interval"
        );

        let sql = format!(
            "INSERT INTO room_status_intervals ({INTERVAL_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        );
        sqlx::query(&sql)
            .bind(&interval.id)
            .bind(&interval.physical_room_id)
            .bind(&interval.booked_room_id)
            .bind(interval.status)
            .bind(interval.status_from)
            .bind(interval.status_until)
            .bind(interval.disabled)
            .bind(interval.created_at)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    pub async fn fetch_interval(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<RoomStatusInterval>> {
        let sql = format!("SELECT {INTERVAL_COLUMNS} FROM room_status_intervals WHERE id = ?1");
        let interval = sqlx::query_as::<_, RoomStatusInterval>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(interval)
    }

    /// Intervals created for one booking line.
    pub async fn fetch_for_booked_room(
        conn: &mut SqliteConnection,
        booked_room_id: &str,
    ) -> DbResult<Vec<RoomStatusInterval>> {
        let sql = format!("SELECT {INTERVAL_COLUMNS} FROM room_status_intervals WHERE booked_room_id = ?1");
        let intervals = sqlx::query_as::<_, RoomStatusInterval>(&sql)
            .bind(booked_room_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(intervals)
    }

    /// Removes an interval.
    pub async fn delete_interval(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM room_status_intervals WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("RoomStatusInterval", id));
        }

        debug!(id = %id, "Status interval deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::merchant::MerchantRepository;
    use crate::repository::room::RoomRepository;
    use crate::{Database, DbConfig};
    use chrono::Utc;
    use innkeep_core::pricing::PriceTrack;
    use innkeep_core::{MerchantAccount, Property, RoomStatus, RoomTemplate, RoomType};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, day).unwrap()
    }

    fn busy(id: &str, room: &str, from: u32, until: u32) -> RoomStatusInterval {
        RoomStatusInterval {
            id: id.to_string(),
            physical_room_id: Some(room.to_string()),
            booked_room_id: None,
            status: RoomStatus::Busy,
            status_from: d(from),
            status_until: d(until),
            disabled: true,
            created_at: Utc::now(),
        }
    }

    /// One template with rooms A1 and A2.
    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let mut tx = db.begin().await.unwrap();

        MerchantRepository::insert_account(
            &mut tx,
            &MerchantAccount {
                id: "acc".to_string(),
                title: "Acc".to_string(),
                balance_cents: 0,
                active_property_id: None,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
        MerchantRepository::insert_property(
            &mut tx,
            &Property {
                id: "prop".to_string(),
                account_id: "acc".to_string(),
                name: "Prop".to_string(),
                created_at: now,
            },
        )
        .await
        .unwrap();
        RoomRepository::insert_room_type(
            &mut tx,
            &RoomType {
                id: "rt".to_string(),
                name: "Double".to_string(),
                max_guests: 2,
            },
        )
        .await
        .unwrap();
        RoomRepository::insert_template(
            &mut tx,
            &RoomTemplate {
                id: "tpl".to_string(),
                property_id: "prop".to_string(),
                room_type_id: "rt".to_string(),
                name: "Double".to_string(),
                standard: PriceTrack::flat(100),
                resident: PriceTrack::flat(100),
                max_guests: 2,
                max_children: 0,
                room_count: 2,
                is_deleted: false,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
        for (id, label) in [("A1", "A1"), ("A2", "A2")] {
            RoomRepository::insert_room(
                &mut tx,
                &PhysicalRoom {
                    id: id.to_string(),
                    template_id: "tpl".to_string(),
                    label: label.to_string(),
                    status: RoomStatus::Empty,
                    created_at: now,
                },
            )
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_free_rooms_uses_true_overlap() {
        let db = setup().await;
        let mut tx = db.begin().await.unwrap();
        InventoryRepository::insert_interval(&mut tx, &busy("i1", "A1", 1, 8)).await.unwrap();
        InventoryRepository::insert_interval(&mut tx, &busy("i2", "A2", 13, 18)).await.unwrap();
        tx.commit().await.unwrap();

        let inv = db.inventory();
        // Straddles both intervals without containing either.
        assert!(inv.free_rooms("tpl", d(6), d(14)).await.unwrap().is_empty());

        let free = inv.free_rooms("tpl", d(8), d(13)).await.unwrap();
        assert_eq!(free.len(), 2);

        let free = inv.free_rooms("tpl", d(2), d(4)).await.unwrap();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].id, "A2");
    }

    #[tokio::test]
    async fn test_trigger_rejects_overlapping_busy_interval() {
        let db = setup().await;
        let mut tx = db.begin().await.unwrap();
        InventoryRepository::insert_interval(&mut tx, &busy("i1", "A1", 10, 15)).await.unwrap();

        let err = InventoryRepository::insert_interval(&mut tx, &busy("i2", "A1", 14, 16))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::IntervalOverlap { .. }));

        // Back-to-back and other rooms are fine.
        InventoryRepository::insert_interval(&mut tx, &busy("i3", "A1", 15, 16)).await.unwrap();
        InventoryRepository::insert_interval(&mut tx, &busy("i4", "A2", 10, 15)).await.unwrap();

        assert!(!InventoryRepository::is_room_free(&mut tx, "A1", d(12), d(13)).await.unwrap());
        assert!(InventoryRepository::is_room_free(&mut tx, "A1", d(16), d(20)).await.unwrap());
        assert!(InventoryRepository::has_busy_after(&mut tx, "A1", d(15)).await.unwrap());
        assert!(!InventoryRepository::has_busy_after(&mut tx, "A1", d(16)).await.unwrap());
    }

    #[tokio::test]
    async fn test_schedule_and_delete() {
        let db = setup().await;
        let mut tx = db.begin().await.unwrap();
        InventoryRepository::insert_interval(&mut tx, &busy("late", "A1", 20, 22)).await.unwrap();
        InventoryRepository::insert_interval(&mut tx, &busy("early", "A1", 3, 5)).await.unwrap();
        tx.commit().await.unwrap();

        let schedule = db.inventory().schedule("A1", d(1)).await.unwrap();
        let ids: Vec<_> = schedule.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["early", "late"]);

        let mut conn = db.pool().acquire().await.unwrap();
        InventoryRepository::delete_interval(&mut conn, "early").await.unwrap();
        assert!(InventoryRepository::fetch_interval(&mut conn, "early").await.unwrap().is_none());
        assert!(InventoryRepository::delete_interval(&mut conn, "early").await.is_err());
    }
}
