//! # Room Repository
//!
//! Room types, fee schedules, room templates and physical rooms.
//!
//! ## Template Storage
//! ```text
//! RoomTemplate                       room_templates row
//! ├── standard: PriceTrack     ──►   base_price_cents, discount_*, occupancy_tiers (JSON)
//! ├── resident: PriceTrack     ──►   resident_base_price_cents, resident_discount_*, …
//! └── capacity, flags          ──►   max_guests, max_children, room_count, is_deleted
//! ```
//!
//! Occupancy tiers keep their stored order; the pricing engine relies on it
//! for first-match-wins.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use innkeep_core::pricing::{Discount, DiscountWindow, OccupancyTier, PriceTrack, PrimaryDiscount};
use innkeep_core::{BillingUnit, FeeSchedule, PhysicalRoom, RoomStatus, RoomTemplate, RoomType};

// =============================================================================
// Row Mapping
// =============================================================================

/// Flat shape of a `room_templates` row.
#[derive(Debug, sqlx::FromRow)]
struct RoomTemplateRow {
    id: String,
    property_id: String,
    room_type_id: String,
    name: String,
    base_price_cents: i64,
    discount_unit: Option<BillingUnit>,
    discount_amount: Option<i64>,
    discount_from: Option<DateTime<Utc>>,
    discount_until: Option<DateTime<Utc>>,
    occupancy_tiers: String,
    resident_base_price_cents: i64,
    resident_discount_unit: Option<BillingUnit>,
    resident_discount_amount: Option<i64>,
    resident_discount_from: Option<DateTime<Utc>>,
    resident_discount_until: Option<DateTime<Utc>>,
    resident_occupancy_tiers: String,
    max_guests: i64,
    max_children: i64,
    room_count: i64,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const TEMPLATE_COLUMNS: &str = r#"
    id, property_id, room_type_id, name,
    base_price_cents, discount_unit, discount_amount, discount_from, discount_until, occupancy_tiers,
    resident_base_price_cents, resident_discount_unit, resident_discount_amount,
    resident_discount_from, resident_discount_until, resident_occupancy_tiers,
    max_guests, max_children, room_count, is_deleted, created_at, updated_at
"#;

fn primary_discount(
    unit: Option<BillingUnit>,
    amount: Option<i64>,
    from: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> Option<PrimaryDiscount> {
    let (unit, amount) = (unit?, amount?);
    let window = match (from, until) {
        (Some(from), Some(until)) => Some(DiscountWindow { from, until }),
        _ => None,
    };
    Some(PrimaryDiscount {
        discount: Discount { unit, amount },
        window,
    })
}

fn decode_tiers(column: &str, json: &str) -> DbResult<Vec<OccupancyTier>> {
    serde_json::from_str(json).map_err(|e| DbError::Decode {
        column: column.to_string(),
        reason: e.to_string(),
    })
}

fn encode_tiers(tiers: &[OccupancyTier]) -> DbResult<String> {
    serde_json::to_string(tiers).map_err(|e| DbError::Internal(e.to_string()))
}

/// Primary discount split into its nullable columns.
type DiscountColumns = (
    Option<BillingUnit>,
    Option<i64>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
);

fn discount_columns(track: &PriceTrack) -> DiscountColumns {
    match &track.discount {
        Some(primary) => (
            Some(primary.discount.unit),
            Some(primary.discount.amount),
            primary.window.map(|w| w.from),
            primary.window.map(|w| w.until),
        ),
        None => (None, None, None, None),
    }
}

impl RoomTemplateRow {
    fn into_template(self) -> DbResult<RoomTemplate> {
        let standard = PriceTrack {
            base_price_cents: self.base_price_cents,
            discount: primary_discount(
                self.discount_unit,
                self.discount_amount,
                self.discount_from,
                self.discount_until,
            ),
            occupancy_tiers: decode_tiers("occupancy_tiers", &self.occupancy_tiers)?,
        };
        let resident = PriceTrack {
            base_price_cents: self.resident_base_price_cents,
            discount: primary_discount(
                self.resident_discount_unit,
                self.resident_discount_amount,
                self.resident_discount_from,
                self.resident_discount_until,
            ),
            occupancy_tiers: decode_tiers("resident_occupancy_tiers", &self.resident_occupancy_tiers)?,
        };

        Ok(RoomTemplate {
            id: self.id,
            property_id: self.property_id,
            room_type_id: self.room_type_id,
            name: self.name,
            standard,
            resident,
            max_guests: self.max_guests,
            max_children: self.max_children,
            room_count: self.room_count,
            is_deleted: self.is_deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the room catalogue.
#[derive(Debug, Clone)]
pub struct RoomRepository {
    pool: SqlitePool,
}

impl RoomRepository {
    /// Creates a new RoomRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RoomRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Gets a template by ID, including retired ones.
    pub async fn get_template(&self, id: &str) -> DbResult<Option<RoomTemplate>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_template(&mut conn, id).await
    }

    /// Lists a property's bookable (not retired) templates.
    pub async fn list_templates(&self, property_id: &str) -> DbResult<Vec<RoomTemplate>> {
        let sql = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM room_templates WHERE property_id = ?1 AND is_deleted = 0 ORDER BY name"
        );
        let rows = sqlx::query_as::<_, RoomTemplateRow>(&sql)
            .bind(property_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(RoomTemplateRow::into_template).collect()
    }

    /// Gets a physical room by ID.
    pub async fn get_room(&self, id: &str) -> DbResult<Option<PhysicalRoom>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_room(&mut conn, id).await
    }

    /// Lists the physical rooms of a template ordered by label.
    pub async fn list_rooms(&self, template_id: &str) -> DbResult<Vec<PhysicalRoom>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_rooms(&mut conn, template_id).await
    }

    pub async fn get_room_type(&self, id: &str) -> DbResult<Option<RoomType>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_room_type(&mut conn, id).await
    }

    pub async fn get_fee_schedule(&self, room_type_id: &str) -> DbResult<Option<FeeSchedule>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_fee_schedule(&mut conn, room_type_id).await
    }

    // -------------------------------------------------------------------------
    // Transactional: room types and fees
    // -------------------------------------------------------------------------

    pub async fn fetch_room_type(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<RoomType>> {
        let room_type = sqlx::query_as::<_, RoomType>(
            "SELECT id, name, max_guests FROM room_types WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(room_type)
    }

    /// Inserts a room type.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - name already taken
    pub async fn insert_room_type(conn: &mut SqliteConnection, room_type: &RoomType) -> DbResult<()> {
        debug!(id = %room_type.id, name = %room_type.name, "Inserting room type");

        sqlx::query("INSERT INTO room_types (id, name, max_guests) VALUES (?1, ?2, ?3)")
            .bind(&room_type.id)
            .bind(&room_type.name)
            .bind(room_type.max_guests)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Inserts or replaces the fee schedule of a room type.
    pub async fn upsert_fee_schedule(conn: &mut SqliteConnection, schedule: &FeeSchedule) -> DbResult<()> {
        debug!(room_type_id = %schedule.room_type_id, "Upserting fee schedule");

        sqlx::query(
            r#"
            INSERT INTO fee_schedules (room_type_id, unit, amount, resident_unit, resident_amount)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(room_type_id) DO UPDATE SET
                unit = excluded.unit,
                amount = excluded.amount,
                resident_unit = excluded.resident_unit,
                resident_amount = excluded.resident_amount
            "#,
        )
        .bind(&schedule.room_type_id)
        .bind(schedule.unit)
        .bind(schedule.amount)
        .bind(schedule.resident_unit)
        .bind(schedule.resident_amount)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn fetch_fee_schedule(
        conn: &mut SqliteConnection,
        room_type_id: &str,
    ) -> DbResult<Option<FeeSchedule>> {
        let schedule = sqlx::query_as::<_, FeeSchedule>(
            r#"
            SELECT room_type_id, unit, amount, resident_unit, resident_amount
            FROM fee_schedules
            WHERE room_type_id = ?1
            "#,
        )
        .bind(room_type_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(schedule)
    }

    // -------------------------------------------------------------------------
    // Transactional: templates
    // -------------------------------------------------------------------------

    pub async fn fetch_template(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<RoomTemplate>> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM room_templates WHERE id = ?1");
        let row = sqlx::query_as::<_, RoomTemplateRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(RoomTemplateRow::into_template).transpose()
    }

    pub async fn insert_template(conn: &mut SqliteConnection, template: &RoomTemplate) -> DbResult<()> {
        debug!(id = %template.id, property_id = %template.property_id, "Inserting room template");

        let (d_unit, d_amount, d_from, d_until) = discount_columns(&template.standard);
        let (r_unit, r_amount, r_from, r_until) = discount_columns(&template.resident);

        sqlx::query(
            r#"
            INSERT INTO room_templates (
                id, property_id, room_type_id, name,
                base_price_cents, discount_unit, discount_amount, discount_from, discount_until,
                occupancy_tiers,
                resident_base_price_cents, resident_discount_unit, resident_discount_amount,
                resident_discount_from, resident_discount_until, resident_occupancy_tiers,
                max_guests, max_children, room_count, is_deleted, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8, ?9,
                ?10,
                ?11, ?12, ?13,
                ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21, ?22
            )
            "#,
        )
        .bind(&template.id)
        .bind(&template.property_id)
        .bind(&template.room_type_id)
        .bind(&template.name)
        .bind(template.standard.base_price_cents)
        .bind(d_unit)
        .bind(d_amount)
        .bind(d_from)
        .bind(d_until)
        .bind(encode_tiers(&template.standard.occupancy_tiers)?)
        .bind(template.resident.base_price_cents)
        .bind(r_unit)
        .bind(r_amount)
        .bind(r_from)
        .bind(r_until)
        .bind(encode_tiers(&template.resident.occupancy_tiers)?)
        .bind(template.max_guests)
        .bind(template.max_children)
        .bind(template.room_count)
        .bind(template.is_deleted)
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Rewrites pricing, capacity and name of an existing template.
    pub async fn update_template(conn: &mut SqliteConnection, template: &RoomTemplate) -> DbResult<()> {
        debug!(id = %template.id, "Updating room template");

        let (d_unit, d_amount, d_from, d_until) = discount_columns(&template.standard);
        let (r_unit, r_amount, r_from, r_until) = discount_columns(&template.resident);

        let result = sqlx::query(
            r#"
            UPDATE room_templates SET
                room_type_id = ?2,
                name = ?3,
                base_price_cents = ?4,
                discount_unit = ?5,
                discount_amount = ?6,
                discount_from = ?7,
                discount_until = ?8,
                occupancy_tiers = ?9,
                resident_base_price_cents = ?10,
                resident_discount_unit = ?11,
                resident_discount_amount = ?12,
                resident_discount_from = ?13,
                resident_discount_until = ?14,
                resident_occupancy_tiers = ?15,
                max_guests = ?16,
                max_children = ?17,
                updated_at = ?18
            WHERE id = ?1 AND is_deleted = 0
            "#,
        )
        .bind(&template.id)
        .bind(&template.room_type_id)
        .bind(&template.name)
        .bind(template.standard.base_price_cents)
        .bind(d_unit)
        .bind(d_amount)
        .bind(d_from)
        .bind(d_until)
        .bind(encode_tiers(&template.standard.occupancy_tiers)?)
        .bind(template.resident.base_price_cents)
        .bind(r_unit)
        .bind(r_amount)
        .bind(r_from)
        .bind(r_until)
        .bind(encode_tiers(&template.resident.occupancy_tiers)?)
        .bind(template.max_guests)
        .bind(template.max_children)
        .bind(template.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("RoomTemplate", &template.id));
        }

        Ok(())
    }

    /// Soft-deletes a template.
    pub async fn retire_template(conn: &mut SqliteConnection, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE room_templates SET is_deleted = 1, updated_at = ?2 WHERE id = ?1 AND is_deleted = 0",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("RoomTemplate", id));
        }

        debug!(id = %id, "Room template retired");
        Ok(())
    }

    /// Recounts the physical rooms under a template into `room_count`.
    pub async fn refresh_room_count(conn: &mut SqliteConnection, template_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            UPDATE room_templates
            SET room_count = (SELECT COUNT(*) FROM physical_rooms WHERE template_id = ?1)
            WHERE id = ?1
            RETURNING room_count
            "#,
        )
        .bind(template_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Transactional: physical rooms
    // -------------------------------------------------------------------------

    pub async fn fetch_room(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<PhysicalRoom>> {
        let room = sqlx::query_as::<_, PhysicalRoom>(
            "SELECT id, template_id, label, status, created_at FROM physical_rooms WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(room)
    }

    pub async fn fetch_rooms(conn: &mut SqliteConnection, template_id: &str) -> DbResult<Vec<PhysicalRoom>> {
        let rooms = sqlx::query_as::<_, PhysicalRoom>(
            r#"
            SELECT id, template_id, label, status, created_at
            FROM physical_rooms
            WHERE template_id = ?1
            ORDER BY label
            "#,
        )
        .bind(template_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rooms)
    }

    /// Inserts a physical room.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - label already used in this template
    pub async fn insert_room(conn: &mut SqliteConnection, room: &PhysicalRoom) -> DbResult<()> {
        debug!(id = %room.id, template_id = %room.template_id, label = %room.label, "Inserting physical room");

        sqlx::query(
            r#"
            INSERT INTO physical_rooms (id, template_id, label, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&room.id)
        .bind(&room.template_id)
        .bind(&room.label)
        .bind(room.status)
        .bind(room.created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("room_label", &room.label),
            other => other,
        })?;

        Ok(())
    }

    /// Deletes a physical room. Its intervals and booking lines keep their
    /// history with a NULL room reference.
    pub async fn delete_room(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM physical_rooms WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PhysicalRoom", id));
        }

        debug!(id = %id, "Physical room deleted");
        Ok(())
    }

    /// Updates the cached coarse status of a room.
    pub async fn set_room_status(conn: &mut SqliteConnection, id: &str, status: RoomStatus) -> DbResult<()> {
        let result = sqlx::query("UPDATE physical_rooms SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PhysicalRoom", id));
        }

        Ok(())
    }
}
