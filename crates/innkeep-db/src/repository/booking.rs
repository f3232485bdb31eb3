//! # Booking Repository
//!
//! Bookings, their lines, and the listing/statistics queries behind the
//! guest and merchant views.
//!
//! ## Row Ownership
//! ```text
//! bookings 1 ──── n booked_rooms 1 ──── 0..1 room_status_intervals
//!    │                  │
//!    │                  └── physical_room_id set at acceptance
//!    └── status mirrored onto every line
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use innkeep_core::reporting::OrderSort;
use innkeep_core::{BookedRoom, Booking, BookingStatus, CanceledBy};

const BOOKING_COLUMNS: &str = r#"
    id, requester_id, property_id, booked_from, booked_until, total_price_cents,
    occupant_count, status, canceled_by, cancellation_reason, created_at, updated_at
"#;

const LINE_COLUMNS: &str = r#"
    id, booking_id, template_id, physical_room_id, booked_from, booked_until, status,
    price_cents, occupant_count, resident, bed_type_id, bed_for_children, fee_cents, created_at
"#;

/// Repository for bookings and booking lines.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: SqlitePool,
}

impl BookingRepository {
    /// Creates a new BookingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BookingRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Gets a booking by its ID.
    pub async fn get_booking(&self, id: &str) -> DbResult<Option<Booking>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_booking(&mut conn, id).await
    }

    /// Gets the lines of a booking in insertion order.
    pub async fn get_lines(&self, booking_id: &str) -> DbResult<Vec<BookedRoom>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_lines(&mut conn, booking_id).await
    }

    /// A guest's bookings with one of `statuses`, newest first.
    pub async fn list_for_requester(
        &self,
        requester_id: &str,
        statuses: &[BookingStatus],
    ) -> DbResult<Vec<Booking>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE requester_id = "
        ));
        qb.push_bind(requester_id);
        push_status_filter(&mut qb, statuses);
        qb.push(" ORDER BY created_at DESC");

        let bookings = qb.build_query_as::<Booking>().fetch_all(&self.pool).await?;
        Ok(bookings)
    }

    /// A property's bookings with one of `statuses`, in `sort` order.
    pub async fn list_for_property(
        &self,
        property_id: &str,
        statuses: &[BookingStatus],
        sort: OrderSort,
    ) -> DbResult<Vec<Booking>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE property_id = "
        ));
        qb.push_bind(property_id);
        push_status_filter(&mut qb, statuses);
        qb.push(match sort {
            OrderSort::ByDate => " ORDER BY created_at DESC",
            OrderSort::ByPrice => " ORDER BY total_price_cents DESC, created_at DESC",
            OrderSort::ByOccupants => " ORDER BY occupant_count DESC, created_at DESC",
        });

        let bookings = qb.build_query_as::<Booking>().fetch_all(&self.pool).await?;
        Ok(bookings)
    }

    /// Counts a property's bookings, optionally by status and creation window.
    pub async fn count_for_property(
        &self,
        property_id: &str,
        status: Option<BookingStatus>,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> DbResult<i64> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM bookings WHERE property_id = ");
        qb.push_bind(property_id);
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some((start, end)) = window {
            qb.push(" AND created_at >= ").push_bind(start);
            qb.push(" AND created_at < ").push_bind(end);
        }

        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Σ total price of bookings closed within `[start, end)`.
    ///
    /// A closed booking is never touched again, so `updated_at` is its
    /// closing time.
    pub async fn closed_revenue(
        &self,
        property_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<i64> {
        let revenue: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_price_cents), 0)
            FROM bookings
            WHERE property_id = ?1 AND status = 'closed'
              AND updated_at >= ?2 AND updated_at < ?3
            "#,
        )
        .bind(property_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(revenue)
    }

    // -------------------------------------------------------------------------
    // Transactional
    // -------------------------------------------------------------------------

    pub async fn fetch_booking(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(booking)
    }

    pub async fn fetch_lines(conn: &mut SqliteConnection, booking_id: &str) -> DbResult<Vec<BookedRoom>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM booked_rooms WHERE booking_id = ?1 ORDER BY created_at, rowid"
        );
        let lines = sqlx::query_as::<_, BookedRoom>(&sql)
            .bind(booking_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(lines)
    }

    pub async fn insert_booking(conn: &mut SqliteConnection, booking: &Booking) -> DbResult<()> {
        debug!(id = %booking.id, requester_id = %booking.requester_id, "Inserting booking");

        let sql = format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        );
        sqlx::query(&sql)
            .bind(&booking.id)
            .bind(&booking.requester_id)
            .bind(&booking.property_id)
            .bind(booking.booked_from)
            .bind(booking.booked_until)
            .bind(booking.total_price_cents)
            .bind(booking.occupant_count)
            .bind(booking.status)
            .bind(booking.canceled_by)
            .bind(&booking.cancellation_reason)
            .bind(booking.created_at)
            .bind(booking.updated_at)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    pub async fn insert_line(conn: &mut SqliteConnection, line: &BookedRoom) -> DbResult<()> {
        debug!(id = %line.id, booking_id = %line.booking_id, template_id = %line.template_id, "Inserting booked room");

        let sql = format!(
            "INSERT INTO booked_rooms ({LINE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
        );
        sqlx::query(&sql)
            .bind(&line.id)
            .bind(&line.booking_id)
            .bind(&line.template_id)
            .bind(&line.physical_room_id)
            .bind(line.booked_from)
            .bind(line.booked_until)
            .bind(line.status)
            .bind(line.price_cents)
            .bind(line.occupant_count)
            .bind(line.resident)
            .bind(&line.bed_type_id)
            .bind(line.bed_for_children)
            .bind(line.fee_cents)
            .bind(line.created_at)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Removes every line of a booking (used when the guest edits it).
    pub async fn delete_lines(conn: &mut SqliteConnection, booking_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM booked_rooms WHERE booking_id = ?1")
            .bind(booking_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Rewrites the stay, totals and status of a booking.
    pub async fn update_stay(
        conn: &mut SqliteConnection,
        booking_id: &str,
        stay: (NaiveDate, NaiveDate),
        total_price_cents: i64,
        occupant_count: i64,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE bookings SET
                booked_from = ?2,
                booked_until = ?3,
                total_price_cents = ?4,
                occupant_count = ?5,
                status = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(booking_id)
        .bind(stay.0)
        .bind(stay.1)
        .bind(total_price_cents)
        .bind(occupant_count)
        .bind(status)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Booking", booking_id));
        }

        Ok(())
    }

    /// Moves a booking and all of its lines to `status`.
    pub async fn set_status(
        conn: &mut SqliteConnection,
        booking_id: &str,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query("UPDATE bookings SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(booking_id)
            .bind(status)
            .bind(now)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Booking", booking_id));
        }

        sqlx::query("UPDATE booked_rooms SET status = ?2 WHERE booking_id = ?1")
            .bind(booking_id)
            .bind(status)
            .execute(&mut *conn)
            .await?;

        debug!(booking_id = %booking_id, %status, "Booking status set");
        Ok(())
    }

    /// Marks a booking and its lines canceled, recording who and why.
    pub async fn cancel(
        conn: &mut SqliteConnection,
        booking_id: &str,
        canceled_by: CanceledBy,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        Self::set_status(conn, booking_id, BookingStatus::Canceled, now).await?;

        sqlx::query("UPDATE bookings SET canceled_by = ?2, cancellation_reason = ?3 WHERE id = ?1")
            .bind(booking_id)
            .bind(canceled_by)
            .bind(reason)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Records the room assigned to a line and the fee debited for it.
    pub async fn assign_line(
        conn: &mut SqliteConnection,
        line_id: &str,
        physical_room_id: &str,
        fee_cents: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE booked_rooms SET physical_room_id = ?2, fee_cents = ?3 WHERE id = ?1",
        )
        .bind(line_id)
        .bind(physical_room_id)
        .bind(fee_cents)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("BookedRoom", line_id));
        }

        Ok(())
    }
}

/// Appends ` AND status IN (?, ?, …)`; no filter when `statuses` is empty.
fn push_status_filter(qb: &mut QueryBuilder<'_, Sqlite>, statuses: &[BookingStatus]) {
    if statuses.is_empty() {
        return;
    }
    qb.push(" AND status IN (");
    let mut separated = qb.separated(", ");
    for status in statuses {
        separated.push_bind(*status);
    }
    separated.push_unseparated(")");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::merchant::MerchantRepository;
    use crate::repository::room::RoomRepository;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use innkeep_core::pricing::PriceTrack;
    use innkeep_core::{MerchantAccount, Property, RoomTemplate, RoomType};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
    }

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
                room_count: 0,
                is_deleted: false,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        db
    }

    fn booking(id: &str, total: i64, occupants: i64, created_at: DateTime<Utc>) -> Booking {
        Booking {
            id: id.to_string(),
            requester_id: "guest".to_string(),
            property_id: "prop".to_string(),
            booked_from: d(1),
            booked_until: d(3),
            total_price_cents: total,
            occupant_count: occupants,
            status: BookingStatus::Pending,
            canceled_by: None,
            cancellation_reason: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn line(id: &str, booking_id: &str) -> BookedRoom {
        BookedRoom {
            id: id.to_string(),
            booking_id: booking_id.to_string(),
            template_id: "tpl".to_string(),
            physical_room_id: None,
            booked_from: d(1),
            booked_until: d(3),
            status: BookingStatus::Pending,
            price_cents: 100,
            occupant_count: 2,
            resident: false,
            bed_type_id: Some("king".to_string()),
            bed_for_children: false,
            fee_cents: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_with_lines() {
        let db = setup().await;
        let mut tx = db.begin().await.unwrap();
        BookingRepository::insert_booking(&mut tx, &booking("b1", 200, 2, Utc::now())).await.unwrap();
        BookingRepository::insert_line(&mut tx, &line("l1", "b1")).await.unwrap();
        BookingRepository::insert_line(&mut tx, &line("l2", "b1")).await.unwrap();
        tx.commit().await.unwrap();

        let repo = db.bookings();
        let b = repo.get_booking("b1").await.unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Pending);
        let lines = repo.get_lines("b1").await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].bed_type_id.as_deref(), Some("king"));
    }

    #[tokio::test]
    async fn test_cancel_marks_lines_and_metadata() {
        let db = setup().await;
        let mut tx = db.begin().await.unwrap();
        BookingRepository::insert_booking(&mut tx, &booking("b1", 200, 2, Utc::now())).await.unwrap();
        BookingRepository::insert_line(&mut tx, &line("l1", "b1")).await.unwrap();
        BookingRepository::cancel(&mut tx, "b1", CanceledBy::Merchant, Some("overbooked"), Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let b = db.bookings().get_booking("b1").await.unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Canceled);
        assert_eq!(b.canceled_by, Some(CanceledBy::Merchant));
        assert_eq!(b.cancellation_reason.as_deref(), Some("overbooked"));
        let lines = db.bookings().get_lines("b1").await.unwrap();
        assert!(lines.iter().all(|l| l.status == BookingStatus::Canceled));
    }

    #[tokio::test]
    async fn test_listing_sort_and_filter() {
        let db = setup().await;
        let now = Utc::now();
        let mut tx = db.begin().await.unwrap();
        BookingRepository::insert_booking(&mut tx, &booking("old", 500, 1, now - Duration::days(3))).await.unwrap();
        BookingRepository::insert_booking(&mut tx, &booking("new", 100, 4, now)).await.unwrap();
        BookingRepository::insert_booking(&mut tx, &booking("mid", 300, 2, now - Duration::days(1))).await.unwrap();
        BookingRepository::set_status(&mut tx, "mid", BookingStatus::Confirmed, now).await.unwrap();
        tx.commit().await.unwrap();

        let repo = db.bookings();
        let ids = |v: Vec<Booking>| v.into_iter().map(|b| b.id).collect::<Vec<_>>();

        let pending = repo
            .list_for_property("prop", &[BookingStatus::Pending], OrderSort::ByDate)
            .await
            .unwrap();
        assert_eq!(ids(pending), ["new", "old"]);

        let by_price = repo.list_for_property("prop", &[], OrderSort::ByPrice).await.unwrap();
        assert_eq!(ids(by_price), ["old", "mid", "new"]);

        let by_people = repo.list_for_property("prop", &[], OrderSort::ByOccupants).await.unwrap();
        assert_eq!(ids(by_people), ["new", "mid", "old"]);

        let guest = repo
            .list_for_requester("guest", &[BookingStatus::Pending, BookingStatus::Confirmed])
            .await
            .unwrap();
        assert_eq!(ids(guest), ["new", "mid", "old"]);

        let recent = repo
            .count_for_property("prop", None, Some((now - Duration::days(2), now + Duration::days(1))))
            .await
            .unwrap();
        assert_eq!(recent, 2);
        assert_eq!(
            repo.count_for_property("prop", Some(BookingStatus::Confirmed), None).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_assign_line() {
        let db = setup().await;
        let mut tx = db.begin().await.unwrap();
        BookingRepository::insert_booking(&mut tx, &booking("b1", 200, 2, Utc::now())).await.unwrap();
        BookingRepository::insert_line(&mut tx, &line("l1", "b1")).await.unwrap();
        let room = innkeep_core::PhysicalRoom {
            id: "A1".to_string(),
            template_id: "tpl".to_string(),
            label: "A1".to_string(),
            status: innkeep_core::RoomStatus::Empty,
            created_at: Utc::now(),
        };
        RoomRepository::insert_room(&mut tx, &room).await.unwrap();
        BookingRepository::assign_line(&mut tx, "l1", "A1", 5).await.unwrap();
        assert!(BookingRepository::assign_line(&mut tx, "missing", "A1", 5).await.is_err());
        tx.commit().await.unwrap();

        let lines = db.bookings().get_lines("b1").await.unwrap();
        assert_eq!(lines[0].physical_room_id.as_deref(), Some("A1"));
        assert_eq!(lines[0].fee_cents, Some(5));
    }
}
