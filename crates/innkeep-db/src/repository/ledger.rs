//! # Ledger Repository
//!
//! Every balance mutation lands here as one immutable entry.
//!
//! ## Recording
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record(conn, entry)                                                    │
//! │                                                                         │
//! │   1. UPDATE merchant_accounts                                           │
//! │        SET balance_cents = balance_cents + Δ  RETURNING balance_cents   │
//! │          │                                                              │
//! │          └── CHECK (balance_cents >= 0) fails ─► CheckViolation         │
//! │                                                                         │
//! │   2. INSERT ledger_entries (…, amount = Δ, balance_after)               │
//! │                                                                         │
//! │  Both statements run on the caller's transaction: an entry never       │
//! │  exists without its balance change, and vice versa.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries are never updated or deleted (`trg_ledger_no_update`,
//! `trg_ledger_no_delete`).

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use innkeep_core::{LedgerEntry, LedgerOutcome, LedgerTitle};

const ENTRY_COLUMNS: &str = r#"
    id, account_id, title, outcome, amount_cents, balance_after_cents,
    booking_id, property_id, room_type_id, created_at
"#;

/// A balance mutation about to be recorded.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub account_id: String,
    pub title: LedgerTitle,
    pub outcome: LedgerOutcome,
    /// Signed delta applied to the balance.
    pub amount_cents: i64,
    pub booking_id: Option<String>,
    pub property_id: Option<String>,
    pub room_type_id: Option<String>,
}

/// Repository for ledger entries.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Entries of an account, newest first.
    ///
    /// With a property, only that property's entries plus the ones tied to
    /// no property (top-ups) are returned.
    pub async fn statement(&self, account_id: &str, property_id: Option<&str>) -> DbResult<Vec<LedgerEntry>> {
        let sql = format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM ledger_entries
            WHERE account_id = ?1
              AND (?2 IS NULL OR property_id IS NULL OR property_id = ?2)
            ORDER BY created_at DESC, rowid DESC
            "#
        );
        let entries = sqlx::query_as::<_, LedgerEntry>(&sql)
            .bind(account_id)
            .bind(property_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Entries recorded against one booking, oldest first.
    pub async fn entries_for_booking(&self, booking_id: &str) -> DbResult<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE booking_id = ?1 ORDER BY created_at, rowid"
        );
        let entries = sqlx::query_as::<_, LedgerEntry>(&sql)
            .bind(booking_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Net service fees paid by a property within `[start, end)`.
    ///
    /// Debits are negative and refunds positive, so the result is the
    /// negated sum: fees charged minus fees credited back.
    pub async fn net_fees(&self, property_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> DbResult<i64> {
        let net: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(-SUM(amount_cents), 0)
            FROM ledger_entries
            WHERE property_id = ?1 AND title = 'service_fee'
              AND created_at >= ?2 AND created_at < ?3
            "#,
        )
        .bind(property_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(net)
    }

    // -------------------------------------------------------------------------
    // Transactional
    // -------------------------------------------------------------------------

    /// Applies the delta to the account balance and appends the entry.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no such account
    /// * `DbError::CheckViolation` - the balance would go negative
    pub async fn record(
        conn: &mut SqliteConnection,
        entry: &NewLedgerEntry,
        now: DateTime<Utc>,
    ) -> DbResult<LedgerEntry> {
        let balance_after: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE merchant_accounts
            SET balance_cents = balance_cents + ?2, updated_at = ?3
            WHERE id = ?1
            RETURNING balance_cents
            "#,
        )
        .bind(&entry.account_id)
        .bind(entry.amount_cents)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        let balance_after = balance_after.ok_or_else(|| DbError::not_found("MerchantAccount", &entry.account_id))?;

        let recorded = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            account_id: entry.account_id.clone(),
            title: entry.title,
            outcome: entry.outcome,
            amount_cents: entry.amount_cents,
            balance_after_cents: balance_after,
            booking_id: entry.booking_id.clone(),
            property_id: entry.property_id.clone(),
            room_type_id: entry.room_type_id.clone(),
            created_at: now,
        };

        let sql = format!(
            "INSERT INTO ledger_entries ({ENTRY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        );
        sqlx::query(&sql)
            .bind(&recorded.id)
            .bind(&recorded.account_id)
            .bind(recorded.title)
            .bind(recorded.outcome)
            .bind(recorded.amount_cents)
            .bind(recorded.balance_after_cents)
            .bind(&recorded.booking_id)
            .bind(&recorded.property_id)
            .bind(&recorded.room_type_id)
            .bind(recorded.created_at)
            .execute(&mut *conn)
            .await?;

        if entry.title == LedgerTitle::TopUp {
            info!(account_id = %entry.account_id, amount = entry.amount_cents, balance = balance_after, "Balance topped up");
        } else {
            debug!(
                account_id = %entry.account_id,
                booking_id = ?entry.booking_id,
                amount = entry.amount_cents,
                balance = balance_after,
                "Ledger entry recorded"
            );
        }

        Ok(recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::booking::BookingRepository;
    use crate::repository::merchant::MerchantRepository;
    use crate::{Database, DbConfig};
    use chrono::{Duration, NaiveDate};
    use innkeep_core::{Booking, BookingStatus, MerchantAccount, Property};

    async fn setup(balance: i64) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let mut conn = db.pool().acquire().await.unwrap();
        MerchantRepository::insert_account(
            &mut conn,
            &MerchantAccount {
                id: "acc".to_string(),
                title: "Acc".to_string(),
                balance_cents: balance,
                active_property_id: None,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
        MerchantRepository::insert_property(
            &mut conn,
            &Property {
                id: "prop".to_string(),
                account_id: "acc".to_string(),
                name: "Prop".to_string(),
                created_at: now,
            },
        )
        .await
        .unwrap();
        BookingRepository::insert_booking(
            &mut conn,
            &Booking {
                id: "b1".to_string(),
                requester_id: "guest".to_string(),
                property_id: "prop".to_string(),
                booked_from: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
                booked_until: NaiveDate::from_ymd_opt(2026, 10, 3).unwrap(),
                total_price_cents: 200,
                occupant_count: 2,
                status: BookingStatus::Pending,
                canceled_by: None,
                cancellation_reason: None,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
        drop(conn);
        db
    }

    fn fee(amount: i64, outcome: LedgerOutcome) -> NewLedgerEntry {
        NewLedgerEntry {
            account_id: "acc".to_string(),
            title: LedgerTitle::ServiceFee,
            outcome,
            amount_cents: amount,
            booking_id: Some("b1".to_string()),
            property_id: None,
            room_type_id: None,
        }
    }

    #[tokio::test]
    async fn test_record_updates_balance() {
        let db = setup(10).await;
        let mut tx = db.begin().await.unwrap();
        let first = LedgerRepository::record(&mut tx, &fee(-5, LedgerOutcome::Success), Utc::now())
            .await
            .unwrap();
        let second = LedgerRepository::record(&mut tx, &fee(-5, LedgerOutcome::Success), Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first.balance_after_cents, 5);
        assert_eq!(second.balance_after_cents, 0);
        let acc = db.merchants().get_account("acc").await.unwrap().unwrap();
        assert_eq!(acc.balance_cents, 0);
        assert_eq!(db.ledger().entries_for_booking("b1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_negative_balance_rejected() {
        let db = setup(4).await;
        let mut tx = db.begin().await.unwrap();
        let err = LedgerRepository::record(&mut tx, &fee(-5, LedgerOutcome::Success), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
        drop(tx);

        let acc = db.merchants().get_account("acc").await.unwrap().unwrap();
        assert_eq!(acc.balance_cents, 4);
        assert!(db.ledger().statement("acc", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_account() {
        let db = setup(0).await;
        let mut conn = db.pool().acquire().await.unwrap();
        let mut entry = fee(5, LedgerOutcome::Error);
        entry.account_id = "ghost".to_string();
        let err = LedgerRepository::record(&mut conn, &entry, Utc::now()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_entries_are_immutable() {
        let db = setup(10).await;
        let mut conn = db.pool().acquire().await.unwrap();
        let entry = LedgerRepository::record(&mut conn, &fee(-5, LedgerOutcome::Success), Utc::now())
            .await
            .unwrap();

        let update = sqlx::query("UPDATE ledger_entries SET amount_cents = 0 WHERE id = ?1")
            .bind(&entry.id)
            .execute(&mut *conn)
            .await;
        assert!(update.is_err());
        let delete = sqlx::query("DELETE FROM ledger_entries WHERE id = ?1")
            .bind(&entry.id)
            .execute(&mut *conn)
            .await;
        assert!(delete.is_err());
    }

    #[tokio::test]
    async fn test_net_fees_within_window() {
        let db = setup(100).await;
        let now = Utc::now();
        let mut conn = db.pool().acquire().await.unwrap();
        for (amount, outcome) in [(-10, LedgerOutcome::Success), (-5, LedgerOutcome::Success), (5, LedgerOutcome::Error)] {
            let mut entry = fee(amount, outcome);
            entry.property_id = Some("prop".to_string());
            LedgerRepository::record(&mut conn, &entry, now).await.unwrap();
        }
        drop(conn);

        let net = db
            .ledger()
            .net_fees("prop", now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(net, 10);

        let outside = db
            .ledger()
            .net_fees("prop", now + Duration::hours(1), now + Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(outside, 0);
    }
}
