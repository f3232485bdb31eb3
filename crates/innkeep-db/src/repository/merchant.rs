//! # Merchant Repository
//!
//! Merchant accounts and the properties they own.
//!
//! ## Account Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SQLite has no SELECT … FOR UPDATE. A transaction takes the database    │
//! │  write lock on its first write, so every money-moving transition        │
//! │  starts with a no-op write on the account row:                          │
//! │                                                                         │
//! │   BEGIN                                                                 │
//! │   UPDATE merchant_accounts SET updated_at = ? WHERE id = ?  ◄─ lock     │
//! │   SELECT balance_cents …           (now cannot go stale)                │
//! │   … inventory + ledger writes …                                        │
//! │   COMMIT                                                                │
//! │                                                                         │
//! │  A second accept on the same account waits on the lock, then reads     │
//! │  the balance the first one left behind.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use innkeep_core::{MerchantAccount, Property};

/// Repository for merchant accounts and properties.
#[derive(Debug, Clone)]
pub struct MerchantRepository {
    pool: SqlitePool,
}

impl MerchantRepository {
    /// Creates a new MerchantRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MerchantRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Gets an account by its ID.
    pub async fn get_account(&self, id: &str) -> DbResult<Option<MerchantAccount>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_account(&mut conn, id).await
    }

    /// Gets a property by its ID.
    pub async fn get_property(&self, id: &str) -> DbResult<Option<Property>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_property(&mut conn, id).await
    }

    /// Lists the properties owned by an account, oldest first.
    pub async fn list_properties(&self, account_id: &str) -> DbResult<Vec<Property>> {
        let properties = sqlx::query_as::<_, Property>(
            r#"
            SELECT id, account_id, name, created_at
            FROM properties
            WHERE account_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(properties)
    }

    // -------------------------------------------------------------------------
    // Transactional
    // -------------------------------------------------------------------------

    pub async fn fetch_account(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<MerchantAccount>> {
        let account = sqlx::query_as::<_, MerchantAccount>(
            r#"
            SELECT id, title, balance_cents, active_property_id, created_at, updated_at
            FROM merchant_accounts
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(account)
    }

    pub async fn fetch_property(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Property>> {
        let property = sqlx::query_as::<_, Property>(
            "SELECT id, account_id, name, created_at FROM properties WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(property)
    }

    /// Inserts a new account. The balance starts at whatever the struct holds
    /// (normally zero); funds arrive through the ledger.
    pub async fn insert_account(conn: &mut SqliteConnection, account: &MerchantAccount) -> DbResult<()> {
        debug!(id = %account.id, title = %account.title, "Inserting merchant account");

        sqlx::query(
            r#"
            INSERT INTO merchant_accounts (
                id, title, balance_cents, active_property_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&account.id)
        .bind(&account.title)
        .bind(account.balance_cents)
        .bind(&account.active_property_id)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn insert_property(conn: &mut SqliteConnection, property: &Property) -> DbResult<()> {
        debug!(id = %property.id, account_id = %property.account_id, "Inserting property");

        sqlx::query(
            "INSERT INTO properties (id, account_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&property.id)
        .bind(&property.account_id)
        .bind(&property.name)
        .bind(property.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Takes the write lock for the account and returns its current state.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no such account
    pub async fn lock_account(
        conn: &mut SqliteConnection,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<MerchantAccount> {
        let result = sqlx::query("UPDATE merchant_accounts SET updated_at = ?2 WHERE id = ?1")
            .bind(account_id)
            .bind(now)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MerchantAccount", account_id));
        }

        debug!(account_id = %account_id, "Account locked");

        Self::fetch_account(conn, account_id)
            .await?
            .ok_or_else(|| DbError::not_found("MerchantAccount", account_id))
    }

    /// Points the account's staff UI at a property (or at none).
    pub async fn set_active_property(
        conn: &mut SqliteConnection,
        account_id: &str,
        property_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE merchant_accounts SET active_property_id = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(account_id)
        .bind(property_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MerchantAccount", account_id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn account(id: &str) -> MerchantAccount {
        MerchantAccount {
            id: id.to_string(),
            title: "Seaside Hotels".to_string(),
            balance_cents: 0,
            active_property_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_lock_account() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin().await.unwrap();

        MerchantRepository::insert_account(&mut tx, &account("acc-1")).await.unwrap();
        let locked = MerchantRepository::lock_account(&mut tx, "acc-1", Utc::now())
            .await
            .unwrap();
        assert_eq!(locked.balance_cents, 0);

        let missing = MerchantRepository::lock_account(&mut tx, "nope", Utc::now()).await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));

        tx.commit().await.unwrap();
        assert!(db.merchants().get_account("acc-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_active_property() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin().await.unwrap();

        MerchantRepository::insert_account(&mut tx, &account("acc-1")).await.unwrap();
        let property = Property {
            id: "prop-1".to_string(),
            account_id: "acc-1".to_string(),
            name: "Harbour View".to_string(),
            created_at: Utc::now(),
        };
        MerchantRepository::insert_property(&mut tx, &property).await.unwrap();
        MerchantRepository::set_active_property(&mut tx, "acc-1", Some("prop-1"), Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let acc = db.merchants().get_account("acc-1").await.unwrap().unwrap();
        assert_eq!(acc.active_property_id.as_deref(), Some("prop-1"));
        assert_eq!(db.merchants().list_properties("acc-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_property_requires_account() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let property = Property {
            id: "prop-1".to_string(),
            account_id: "ghost".to_string(),
            name: "Nowhere Inn".to_string(),
            created_at: Utc::now(),
        };
        let err = MerchantRepository::insert_property(&mut conn, &property)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
