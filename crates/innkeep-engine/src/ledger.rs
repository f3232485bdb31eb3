//! # Ledger
//!
//! The only path to a merchant balance. Each function here changes the
//! balance and appends exactly one [`LedgerEntry`] on the caller's
//! transaction.
//!
//! ```text
//! ┌──────────────────────┬──────────────┬───────────┬──────────────────────┐
//! │ operation            │ title        │ outcome   │ amount               │
//! ├──────────────────────┼──────────────┼───────────┼──────────────────────┤
//! │ debit (accept)       │ service_fee  │ success   │ -fee                 │
//! │ credit (reversal)    │ service_fee  │ error     │ +fee                 │
//! │ external top-up      │ top_up       │ success   │ new - old balance    │
//! └──────────────────────┴──────────────┴───────────┴──────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::EngineResult;
use innkeep_core::{CoreError, LedgerEntry, LedgerOutcome, LedgerTitle, MerchantAccount, Money, ValidationError};
use innkeep_db::{LedgerRepository, MerchantRepository, NewLedgerEntry};

/// What a ledger entry links back to.
#[derive(Debug, Clone, Default)]
pub struct LedgerContext {
    pub booking_id: Option<String>,
    pub property_id: Option<String>,
    pub room_type_id: Option<String>,
}

async fn fetch_account(conn: &mut SqliteConnection, account_id: &str) -> EngineResult<MerchantAccount> {
    MerchantRepository::fetch_account(conn, account_id)
        .await?
        .ok_or_else(|| CoreError::not_found("MerchantAccount", account_id).into())
}

fn require_non_negative(amount: Money) -> EngineResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }
    Ok(())
}

/// Takes `amount` from the account.
///
/// ## Errors
/// * `InsufficientBalance` - `amount` exceeds the current balance
pub async fn debit(
    conn: &mut SqliteConnection,
    account_id: &str,
    amount: Money,
    context: &LedgerContext,
    now: DateTime<Utc>,
) -> EngineResult<LedgerEntry> {
    require_non_negative(amount)?;

    let account = fetch_account(conn, account_id).await?;
    if amount > account.balance() {
        return Err(CoreError::InsufficientBalance {
            account_id: account_id.to_string(),
            required: amount,
            available: account.balance(),
        }
        .into());
    }

    let entry = LedgerRepository::record(
        conn,
        &NewLedgerEntry {
            account_id: account_id.to_string(),
            title: LedgerTitle::ServiceFee,
            outcome: LedgerOutcome::Success,
            amount_cents: -amount.cents(),
            booking_id: context.booking_id.clone(),
            property_id: context.property_id.clone(),
            room_type_id: context.room_type_id.clone(),
        },
        now,
    )
    .await?;

    debug!(account_id = %account_id, %amount, balance = entry.balance_after_cents, "Fee debited");
    Ok(entry)
}

/// Gives back a fee taken earlier. Always succeeds for an existing account.
pub async fn credit(
    conn: &mut SqliteConnection,
    account_id: &str,
    amount: Money,
    context: &LedgerContext,
    now: DateTime<Utc>,
) -> EngineResult<LedgerEntry> {
    require_non_negative(amount)?;

    let entry = LedgerRepository::record(
        conn,
        &NewLedgerEntry {
            account_id: account_id.to_string(),
            title: LedgerTitle::ServiceFee,
            outcome: LedgerOutcome::Error,
            amount_cents: amount.cents(),
            booking_id: context.booking_id.clone(),
            property_id: context.property_id.clone(),
            room_type_id: context.room_type_id.clone(),
        },
        now,
    )
    .await?;

    debug!(account_id = %account_id, %amount, balance = entry.balance_after_cents, "Fee credited back");
    Ok(entry)
}

/// Sets the balance to `new_balance` and records the difference as a top-up.
///
/// Returns `None` when the balance already equals `new_balance`.
pub async fn record_external_top_up(
    conn: &mut SqliteConnection,
    account_id: &str,
    new_balance: Money,
    now: DateTime<Utc>,
) -> EngineResult<Option<LedgerEntry>> {
    require_non_negative(new_balance)?;

    let account = MerchantRepository::lock_account(conn, account_id, now).await?;
    let delta = new_balance - account.balance();
    if delta.is_zero() {
        return Ok(None);
    }

    let entry = LedgerRepository::record(
        conn,
        &NewLedgerEntry {
            account_id: account_id.to_string(),
            title: LedgerTitle::TopUp,
            outcome: LedgerOutcome::Success,
            amount_cents: delta.cents(),
            booking_id: None,
            property_id: None,
            room_type_id: None,
        },
        now,
    )
    .await?;

    Ok(Some(entry))
}

impl Engine {
    /// Operator edit of an account balance, recorded as a top-up entry.
    pub async fn record_external_top_up(
        &self,
        account_id: &str,
        new_balance: Money,
    ) -> EngineResult<Option<LedgerEntry>> {
        let now = self.now();
        let mut tx = self.db().begin().await?;
        let entry = record_external_top_up(&mut tx, account_id, new_balance, now).await?;
        tx.commit().await?;

        if let Some(entry) = &entry {
            info!(
                account_id = %account_id,
                delta = entry.amount_cents,
                balance = entry.balance_after_cents,
                "Balance edited by operator"
            );
        }
        Ok(entry)
    }
}
