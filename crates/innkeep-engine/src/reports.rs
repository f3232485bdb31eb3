//! Read models for guests and the merchant dashboard.
//!
//! Merchant reads act on the account's active property and do not lock
//! the account.

use tracing::debug;

use crate::booking::{active_property, guest_booking};
use crate::engine::Engine;
use crate::error::EngineResult;
use innkeep_core::{
    AccountingSummary, Booking, BookingDetails, BookingStatistics, BookingStatus, CoreError, FinishedFilter,
    LedgerEntry, MerchantAccount, Money, OrderSort, OrderStatistics, ServingFilter, StatsPeriod,
};
use innkeep_db::BookingRepository;

impl Engine {
    async fn property_of(&self, account_id: &str) -> EngineResult<String> {
        let account: MerchantAccount = self
            .db()
            .merchants()
            .get_account(account_id)
            .await?
            .ok_or_else(|| CoreError::not_found("MerchantAccount", account_id))?;
        Ok(active_property(&account)?.to_string())
    }

    // =========================================================================
    // Guest
    // =========================================================================

    /// Bookings still in play, newest first.
    pub async fn active_bookings(&self, requester_id: &str) -> EngineResult<Vec<Booking>> {
        let statuses = [BookingStatus::Pending, BookingStatus::Confirmed, BookingStatus::Active];
        Ok(self.db().bookings().list_for_requester(requester_id, &statuses).await?)
    }

    /// Canceled and closed bookings, newest first.
    pub async fn booking_history(&self, requester_id: &str) -> EngineResult<Vec<Booking>> {
        let statuses = [BookingStatus::Canceled, BookingStatus::Closed];
        Ok(self.db().bookings().list_for_requester(requester_id, &statuses).await?)
    }

    /// One of the guest's bookings with its lines.
    pub async fn booking(&self, requester_id: &str, booking_id: &str) -> EngineResult<BookingDetails> {
        let mut conn = self.db().pool().acquire().await?;
        let booking = guest_booking(&mut conn, requester_id, booking_id).await?;
        let rooms = BookingRepository::fetch_lines(&mut conn, booking_id).await?;
        Ok(BookingDetails { booking, rooms })
    }

    // =========================================================================
    // Merchant listings
    // =========================================================================

    pub async fn pending_orders(&self, account_id: &str, sort: OrderSort) -> EngineResult<Vec<Booking>> {
        let property_id = self.property_of(account_id).await?;
        Ok(self
            .db()
            .bookings()
            .list_for_property(&property_id, &[BookingStatus::Pending], sort)
            .await?)
    }

    /// Bookings the merchant is serving right now.
    pub async fn merchant_history(&self, account_id: &str, filter: ServingFilter) -> EngineResult<Vec<Booking>> {
        let property_id = self.property_of(account_id).await?;
        Ok(self
            .db()
            .bookings()
            .list_for_property(&property_id, &[filter.status()], OrderSort::ByDate)
            .await?)
    }

    pub async fn order_history(&self, account_id: &str, filter: FinishedFilter) -> EngineResult<Vec<Booking>> {
        let property_id = self.property_of(account_id).await?;
        Ok(self
            .db()
            .bookings()
            .list_for_property(&property_id, &[filter.status()], OrderSort::ByDate)
            .await?)
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Order counts by creation time, relative to the engine clock.
    pub async fn order_statistics(&self, account_id: &str) -> EngineResult<OrderStatistics> {
        let property_id = self.property_of(account_id).await?;
        let now = self.now();
        let bookings = self.db().bookings();
        let window = |period: StatsPeriod| Some(period.window(now));

        let stats = OrderStatistics {
            total: bookings.count_for_property(&property_id, None, None).await?,
            last_30_days: bookings
                .count_for_property(&property_id, None, window(StatsPeriod::Last30Days))
                .await?,
            yesterday: bookings
                .count_for_property(&property_id, None, window(StatsPeriod::Yesterday))
                .await?,
            today: bookings
                .count_for_property(&property_id, None, window(StatsPeriod::Today))
                .await?,
        };
        debug!(property_id = %property_id, total = stats.total, "Order statistics");
        Ok(stats)
    }

    /// Bookings created in `period`: all, still pending, and in residence.
    pub async fn booking_statistics(&self, account_id: &str, period: StatsPeriod) -> EngineResult<BookingStatistics> {
        let property_id = self.property_of(account_id).await?;
        let window = Some(period.window(self.now()));
        let bookings = self.db().bookings();

        Ok(BookingStatistics {
            total: bookings.count_for_property(&property_id, None, window).await?,
            booked: bookings
                .count_for_property(&property_id, Some(BookingStatus::Pending), window)
                .await?,
            reside: bookings
                .count_for_property(&property_id, Some(BookingStatus::Active), window)
                .await?,
        })
    }

    /// Revenue from closed stays against net service fees for `period`.
    pub async fn accounting(&self, account_id: &str, period: StatsPeriod) -> EngineResult<AccountingSummary> {
        let property_id = self.property_of(account_id).await?;
        let (start, end) = period.window(self.now());

        let revenue = self.db().bookings().closed_revenue(&property_id, start, end).await?;
        let fees = self.db().ledger().net_fees(&property_id, start, end).await?;

        let summary = AccountingSummary::new(Money::from_cents(revenue), Money::from_cents(fees));
        debug!(
            property_id = %property_id,
            ?period,
            revenue = summary.revenue_cents,
            fees = summary.fees_cents,
            "Accounting summary"
        );
        Ok(summary)
    }

    /// Ledger entries of the active property plus top-ups, newest first.
    pub async fn transaction_statement(&self, account_id: &str) -> EngineResult<Vec<LedgerEntry>> {
        let property_id = self.property_of(account_id).await?;
        Ok(self.db().ledger().statement(account_id, Some(&property_id)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures::Fixture;
    use chrono::Duration;
    use innkeep_core::LedgerTitle;

    #[tokio::test]
    async fn test_guest_lists_split_by_status() {
        let f = Fixture::new(10).await;
        let live = f.create(&[2]).await;
        let gone = f.create(&[1]).await;
        f.engine.cancel_booking("guest", &gone.booking.id, None).await.unwrap();

        let active = f.engine.active_bookings("guest").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, live.booking.id);

        let history = f.engine.booking_history("guest").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, gone.booking.id);

        let details = f.engine.booking("guest", &live.booking.id).await.unwrap();
        assert_eq!(details.rooms.len(), 1);
        let err = f.engine.booking("someone-else", &live.booking.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecordNotFound);
    }

    #[tokio::test]
    async fn test_pending_orders_sorting() {
        let f = Fixture::new(0).await;
        let small = f.create(&[1]).await;
        f.clock.advance(Duration::minutes(1));
        let large = f.create(&[2, 2]).await;

        let by_price = f.engine.pending_orders(&f.account_id, OrderSort::ByPrice).await.unwrap();
        assert_eq!(by_price[0].id, large.booking.id);

        let by_date = f.engine.pending_orders(&f.account_id, OrderSort::ByDate).await.unwrap();
        assert_eq!(by_date[0].id, large.booking.id);
        assert_eq!(by_date[1].id, small.booking.id);

        let by_occupants = f.engine.pending_orders(&f.account_id, OrderSort::ByOccupants).await.unwrap();
        assert_eq!(by_occupants[0].occupant_count, 4);
    }

    #[tokio::test]
    async fn test_merchant_and_order_history() {
        let f = Fixture::new(10).await;
        let created = f.create(&[2]).await;
        let id = created.booking.id.clone();
        f.engine
            .accept_booking(&f.account_id, &id, &f.assign(&created, &[0]))
            .await
            .unwrap();

        let confirmed = f.engine.merchant_history(&f.account_id, ServingFilter::Confirmed).await.unwrap();
        assert_eq!(confirmed.len(), 1);
        assert!(f
            .engine
            .merchant_history(&f.account_id, ServingFilter::Active)
            .await
            .unwrap()
            .is_empty());

        f.engine.activate_booking(&f.account_id, &id).await.unwrap();
        f.engine.close_booking(&f.account_id, &id).await.unwrap();

        let closed = f.engine.order_history(&f.account_id, FinishedFilter::Closed).await.unwrap();
        assert_eq!(closed.len(), 1);
        assert!(f
            .engine
            .order_history(&f.account_id, FinishedFilter::Canceled)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_order_statistics_windows() {
        let f = Fixture::new(0).await;
        f.create(&[2]).await;
        f.clock.advance(Duration::days(1));
        f.create(&[2]).await;
        f.create(&[1]).await;

        let stats = f.engine.order_statistics(&f.account_id).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.last_30_days, 3);
        assert_eq!(stats.yesterday, 1);
        assert_eq!(stats.today, 2);

        let bookings = f.engine.booking_statistics(&f.account_id, StatsPeriod::Today).await.unwrap();
        assert_eq!(bookings.total, 2);
        assert_eq!(bookings.booked, 2);
        assert_eq!(bookings.reside, 0);
    }

    #[tokio::test]
    async fn test_accounting_nets_reversed_fees() {
        let f = Fixture::new(20).await;
        let kept = f.create(&[2]).await;
        let reversed = f.create(&[2]).await;

        f.engine
            .accept_booking(&f.account_id, &kept.booking.id, &f.assign(&kept, &[0]))
            .await
            .unwrap();
        f.engine
            .accept_booking(&f.account_id, &reversed.booking.id, &f.assign(&reversed, &[1]))
            .await
            .unwrap();
        f.engine
            .cancel_accepted_booking(&f.account_id, &reversed.booking.id, None)
            .await
            .unwrap();
        f.engine.activate_booking(&f.account_id, &kept.booking.id).await.unwrap();
        f.engine.close_booking(&f.account_id, &kept.booking.id).await.unwrap();

        let summary = f.engine.accounting(&f.account_id, StatsPeriod::Today).await.unwrap();
        assert_eq!(summary.revenue_cents, 160);
        assert_eq!(summary.fees_cents, 5);
        assert_eq!(summary.profit_cents, 155);
    }

    #[tokio::test]
    async fn test_statement_includes_top_ups() {
        let f = Fixture::new(10).await;
        let created = f.create(&[2]).await;
        f.engine
            .accept_booking(&f.account_id, &created.booking.id, &f.assign(&created, &[0]))
            .await
            .unwrap();

        let statement = f.engine.transaction_statement(&f.account_id).await.unwrap();
        assert_eq!(statement.len(), 2);
        assert_eq!(statement[0].title, LedgerTitle::ServiceFee);
        assert_eq!(statement[1].title, LedgerTitle::TopUp);
    }

    #[tokio::test]
    async fn test_merchant_reads_need_active_property() {
        let f = Fixture::new(0).await;
        let account = f.engine.create_merchant_account("No Property").await.unwrap();

        let err = f.engine.pending_orders(&account.id, OrderSort::ByDate).await.unwrap_err();
        assert_eq!(err.field().as_deref(), Some("active_property_id"));
    }
}
