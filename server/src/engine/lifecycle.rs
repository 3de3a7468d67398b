use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::compensation::{release_stock, ReleaseReason};
use super::error::{EngineError, EngineResult};
use super::EngineSettings;
use crate::clock::Clock;
use crate::models::{Order, OrderStatus, StatusUpdate};
use crate::store::{InventoryStore, OrderQuery, OrderStore};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

/// One page of a buyer's order history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub list: Vec<Order>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Moves orders through `Pending -> Paid -> Refunded` and
/// `Pending -> Cancelled`.
///
/// Every operation re-reads the order and checks ownership first. The
/// transition itself is a conditional write on the expected status, so when
/// two calls race on one order exactly one of them wins.
#[derive(Clone)]
pub struct OrderLifecycleManager {
    inventory: Arc<dyn InventoryStore>,
    orders: Arc<dyn OrderStore>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl OrderLifecycleManager {
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        orders: Arc<dyn OrderStore>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            inventory,
            orders,
            clock,
            settings,
        }
    }

    pub async fn get_order(&self, order_id: i64, caller_id: i64) -> EngineResult<Order> {
        let order = self
            .orders
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Order {}", order_id)))?;

        if order.user_id != caller_id {
            warn!(order_id, caller_id, "Order access by non-owner");
            return Err(EngineError::Forbidden);
        }
        Ok(order)
    }

    /// Hand a fresh reservation back to its buyer before payment.
    ///
    /// Same ownership checks as [`get_order`](Self::get_order), but a pending
    /// order past its window, or one the expiry sweep already cancelled, is
    /// reported as expired.
    pub async fn confirm_order(&self, order_id: i64, caller_id: i64) -> EngineResult<Order> {
        let order = self.get_order(order_id, caller_id).await?;
        let expired = order.status == OrderStatus::Pending && order.is_expired(self.clock.now());
        if expired || order.lapsed() {
            return Err(EngineError::OrderExpired);
        }
        Ok(order)
    }

    pub async fn list_orders(
        &self,
        caller_id: i64,
        status: Option<OrderStatus>,
        page: u32,
        page_size: u32,
    ) -> EngineResult<OrderPage> {
        let page = page.max(1);
        let page_size = match page_size {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        };

        let (list, total) = self
            .orders
            .list_by_user(OrderQuery {
                user_id: caller_id,
                status,
                page,
                page_size,
            })
            .await?;

        Ok(OrderPage {
            list,
            total,
            page,
            page_size,
        })
    }

    /// Mock payment: settles a pending order instantly.
    pub async fn pay(&self, order_id: i64, caller_id: i64) -> EngineResult<Order> {
        let mut order = self.get_order(order_id, caller_id).await?;
        let now = self.ensure_live_pending(&order, "pay")?;

        let update = StatusUpdate {
            status: OrderStatus::Paid,
            payment_time: Some(now),
            updated_at: now,
        };
        self.transition(&order, OrderStatus::Pending, update, "pay")
            .await?;

        order.status = OrderStatus::Paid;
        order.payment_time = Some(now);
        order.updated_at = now;
        info!(order_id, caller_id, amount = %order.amount, "Order paid");
        Ok(order)
    }

    /// Cancel a pending order and hand its units back to inventory.
    ///
    /// Stock is released only by the call that won the status transition,
    /// so a retried cancel can never release twice.
    pub async fn cancel(&self, order_id: i64, caller_id: i64) -> EngineResult<Order> {
        let mut order = self.get_order(order_id, caller_id).await?;
        let now = self.ensure_live_pending(&order, "cancel")?;

        let update = StatusUpdate {
            status: OrderStatus::Cancelled,
            payment_time: None,
            updated_at: now,
        };
        self.transition(&order, OrderStatus::Pending, update, "cancel")
            .await?;

        order.status = OrderStatus::Cancelled;
        order.updated_at = now;
        info!(order_id, caller_id, "Order cancelled");

        release_stock(
            self.inventory.as_ref(),
            self.settings.release_retry,
            order.ticket_type_id,
            order.quantity,
            ReleaseReason::Cancelled,
            &order.order_no,
        )
        .await?;

        Ok(order)
    }

    /// Refund a paid order. The tickets stay consumed; stock is not released.
    pub async fn refund(&self, order_id: i64, caller_id: i64) -> EngineResult<Order> {
        let mut order = self.get_order(order_id, caller_id).await?;
        if order.status != OrderStatus::Paid {
            return Err(EngineError::OrderStatusError(format!(
                "cannot refund an order that is {}",
                order.status
            )));
        }

        let now = self.clock.now();
        let update = StatusUpdate {
            status: OrderStatus::Refunded,
            payment_time: None,
            updated_at: now,
        };
        self.transition(&order, OrderStatus::Paid, update, "refund")
            .await?;

        order.status = OrderStatus::Refunded;
        order.updated_at = now;
        info!(order_id, caller_id, amount = %order.amount, "Order refunded");
        Ok(order)
    }

    /// Status must be pending and the reservation window still open.
    /// An order the expiry sweep cancelled counts as expired, not as a
    /// wrong-state order. Returns the time the check was made at.
    fn ensure_live_pending(
        &self,
        order: &Order,
        action: &str,
    ) -> EngineResult<chrono::DateTime<chrono::Utc>> {
        if order.lapsed() {
            return Err(EngineError::OrderExpired);
        }
        if order.status != OrderStatus::Pending {
            return Err(EngineError::OrderStatusError(format!(
                "cannot {} an order that is {}",
                action, order.status
            )));
        }

        let now = self.clock.now();
        if order.is_expired(now) {
            return Err(EngineError::OrderExpired);
        }
        Ok(now)
    }

    async fn transition(
        &self,
        order: &Order,
        expected: OrderStatus,
        update: StatusUpdate,
        action: &str,
    ) -> EngineResult<()> {
        if self
            .orders
            .transition_status(order.id, expected, update)
            .await?
        {
            return Ok(());
        }

        warn!(order_id = order.id, action, "Lost race on order status transition");
        Err(EngineError::OrderStatusError(format!(
            "cannot {}: order is no longer {}",
            action, expected
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::engine::{ExpiryReaper, ReservationEngine};
    use crate::models::{TicketType, TicketTypeStatus};
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    struct Fixture {
        store: MemoryStore,
        clock: Arc<FixedClock>,
        reservations: ReservationEngine,
        lifecycle: OrderLifecycleManager,
    }

    async fn fixture(stock: i32) -> Fixture {
        let now = Utc::now();
        let store = MemoryStore::new();
        store
            .insert_ticket_type(TicketType {
                id: 1,
                performance_id: 3,
                name: "Balcony".to_string(),
                price: Decimal::new(80, 0),
                stock,
                total: stock,
                sale_start_time: now - Duration::days(1),
                sale_end_time: now + Duration::days(1),
                status: TicketTypeStatus::OnSale,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let clock = Arc::new(FixedClock::new(now));
        let settings = EngineSettings::default();
        Fixture {
            reservations: ReservationEngine::new(
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                clock.clone(),
                settings,
            ),
            lifecycle: OrderLifecycleManager::new(
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                clock.clone(),
                settings,
            ),
            store,
            clock,
        }
    }

    #[tokio::test]
    async fn test_pay_sets_status_and_payment_time() {
        let f = fixture(5).await;
        let order = f.reservations.attempt_purchase(1, 1, 2).await.unwrap();

        let paid = f.lifecycle.pay(order.id, 1).await.unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(paid.payment_time, Some(f.clock.now()));

        let stored = f.lifecycle.get_order(order.id, 1).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);
        assert_eq!(stored.payment_time, Some(f.clock.now()));
        assert_eq!(f.store.stock(1).await, Some(3));
    }

    #[tokio::test]
    async fn test_non_owner_is_forbidden_and_missing_order_not_found() {
        let f = fixture(5).await;
        let order = f.reservations.attempt_purchase(1, 1, 1).await.unwrap();

        assert!(matches!(
            f.lifecycle.pay(order.id, 2).await,
            Err(EngineError::Forbidden)
        ));
        assert!(matches!(
            f.lifecycle.cancel(order.id, 2).await,
            Err(EngineError::Forbidden)
        ));
        assert!(matches!(
            f.lifecycle.refund(999, 1).await,
            Err(EngineError::NotFound(_))
        ));
        assert_eq!(
            f.lifecycle.get_order(order.id, 1).await.unwrap().status,
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_cancel_releases_stock_exactly_once() {
        let f = fixture(5).await;
        let order = f.reservations.attempt_purchase(1, 1, 3).await.unwrap();
        assert_eq!(f.store.stock(1).await, Some(2));

        let cancelled = f.lifecycle.cancel(order.id, 1).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(f.store.stock(1).await, Some(5));

        assert!(matches!(
            f.lifecycle.cancel(order.id, 1).await,
            Err(EngineError::OrderStatusError(_))
        ));
        assert_eq!(f.store.stock(1).await, Some(5));
    }

    #[tokio::test]
    async fn test_expired_order_cannot_be_paid_or_cancelled() {
        let f = fixture(5).await;
        let order = f.reservations.attempt_purchase(1, 1, 1).await.unwrap();

        f.clock.advance(Duration::minutes(30));
        assert!(f.lifecycle.get_order(order.id, 1).await.is_ok());

        f.clock.advance(Duration::seconds(1));
        assert!(matches!(
            f.lifecycle.pay(order.id, 1).await,
            Err(EngineError::OrderExpired)
        ));
        assert!(matches!(
            f.lifecycle.cancel(order.id, 1).await,
            Err(EngineError::OrderExpired)
        ));

        let stored = f.lifecycle.get_order(order.id, 1).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert_eq!(f.store.stock(1).await, Some(4));
    }

    #[tokio::test]
    async fn test_swept_order_still_reports_expired() {
        let f = fixture(5).await;
        let order = f.reservations.attempt_purchase(1, 1, 2).await.unwrap();
        let reaper = ExpiryReaper::new(
            Arc::new(f.store.clone()),
            Arc::new(f.store.clone()),
            f.clock.clone(),
            EngineSettings::default(),
            10,
        );

        f.clock.advance(Duration::minutes(31));
        assert!(matches!(
            f.lifecycle.pay(order.id, 1).await,
            Err(EngineError::OrderExpired)
        ));

        assert_eq!(reaper.sweep_once().await.unwrap(), 1);
        assert_eq!(f.store.stock(1).await, Some(5));

        assert!(matches!(
            f.lifecycle.pay(order.id, 1).await,
            Err(EngineError::OrderExpired)
        ));
        assert!(matches!(
            f.lifecycle.cancel(order.id, 1).await,
            Err(EngineError::OrderExpired)
        ));
        assert!(matches!(
            f.lifecycle.confirm_order(order.id, 1).await,
            Err(EngineError::OrderExpired)
        ));
        assert_eq!(f.store.stock(1).await, Some(5));
    }

    #[tokio::test]
    async fn test_owner_cancelled_order_is_a_status_error() {
        let f = fixture(5).await;
        let order = f.reservations.attempt_purchase(1, 1, 1).await.unwrap();
        f.lifecycle.cancel(order.id, 1).await.unwrap();

        f.clock.advance(Duration::hours(1));
        assert!(matches!(
            f.lifecycle.pay(order.id, 1).await,
            Err(EngineError::OrderStatusError(_))
        ));
        assert!(matches!(
            f.lifecycle.cancel(order.id, 1).await,
            Err(EngineError::OrderStatusError(_))
        ));
    }

    #[tokio::test]
    async fn test_confirm_checks_owner_then_expiry() {
        let f = fixture(5).await;
        let order = f.reservations.attempt_purchase(1, 1, 1).await.unwrap();

        let confirmed = f.lifecycle.confirm_order(order.id, 1).await.unwrap();
        assert_eq!(confirmed.order_no, order.order_no);
        assert!(matches!(
            f.lifecycle.confirm_order(order.id, 2).await,
            Err(EngineError::Forbidden)
        ));

        f.clock.advance(Duration::minutes(31));
        assert!(matches!(
            f.lifecycle.confirm_order(order.id, 2).await,
            Err(EngineError::Forbidden)
        ));
        assert!(matches!(
            f.lifecycle.confirm_order(order.id, 1).await,
            Err(EngineError::OrderExpired)
        ));
    }

    #[tokio::test]
    async fn test_pay_on_last_second_of_window_succeeds() {
        let f = fixture(5).await;
        let order = f.reservations.attempt_purchase(1, 1, 1).await.unwrap();
        f.clock.set(order.expire_time);
        assert!(f.lifecycle.pay(order.id, 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_refund_only_from_paid_and_keeps_stock_consumed() {
        let f = fixture(5).await;
        let order = f.reservations.attempt_purchase(1, 1, 2).await.unwrap();

        assert!(matches!(
            f.lifecycle.refund(order.id, 1).await,
            Err(EngineError::OrderStatusError(_))
        ));

        f.lifecycle.pay(order.id, 1).await.unwrap();
        let refunded = f.lifecycle.refund(order.id, 1).await.unwrap();
        assert_eq!(refunded.status, OrderStatus::Refunded);
        assert_eq!(f.store.stock(1).await, Some(3));

        assert!(matches!(
            f.lifecycle.refund(order.id, 1).await,
            Err(EngineError::OrderStatusError(_))
        ));
        assert!(matches!(
            f.lifecycle.pay(order.id, 1).await,
            Err(EngineError::OrderStatusError(_))
        ));
    }

    #[tokio::test]
    async fn test_paid_order_past_expiry_can_still_be_refunded() {
        let f = fixture(5).await;
        let order = f.reservations.attempt_purchase(1, 1, 1).await.unwrap();
        f.lifecycle.pay(order.id, 1).await.unwrap();

        f.clock.advance(Duration::hours(2));
        assert!(matches!(
            f.lifecycle.cancel(order.id, 1).await,
            Err(EngineError::OrderStatusError(_))
        ));
        assert!(f.lifecycle.refund(order.id, 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_orders_normalizes_paging() {
        let f = fixture(20).await;
        for _ in 0..3 {
            f.reservations.attempt_purchase(1, 1, 1).await.unwrap();
        }
        f.reservations.attempt_purchase(2, 1, 1).await.unwrap();

        let page = f.lifecycle.list_orders(1, None, 0, 0).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(page.total, 3);
        assert!(page.list.iter().all(|o| o.user_id == 1));

        let capped = f.lifecycle.list_orders(1, None, 1, 1_000).await.unwrap();
        assert_eq!(capped.page_size, MAX_PAGE_SIZE);

        let paid = f
            .lifecycle
            .list_orders(1, Some(OrderStatus::Paid), 1, 10)
            .await
            .unwrap();
        assert_eq!(paid.total, 0);
    }
}
