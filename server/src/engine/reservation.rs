use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::compensation::{release_stock, ReleaseReason};
use super::error::{EngineError, EngineResult};
use super::{order_no, EngineSettings};
use crate::clock::Clock;
use crate::models::{NewOrder, Order, TicketType, MAX_QUANTITY, MIN_QUANTITY};
use crate::store::{InventoryStore, OrderStore};

/// Handles purchase attempts.
///
/// The stock decrement always happens before the order exists, so an order
/// never outlives its reservation: if storing the order fails the units are
/// put back before the error is reported.
#[derive(Clone)]
pub struct ReservationEngine {
    inventory: Arc<dyn InventoryStore>,
    orders: Arc<dyn OrderStore>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl ReservationEngine {
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

    pub async fn ticket_type(&self, ticket_type_id: i64) -> EngineResult<TicketType> {
        self.inventory
            .get_ticket_type(ticket_type_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Ticket type {}", ticket_type_id)))
    }

    /// Reserve `quantity` units of `ticket_type_id` for `user_id` and create
    /// a pending order that expires after the reservation window.
    pub async fn attempt_purchase(
        &self,
        user_id: i64,
        ticket_type_id: i64,
        quantity: u32,
    ) -> EngineResult<Order> {
        if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) {
            return Err(EngineError::InvalidQuantity(quantity));
        }
        let units = quantity as i32;

        let ticket_type = self.ticket_type(ticket_type_id).await?;
        let now = self.clock.now();
        if !ticket_type.is_on_sale(now) {
            return Err(EngineError::SaleClosed(ticket_type_id));
        }

        if !self.inventory.try_decrement(ticket_type_id, units).await? {
            debug!(user_id, ticket_type_id, quantity, "Purchase rejected: sold out");
            return Err(EngineError::StockInsufficient);
        }

        let new_order = NewOrder {
            order_no: order_no::generate(now),
            user_id,
            performance_id: ticket_type.performance_id,
            ticket_type_id,
            quantity: units,
            amount: ticket_type.price * Decimal::from(quantity),
            expire_time: now + self.settings.reservation_window,
            created_at: now,
        };
        let order_no = new_order.order_no.clone();

        match self.orders.create(new_order).await {
            Ok(order) => {
                info!(
                    order_id = order.id,
                    order_no = %order.order_no,
                    user_id,
                    ticket_type_id,
                    quantity,
                    "Reservation created"
                );
                Ok(order)
            }
            Err(e) => {
                error!(
                    user_id,
                    ticket_type_id,
                    quantity,
                    order_no = %order_no,
                    error = %e,
                    "Order create failed after stock decrement, releasing stock"
                );
                if let Err(release_err) = release_stock(
                    self.inventory.as_ref(),
                    self.settings.release_retry,
                    ticket_type_id,
                    units,
                    ReleaseReason::OrderCreateFailed,
                    &order_no,
                )
                .await
                {
                    debug!(
                        order_no = %order_no,
                        error = %release_err,
                        "Release after failed create left for reconciliation"
                    );
                }
                Err(EngineError::Internal(format!("failed to create order: {}", e)))
            }
        }
    }
}
