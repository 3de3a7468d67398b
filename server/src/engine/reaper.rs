//! Background sweep that reclaims stock from abandoned reservations.
//!
//! Pay and cancel check expiry lazily, so a pending order nobody touches
//! again would hold its units forever. The reaper cancels such orders and
//! releases their stock, using the same conditional transition as an
//! explicit cancel so it can never race a payment into a double resolution.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::compensation::{release_stock, ReleaseReason};
use super::error::EngineResult;
use super::EngineSettings;
use crate::clock::Clock;
use crate::models::{OrderStatus, StatusUpdate};
use crate::store::{InventoryStore, OrderStore};

#[derive(Clone)]
pub struct ExpiryReaper {
    inventory: Arc<dyn InventoryStore>,
    orders: Arc<dyn OrderStore>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    batch_size: u32,
}

impl ExpiryReaper {
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        orders: Arc<dyn OrderStore>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
        batch_size: u32,
    ) -> Self {
        Self {
            inventory,
            orders,
            clock,
            settings,
            batch_size: batch_size.max(1),
        }
    }

    /// Cancel up to one batch of expired pending orders and release their
    /// stock. Returns how many orders this sweep reclaimed.
    ///
    /// Orders that were paid or cancelled between the scan and the update
    /// are skipped, as are orders whose update fails; the next sweep picks
    /// those up again.
    pub async fn sweep_once(&self) -> EngineResult<usize> {
        let now = self.clock.now();
        let expired = self
            .orders
            .list_expired_pending(now, self.batch_size)
            .await?;

        let mut reclaimed = 0;
        for order in expired {
            let update = StatusUpdate {
                status: OrderStatus::Cancelled,
                payment_time: None,
                updated_at: now,
            };
            match self
                .orders
                .transition_status(order.id, OrderStatus::Pending, update)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    debug!(order_id = order.id, "Expired order resolved concurrently, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(order_id = order.id, error = %e, "Failed to cancel expired order");
                    continue;
                }
            }

            // A failed release is logged for reconciliation inside
            // release_stock; keep sweeping the rest of the batch.
            if release_stock(
                self.inventory.as_ref(),
                self.settings.release_retry,
                order.ticket_type_id,
                order.quantity,
                ReleaseReason::Expired,
                &order.order_no,
            )
            .await
            .is_ok()
            {
                reclaimed += 1;
                info!(
                    order_id = order.id,
                    ticket_type_id = order.ticket_type_id,
                    quantity = order.quantity,
                    "Expired reservation reclaimed"
                );
            }
        }

        Ok(reclaimed)
    }

    /// Run [`sweep_once`](Self::sweep_once) every `interval` until the
    /// returned task is aborted.
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                interval_secs = interval.as_secs(),
                batch_size = self.batch_size,
                "Expiry reaper started"
            );

            loop {
                ticker.tick().await;
                match self.sweep_once().await {
                    Ok(0) => {}
                    Ok(n) => info!(reclaimed = n, "Expiry sweep finished"),
                    Err(e) => error!(error = %e, "Expiry sweep failed"),
                }
            }
        })
    }
}
