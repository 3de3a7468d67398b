//! Returning reserved stock to inventory.
//!
//! A release that never lands leaks stock permanently, so increments are
//! retried and an exhausted retry is logged on the `reconciliation` target
//! with everything an operator needs to repair the row by hand.

use std::time::Duration;
use tracing::{error, warn};

use super::error::{EngineError, EngineResult};
use crate::store::InventoryStore;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    /// Delay before attempt `attempt + 1`, doubling each time.
    fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(50))
    }
}

/// Why stock is being handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    OrderCreateFailed,
    Cancelled,
    Expired,
}

impl ReleaseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseReason::OrderCreateFailed => "order_create_failed",
            ReleaseReason::Cancelled => "cancelled",
            ReleaseReason::Expired => "expired",
        }
    }
}

/// Increment `ticket_type_id` by `quantity`, retrying per `policy`.
///
/// `order_ref` identifies the reservation in logs (order id or order number).
pub async fn release_stock(
    inventory: &dyn InventoryStore,
    policy: RetryPolicy,
    ticket_type_id: i64,
    quantity: i32,
    reason: ReleaseReason,
    order_ref: &str,
) -> EngineResult<()> {
    let mut attempt = 1;
    loop {
        match inventory.increment(ticket_type_id, quantity).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < policy.max_attempts => {
                warn!(
                    ticket_type_id,
                    quantity,
                    attempt,
                    reason = reason.as_str(),
                    order_ref,
                    error = %e,
                    "Stock release failed, retrying"
                );
                tokio::time::sleep(policy.backoff(attempt)).await;
                attempt += 1;
            }
            Err(e) => {
                error!(
                    target: "reconciliation",
                    ticket_type_id,
                    quantity,
                    attempts = attempt,
                    reason = reason.as_str(),
                    order_ref,
                    error = %e,
                    "Stock release abandoned; ticket type stock must be corrected manually"
                );
                return Err(EngineError::Internal(format!(
                    "failed to release {} units of ticket type {}: {}",
                    quantity, ticket_type_id, e
                )));
            }
        }
    }
}
