//! Ticket inventory and order lifecycle engine.
//!
//! - [`ReservationEngine`] turns a purchase attempt into a pending order,
//!   decrementing stock first and compensating if the order cannot be stored.
//! - [`OrderLifecycleManager`] resolves pending orders to paid, cancelled or
//!   refunded.
//! - [`ExpiryReaper`] reclaims stock from pending orders nobody resolved
//!   before their window closed.
//!
//! None of these hold in-process locks. All contention is settled by the
//! stores' conditional writes.

use chrono::Duration;

pub mod compensation;
pub mod error;
pub mod lifecycle;
pub mod order_no;
pub mod reaper;
pub mod reservation;

pub use compensation::{release_stock, ReleaseReason, RetryPolicy};
pub use error::{EngineError, EngineResult};
pub use lifecycle::{OrderLifecycleManager, OrderPage};
pub use reaper::ExpiryReaper;
pub use reservation::ReservationEngine;

/// Default lifetime of a pending order.
pub const DEFAULT_RESERVATION_WINDOW_SECS: i64 = 30 * 60;

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub reservation_window: Duration,
    pub release_retry: RetryPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reservation_window: Duration::seconds(DEFAULT_RESERVATION_WINDOW_SECS),
            release_retry: RetryPolicy::default(),
        }
    }
}
