//! Data-store contracts consumed by the engine.
//!
//! Every method is a single round trip. The conditional ones
//! ([`InventoryStore::try_decrement`], [`OrderStore::transition_status`])
//! must check their guard and apply the write as one indivisible step; the
//! engine never reads a value, compares it, and writes it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{NewOrder, Order, OrderStatus, StatusUpdate, TicketType};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Per-ticket-type stock.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn get_ticket_type(&self, id: i64) -> StoreResult<Option<TicketType>>;

    /// Subtract `quantity` from stock only if at least that much is left.
    /// Returns `true` iff the decrement was applied.
    async fn try_decrement(&self, ticket_type_id: i64, quantity: i32) -> StoreResult<bool>;

    /// Put `quantity` back. Does not dedupe; callers make sure each release
    /// happens once.
    async fn increment(&self, ticket_type_id: i64, quantity: i32) -> StoreResult<()>;
}

/// Filter and paging for a buyer's order history.
#[derive(Debug, Clone, Copy)]
pub struct OrderQuery {
    pub user_id: i64,
    pub status: Option<OrderStatus>,
    pub page: u32,
    pub page_size: u32,
}

impl OrderQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: NewOrder) -> StoreResult<Order>;

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Order>>;

    async fn get_by_order_no(&self, order_no: &str) -> StoreResult<Option<Order>>;

    /// Apply `update` only while the order is still in `expected`.
    /// Returns `true` iff this call performed the transition.
    async fn transition_status(
        &self,
        id: i64,
        expected: OrderStatus,
        update: StatusUpdate,
    ) -> StoreResult<bool>;

    /// Newest first. Returns the page and the total matching count.
    async fn list_by_user(&self, query: OrderQuery) -> StoreResult<(Vec<Order>, u64)>;

    /// Pending orders whose reservation window closed before `now`, oldest
    /// expiry first.
    async fn list_expired_pending(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> StoreResult<Vec<Order>>;
}
