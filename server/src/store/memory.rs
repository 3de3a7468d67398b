//! In-process store.
//!
//! Each primitive holds the write lock for its whole check-and-mutate, which
//! gives the same single-row atomicity the SQL adapter gets from a
//! conditional `UPDATE`. Not persistent; used by tests and local demos.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{InventoryStore, OrderQuery, OrderStore, StoreError, StoreResult};
use crate::models::{NewOrder, Order, OrderStatus, StatusUpdate, TicketType};

#[derive(Default)]
struct Orders {
    next_id: i64,
    rows: HashMap<i64, Order>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    ticket_types: Arc<RwLock<HashMap<i64, TicketType>>>,
    orders: Arc<RwLock<Orders>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a ticket type. Stands in for the event-management process that
    /// owns ticket type creation.
    pub async fn insert_ticket_type(&self, ticket_type: TicketType) -> StoreResult<()> {
        if ticket_type.stock < 0 || ticket_type.stock > ticket_type.total {
            return Err(StoreError::Constraint(format!(
                "ticket type {}: stock {} outside 0..={}",
                ticket_type.id, ticket_type.stock, ticket_type.total
            )));
        }
        self.ticket_types
            .write()
            .await
            .insert(ticket_type.id, ticket_type);
        Ok(())
    }

    pub async fn stock(&self, ticket_type_id: i64) -> Option<i32> {
        self.ticket_types
            .read()
            .await
            .get(&ticket_type_id)
            .map(|tt| tt.stock)
    }

    pub async fn orders(&self) -> Vec<Order> {
        let orders = self.orders.read().await;
        let mut all: Vec<Order> = orders.rows.values().cloned().collect();
        all.sort_by_key(|o| o.id);
        all
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn get_ticket_type(&self, id: i64) -> StoreResult<Option<TicketType>> {
        Ok(self.ticket_types.read().await.get(&id).cloned())
    }

    async fn try_decrement(&self, ticket_type_id: i64, quantity: i32) -> StoreResult<bool> {
        let mut ticket_types = self.ticket_types.write().await;
        match ticket_types.get_mut(&ticket_type_id) {
            Some(tt) if tt.stock >= quantity => {
                tt.stock -= quantity;
                tt.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment(&self, ticket_type_id: i64, quantity: i32) -> StoreResult<()> {
        let mut ticket_types = self.ticket_types.write().await;
        let tt = ticket_types.get_mut(&ticket_type_id).ok_or_else(|| {
            StoreError::Constraint(format!("ticket type {} does not exist", ticket_type_id))
        })?;

        if tt.stock + quantity > tt.total {
            return Err(StoreError::Constraint(format!(
                "ticket type {}: releasing {} would exceed total {}",
                ticket_type_id, quantity, tt.total
            )));
        }
        tt.stock += quantity;
        tt.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create(&self, new: NewOrder) -> StoreResult<Order> {
        let mut orders = self.orders.write().await;
        if orders.rows.values().any(|o| o.order_no == new.order_no) {
            return Err(StoreError::Constraint(format!(
                "duplicate order number {}",
                new.order_no
            )));
        }

        orders.next_id += 1;
        let order = Order {
            id: orders.next_id,
            order_no: new.order_no,
            user_id: new.user_id,
            performance_id: new.performance_id,
            ticket_type_id: new.ticket_type_id,
            quantity: new.quantity,
            amount: new.amount,
            status: OrderStatus::Pending,
            expire_time: new.expire_time,
            payment_time: None,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        orders.rows.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Order>> {
        Ok(self.orders.read().await.rows.get(&id).cloned())
    }

    async fn get_by_order_no(&self, order_no: &str) -> StoreResult<Option<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .rows
            .values()
            .find(|o| o.order_no == order_no)
            .cloned())
    }

    async fn transition_status(
        &self,
        id: i64,
        expected: OrderStatus,
        update: StatusUpdate,
    ) -> StoreResult<bool> {
        let mut orders = self.orders.write().await;
        match orders.rows.get_mut(&id) {
            Some(order) if order.status == expected => {
                order.status = update.status;
                if update.payment_time.is_some() {
                    order.payment_time = update.payment_time;
                }
                order.updated_at = update.updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_user(&self, query: OrderQuery) -> StoreResult<(Vec<Order>, u64)> {
        let orders = self.orders.read().await;
        let mut matching: Vec<&Order> = orders
            .rows
            .values()
            .filter(|o| o.user_id == query.user_id)
            .filter(|o| query.status.map_or(true, |s| o.status == s))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn list_expired_pending(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> StoreResult<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut expired: Vec<Order> = orders
            .rows
            .values()
            .filter(|o| o.status == OrderStatus::Pending && o.expire_time < now)
            .cloned()
            .collect();
        expired.sort_by_key(|o| (o.expire_time, o.id));
        expired.truncate(limit as usize);
        Ok(expired)
    }
}
