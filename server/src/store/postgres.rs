//! PostgreSQL adapter.
//!
//! The guards live in the `WHERE` clauses so each conditional write is one
//! statement and Postgres' row lock serializes racing callers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{InventoryStore, OrderQuery, OrderStore, StoreError, StoreResult};
use crate::models::{NewOrder, Order, OrderStatus, StatusUpdate, TicketType};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl InventoryStore for PgStore {
    async fn get_ticket_type(&self, id: i64) -> StoreResult<Option<TicketType>> {
        let ticket_type = sqlx::query_as::<_, TicketType>(
            r#"
            SELECT id, performance_id, name, price, stock, total,
                   sale_start_time, sale_end_time, status, created_at, updated_at
            FROM ticket_types
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket_type)
    }

    async fn try_decrement(&self, ticket_type_id: i64, quantity: i32) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE ticket_types
            SET stock = stock - $2,
                updated_at = NOW()
            WHERE id = $1
              AND stock >= $2
            "#,
        )
        .bind(ticket_type_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn increment(&self, ticket_type_id: i64, quantity: i32) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE ticket_types
            SET stock = stock + $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(ticket_type_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Constraint(format!(
                "ticket type {} does not exist",
                ticket_type_id
            )));
        }
        Ok(())
    }
}

const ORDER_COLUMNS: &str = "id, order_no, user_id, performance_id, ticket_type_id, quantity, \
     amount, status, expire_time, payment_time, created_at, updated_at";

#[async_trait]
impl OrderStore for PgStore {
    async fn create(&self, new: NewOrder) -> StoreResult<Order> {
        let sql = format!(
            r#"
            INSERT INTO orders
                (order_no, user_id, performance_id, ticket_type_id, quantity, amount,
                 status, expire_time, payment_time, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL, $9, $9)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        );

        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(&new.order_no)
            .bind(new.user_id)
            .bind(new.performance_id)
            .bind(new.ticket_type_id)
            .bind(new.quantity)
            .bind(new.amount)
            .bind(OrderStatus::Pending)
            .bind(new.expire_time)
            .bind(new.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(order)
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn get_by_order_no(&self, order_no: &str) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE order_no = $1", ORDER_COLUMNS);
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_no)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn transition_status(
        &self,
        id: i64,
        expected: OrderStatus,
        update: StatusUpdate,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $3,
                payment_time = COALESCE($4, payment_time),
                updated_at = $5
            WHERE id = $1
              AND status = $2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(update.status)
        .bind(update.payment_time)
        .bind(update.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_by_user(&self, query: OrderQuery) -> StoreResult<(Vec<Order>, u64)> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM orders
            WHERE user_id = $1
              AND ($2::SMALLINT IS NULL OR status = $2)
            "#,
        )
        .bind(query.user_id)
        .bind(query.status)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {}
            FROM orders
            WHERE user_id = $1
              AND ($2::SMALLINT IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
            ORDER_COLUMNS
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(query.user_id)
            .bind(query.status)
            .bind(i64::from(query.page_size))
            .bind(query.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok((orders, total.max(0) as u64))
    }

    async fn list_expired_pending(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> StoreResult<Vec<Order>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM orders
            WHERE status = $1
              AND expire_time < $2
            ORDER BY expire_time ASC, id ASC
            LIMIT $3
            "#,
            ORDER_COLUMNS
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(OrderStatus::Pending)
            .bind(now)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }
}
