use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Sale status of a ticket type, stored as `SMALLINT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "snake_case")]
pub enum TicketTypeStatus {
    NotStarted = 0,
    Presale = 1,
    OnSale = 2,
    SoldOut = 3,
    Ended = 4,
}

impl TicketTypeStatus {
    pub fn permits_sale(self) -> bool {
        matches!(self, TicketTypeStatus::Presale | TicketTypeStatus::OnSale)
    }
}

/// A purchasable class of ticket for one performance.
///
/// `stock` is only ever changed through the inventory store's atomic
/// primitives; `total` is fixed when the row is created.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketType {
    pub id: i64,
    pub performance_id: i64,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub total: i32,
    pub sale_start_time: DateTime<Utc>,
    pub sale_end_time: DateTime<Utc>,
    pub status: TicketTypeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketType {
    /// Whether a purchase may be attempted at `now`.
    pub fn is_on_sale(&self, now: DateTime<Utc>) -> bool {
        self.status.permits_sale() && self.sale_start_time <= now && now <= self.sale_end_time
    }
}
