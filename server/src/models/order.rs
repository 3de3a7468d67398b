use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Smallest and largest quantity a single purchase request may reserve.
pub const MIN_QUANTITY: u32 = 1;
pub const MAX_QUANTITY: u32 = 5;

/// Order status, stored as `SMALLINT` and serialized as the same numeric
/// code so responses and the list filter agree.
///
/// ```text
/// Pending --pay--> Paid --refund--> Refunded
///    |
///    +--cancel / expiry sweep--> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
#[serde(into = "i16", try_from = "i16")]
pub enum OrderStatus {
    Pending = 0,
    Paid = 1,
    Cancelled = 2,
    Refunded = 3,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(OrderStatus::Pending),
            1 => Some(OrderStatus::Paid),
            2 => Some(OrderStatus::Cancelled),
            3 => Some(OrderStatus::Refunded),
            _ => None,
        }
    }

    /// Whether units of an order in this status are still subtracted from
    /// stock. Refunded tickets stay consumed; only cancellation releases.
    pub fn holds_stock(self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }
}

impl From<OrderStatus> for i16 {
    fn from(status: OrderStatus) -> Self {
        status as i16
    }
}

impl TryFrom<i16> for OrderStatus {
    type Error = String;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        OrderStatus::from_code(code).ok_or_else(|| format!("unknown order status {}", code))
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One buyer's reservation of `quantity` units of a ticket type.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_no: String,
    pub user_id: i64,
    pub performance_id: i64,
    pub ticket_type_id: i64,
    pub quantity: i32,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub expire_time: DateTime<Utc>,
    pub payment_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Past its reservation window. The window end itself is still valid.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expire_time
    }

    /// Cancelled by the expiry sweep rather than by its owner.
    ///
    /// An owner's cancel commits inside the reservation window, while the
    /// sweep stamps `updated_at` after `expire_time`.
    pub fn lapsed(&self) -> bool {
        self.status == OrderStatus::Cancelled
            && self.payment_time.is_none()
            && self.updated_at > self.expire_time
    }

    /// E-tickets for a paid order, one per reserved unit.
    pub fn issued_tickets(&self) -> Vec<IssuedTicket> {
        let Some(issued_at) = self.payment_time else {
            return Vec::new();
        };

        (1..=self.quantity)
            .map(|n| IssuedTicket {
                ticket_no: format!("TICKET{}-{}", self.id, n),
                status: IssuedTicketStatus::Valid,
                issued_at,
            })
            .collect()
    }
}

/// Fields of an order before the store assigns its id.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_no: String,
    pub user_id: i64,
    pub performance_id: i64,
    pub ticket_type_id: i64,
    pub quantity: i32,
    pub amount: Decimal,
    pub expire_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Fields written by a conditional status transition.
#[derive(Debug, Clone, Copy)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub payment_time: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuedTicketStatus {
    Valid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedTicket {
    pub ticket_no: String,
    pub status: IssuedTicketStatus,
    pub issued_at: DateTime<Utc>,
}
