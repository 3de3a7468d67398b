use thiserror::Error;

use crate::store::StoreError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Business outcomes of purchase and lifecycle operations.
///
/// Everything except `Internal` is an expected result the caller can render;
/// none of them aborts the process.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Quantity {0} is outside the allowed range 1..=5")]
    InvalidQuantity(u32),

    #[error("Ticket type {0} is not on sale")]
    SaleClosed(i64),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Order belongs to another user")]
    Forbidden,

    #[error("Insufficient stock")]
    StockInsufficient,

    #[error("Order has expired")]
    OrderExpired,

    #[error("Order status error: {0}")]
    OrderStatusError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::Internal(err.to_string())
    }
}
