use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::engine::EngineError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Sold out")]
    SoldOut,

    #[error("Ticket type not on sale: {0}")]
    SaleClosed(String),

    #[error("Order expired")]
    OrderExpired,

    #[error("Order status error: {0}")]
    OrderStatusError(String),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SoldOut => StatusCode::CONFLICT,
            AppError::SaleClosed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::OrderExpired => StatusCode::GONE,
            AppError::OrderStatusError(_) => StatusCode::CONFLICT,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::SoldOut => "SOLD_OUT",
            AppError::SaleClosed(_) => "SALE_CLOSED",
            AppError::OrderExpired => "ORDER_EXPIRED",
            AppError::OrderStatusError(_) => "ORDER_STATUS_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::SaleClosed(msg)
            | AppError::OrderStatusError(msg) => msg.clone(),
            AppError::SoldOut => "Tickets are sold out".to_string(),
            AppError::OrderExpired => "The order's payment window has closed".to_string(),
            AppError::InternalServerError(_) => "An internal error occurred".to_string(),
        }
    }

    fn log(&self) {
        match self {
            AppError::InternalServerError(detail) => {
                error!(error = ?self, detail = %detail, "Internal error");
            }
            other => {
                warn!(code = other.code(), message = %other, "Request rejected");
            }
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidQuantity(_) => AppError::ValidationError(err.to_string()),
            EngineError::SaleClosed(_) => AppError::SaleClosed(err.to_string()),
            EngineError::NotFound(what) => AppError::NotFound(format!("{} was not found", what)),
            EngineError::Forbidden => {
                AppError::Forbidden("Order belongs to another user".to_string())
            }
            EngineError::StockInsufficient => AppError::SoldOut,
            EngineError::OrderExpired => AppError::OrderExpired,
            EngineError::OrderStatusError(msg) => AppError::OrderStatusError(msg),
            EngineError::Internal(detail) => AppError::InternalServerError(detail),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();

        // Internal details stay in the logs.
        error_response(self.code(), self.public_message(), None, self.status_code())
    }
}
