use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{IssuedTicket, OrderStatus};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::identity::CallerId;
use crate::utils::response::success;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersParams {
    /// Numeric status code; omitted means every status.
    pub status: Option<i16>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub order_id: i64,
    pub payment_time: DateTime<Utc>,
    pub tickets: Vec<IssuedTicket>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    params: Result<Query<ListOrdersParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let status = params
        .status
        .map(|code| {
            OrderStatus::from_code(code)
                .ok_or_else(|| AppError::ValidationError(format!("Unknown order status {}", code)))
        })
        .transpose()?;

    let page = state
        .lifecycle
        .list_orders(
            user_id,
            status,
            params.page.unwrap_or(1),
            params.page_size.unwrap_or(0),
        )
        .await?;
    Ok(success(page, "Orders retrieved"))
}

pub async fn get_order(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let order = state.lifecycle.get_order(id, user_id).await?;
    Ok(success(order, "Order retrieved"))
}

pub async fn confirm_order(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let order = state.lifecycle.confirm_order(id, user_id).await?;
    Ok(success(order, "Order confirmed"))
}

pub async fn pay_order(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let order = state.lifecycle.pay(id, user_id).await?;

    let payment_time = order.payment_time.ok_or_else(|| {
        AppError::InternalServerError(format!("order {} paid without payment time", order.id))
    })?;
    let payload = PaymentResponse {
        order_id: order.id,
        payment_time,
        tickets: order.issued_tickets(),
    };
    Ok(success(payload, "Payment successful"))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let order = state.lifecycle.cancel(id, user_id).await?;
    Ok(success(order, "Order cancelled"))
}

pub async fn refund_order(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let order = state.lifecycle.refund(id, user_id).await?;
    Ok(success(order, "Refund accepted"))
}
