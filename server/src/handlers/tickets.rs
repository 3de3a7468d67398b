use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::identity::CallerId;
use crate::utils::response::success;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeckillRequest {
    pub ticket_type_id: i64,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeckillResponse {
    pub order_id: i64,
    pub order_no: String,
    pub amount: Decimal,
    pub expire_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockResponse {
    pub ticket_type_id: i64,
    pub stock: i32,
}

pub async fn get_ticket_type(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let ticket_type = state.reservations.ticket_type(id).await?;
    Ok(success(ticket_type, "Ticket type retrieved"))
}

pub async fn get_ticket_stock(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id?;
    let ticket_type = state.reservations.ticket_type(id).await?;
    let payload = StockResponse {
        ticket_type_id: ticket_type.id,
        stock: ticket_type.stock,
    };
    Ok(success(payload, "Stock retrieved"))
}

pub async fn seckill(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    body: Result<Json<SeckillRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = body?;
    let order = state
        .reservations
        .attempt_purchase(user_id, request.ticket_type_id, request.quantity)
        .await?;

    let payload = SeckillResponse {
        order_id: order.id,
        order_no: order.order_no,
        amount: order.amount,
        expire_time: order.expire_time,
    };
    Ok(success(payload, "Tickets reserved"))
}
