use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::create_cors_layer;
use crate::handlers::{health_check, orders, tickets};
use crate::state::AppState;

pub fn create_routes(state: AppState, cors_origins: &str) -> Router {
    let api = Router::new()
        .route("/tickets/seckill", post(tickets::seckill))
        .route("/tickets/:id", get(tickets::get_ticket_type))
        .route("/tickets/:id/stock", get(tickets::get_ticket_stock))
        .route("/orders", get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/confirm", post(orders::confirm_order))
        .route("/orders/:id/pay", post(orders::pay_order))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        .route("/orders/:id/refund", post(orders::refund_order));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer(cors_origins))
}
