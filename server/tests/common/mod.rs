#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use seckill_server::clock::FixedClock;
use seckill_server::engine::{EngineSettings, OrderLifecycleManager, ReservationEngine};
use seckill_server::models::{TicketType, TicketTypeStatus};
use seckill_server::store::MemoryStore;

pub const TICKET_TYPE_ID: i64 = 1;

pub fn on_sale_ticket_type(now: DateTime<Utc>, stock: i32, price: Decimal) -> TicketType {
    TicketType {
        id: TICKET_TYPE_ID,
        performance_id: 10,
        name: "Front Row".to_string(),
        price,
        stock,
        total: stock,
        sale_start_time: now - Duration::hours(1),
        sale_end_time: now + Duration::hours(12),
        status: TicketTypeStatus::OnSale,
        created_at: now,
        updated_at: now,
    }
}

pub struct Harness {
    pub store: MemoryStore,
    pub clock: Arc<FixedClock>,
    pub reservations: ReservationEngine,
    pub lifecycle: OrderLifecycleManager,
}

pub async fn harness(stock: i32, price: Decimal) -> Harness {
    let now = Utc::now();
    let store = MemoryStore::new();
    store
        .insert_ticket_type(on_sale_ticket_type(now, stock, price))
        .await
        .unwrap();

    let clock = Arc::new(FixedClock::new(now));
    let settings = EngineSettings::default();
    Harness {
        reservations: ReservationEngine::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            clock.clone(),
            settings,
        ),
        lifecycle: OrderLifecycleManager::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            clock.clone(),
            settings,
        ),
        store,
        clock,
    }
}
