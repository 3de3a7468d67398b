use std::sync::Arc;

use crate::clock::Clock;
use crate::engine::{EngineSettings, OrderLifecycleManager, ReservationEngine};
use crate::store::{InventoryStore, OrderStore};

/// Shared handler state. Cheap to clone; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub reservations: ReservationEngine,
    pub lifecycle: OrderLifecycleManager,
}

impl AppState {
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        orders: Arc<dyn OrderStore>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            reservations: ReservationEngine::new(
                inventory.clone(),
                orders.clone(),
                clock.clone(),
                settings,
            ),
            lifecycle: OrderLifecycleManager::new(inventory, orders, clock, settings),
        }
    }
}
