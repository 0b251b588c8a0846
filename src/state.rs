use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Settings;
use crate::redis_store::{RateLimiter, StockStore};
use crate::repository::AuditRepository;
use crate::services::auth_service::AuthService;
use crate::services::broadcaster::{AvailabilityBroadcaster, AvailabilityEventKind, AvailabilityMessage};
use crate::services::order_promoter::OrderPromoter;
use crate::services::reservation_service::ReservationService;

/// Shared handles every route handler is given through axum's `State`
/// extractor. Construction (wiring Redis/Postgres clients into the
/// service layer) happens once at startup in `main`; everything here is
/// cheaply cloneable so handlers and the Sweeper can each hold their own
/// copy (§9: "the core holds only the singleton broadcaster registry and
/// backing-store clients").
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub settings: Arc<Settings>,
    pub reservation_service: ReservationService,
    pub order_promoter: OrderPromoter,
    pub auth_service: AuthService,
    pub broadcaster: AvailabilityBroadcaster,
    pub rate_limiter: RateLimiter,
    pub audit: AuditRepository,
}

impl AppState {
    pub fn stock(&self) -> &StockStore {
        self.reservation_service.stock()
    }

    /// Recomputes the authoritative snapshot for `sku` and fans it out to
    /// subscribers. Broadcast failure is never surfaced to the caller
    /// (§4.8); callers invoke this best-effort after reserve/cancel/
    /// confirm/set_inventory.
    pub async fn broadcast_availability(&self, sku: &str) {
        match self.reservation_service.get_inventory_status(sku).await {
            Ok(status) => self.broadcaster.broadcast(AvailabilityMessage {
                kind: AvailabilityEventKind::Update,
                sku: sku.to_string(),
                available: status.available,
                total: status.total,
            }),
            Err(err) => {
                tracing::warn!(sku, error = %err, "failed to recompute availability for broadcast")
            }
        }
    }
}
