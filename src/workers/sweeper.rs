//! Expiry Sweeper (§4.6): a timer-driven background task that reclaims
//! reservations whose TTL has elapsed. It shares no state with request
//! tasks beyond the backing stores, reuses the Reservation Service's
//! `release` path rather than touching stock directly (§3 Ownership),
//! and is safe to run as multiple concurrent replicas because `release`
//! is idempotent (§9 Open Question #6).

use chrono::Utc;
use serde_json::json;
use tokio::time::{interval, Duration};

use crate::model::audit::AuditEventType;
use crate::repository::audit_repository::AuditRepository;
use crate::state::AppState;

/// Runs forever, ticking every `EXPIRY_CHECK_INTERVAL_SECONDS`. Intended
/// to be spawned once at startup with `tokio::spawn`.
pub async fn run(state: AppState) {
    let audit = AuditRepository::new(state.db.clone());
    let mut ticker = interval(Duration::from_secs(state.settings.expiry_check_interval_seconds));

    loop {
        ticker.tick().await;
        tick(&state, &audit).await;
    }
}

/// Runs a single sweep pass directly, without the `run` loop's timer.
/// Used by integration tests to drive the sweeper deterministically
/// (§8 scenario S5) instead of waiting out `EXPIRY_CHECK_INTERVAL_SECONDS`.
pub async fn run_once(state: &AppState) {
    let audit = AuditRepository::new(state.db.clone());
    tick(state, &audit).await;
}

async fn tick(state: &AppState, audit: &AuditRepository) {
    let now = Utc::now().timestamp();
    let due = match state.reservation_service.due_reservations(now).await {
        Ok(ids) => ids,
        Err(err) => {
            tracing::error!(error = %err, "sweeper: failed to scan expiry index");
            return;
        }
    };

    for reservation_id in due {
        // Step 2: errors (and already-released entries) per id are
        // logged/skipped and never abort the tick (§4.6 step 3).
        match state.reservation_service.release(&reservation_id).await {
            Ok(Some(reservation)) => {
                if let Err(err) = audit
                    .append(
                        AuditEventType::Expire,
                        &reservation.user_id,
                        &reservation.sku,
                        &reservation_id,
                        json!({
                            "quantity": reservation.quantity,
                            "created_at": reservation.created_at,
                            "expired_at": now,
                        }),
                    )
                    .await
                {
                    tracing::error!(reservation_id, error = %err, "sweeper: failed to append expire audit event");
                }
                tracing::info!(reservation_id, sku = %reservation.sku, quantity = reservation.quantity, "reservation expired");
                state.broadcast_availability(&reservation.sku).await;
            }
            Ok(None) => {
                // A concurrent consume/cancel/sweeper replica already
                // popped this id; nothing left to do.
            }
            Err(err) => {
                tracing::error!(reservation_id, error = %err, "sweeper: failed to release due reservation");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // The sweeper's only non-trivial logic (snapshot due ids, release,
    // audit, broadcast) requires a real Redis/Postgres backing store to
    // exercise meaningfully; see tests/sweeper.rs for the integration
    // coverage of scenario S5 (expiry restores stock), gated on
    // TEST_DATABASE_URL/TEST_REDIS_URL per §10.
}
