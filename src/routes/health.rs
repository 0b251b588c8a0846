use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

pub fn build_route() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponseDto {
    pub status: &'static str,
    pub version: &'static str,
    pub redis: &'static str,
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Liveness and Redis connectivity", body = HealthResponseDto)),
    tag = "Health"
)]
async fn health(State(state): State<AppState>) -> Json<HealthResponseDto> {
    let redis = match state.stock().ping().await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::warn!(error = %err, "health check: redis ping failed");
            "unreachable"
        }
    };

    Json(HealthResponseDto {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        redis,
    })
}
