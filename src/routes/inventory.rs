use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use serde_json::json;

use crate::dtos::{InitializeQuery, InventoryStatusResponseDto, ReserveRequestDto, ReserveResponseDto};
use crate::errors::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::validation::ValidatedJson;
use crate::model::audit::AuditEventType;
use crate::redis_store::RateLimitOutcome;
use crate::services::broadcaster::{AvailabilityEventKind, AvailabilityMessage};
use crate::sku;
use crate::state::AppState;

pub fn build_route() -> Router<AppState> {
    Router::new()
        .route("/reserve", post(reserve))
        .route("/{sku}", get(get_status))
        .route("/{sku}/initialize", post(initialize))
        .route("/ws/{sku}", get(ws_subscribe))
}

fn normalize_sku_or_400(raw: &str) -> AppResult<String> {
    sku::normalize(raw).ok_or_else(|| AppError::Validation(format!("invalid sku: {raw}")))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{sku}",
    params(("sku" = String, Path, description = "Stock-keeping unit")),
    responses((status = 200, description = "Current availability", body = InventoryStatusResponseDto)),
    tag = "Inventory"
)]
async fn get_status(
    State(state): State<AppState>,
    Path(raw_sku): Path<String>,
) -> AppResult<impl IntoResponse> {
    let sku = normalize_sku_or_400(&raw_sku)?;
    let status = state
        .reservation_service
        .get_inventory_status(&sku)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(InventoryStatusResponseDto {
        sku,
        available: status.available,
        reserved: status.reserved,
        total: status.total,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/{sku}/initialize",
    params(
        ("sku" = String, Path, description = "Stock-keeping unit"),
        InitializeQuery,
    ),
    responses((status = 201, description = "Inventory (re)initialized")),
    tag = "Inventory"
)]
async fn initialize(
    State(state): State<AppState>,
    Path(raw_sku): Path<String>,
    Query(query): Query<InitializeQuery>,
) -> AppResult<impl IntoResponse> {
    let sku = normalize_sku_or_400(&raw_sku)?;
    state
        .reservation_service
        .set_inventory(&sku, query.quantity)
        .await
        .map_err(AppError::Internal)?;

    // §9 Open Question #2: recompute the broadcast snapshot from
    // authoritative state rather than echoing the request quantity, so
    // outstanding reservations against the old value are reflected.
    state.broadcast_availability(&sku).await;

    Ok(StatusCode::CREATED)
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/reserve",
    request_body = ReserveRequestDto,
    responses(
        (status = 201, description = "Reservation created", body = ReserveResponseDto),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Insufficient inventory"),
        (status = 429, description = "Rate limited"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
async fn reserve(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    headers: HeaderMap,
    ValidatedJson(dto): ValidatedJson<ReserveRequestDto>,
) -> AppResult<impl IntoResponse> {
    // The rate limiter runs before the idempotency cache and before any
    // stock mutation (§4.5, §4.3 step 1).
    let outcome = state
        .rate_limiter
        .check_principal(
            &user_id,
            "inventory.reserve",
            state.settings.rate_limit_per_minute,
            60,
        )
        .await
        .map_err(AppError::Cache)?;
    if let RateLimitOutcome::Limited { retry_after } = outcome {
        tracing::warn!(user_id, retry_after, "reserve rate limited");
        return Err(AppError::RateLimited { retry_after });
    }

    let sku = normalize_sku_or_400(&dto.sku)?;
    let idempotency_key = headers
        .get("x-idempotency-key")
        .and_then(|v| v.to_str().ok());

    let outcome = state
        .reservation_service
        .reserve(&sku, dto.quantity, &user_id, idempotency_key)
        .await?;

    if let Err(err) = state
        .audit
        .append(
            AuditEventType::Reserve,
            &user_id,
            &sku,
            &outcome.reservation_id,
            json!({ "quantity": dto.quantity, "expires_at": outcome.expires_at }),
        )
        .await
    {
        tracing::error!(reservation_id = %outcome.reservation_id, error = %err, "failed to append reserve audit event");
    }

    state.broadcast_availability(&sku).await;

    Ok((
        StatusCode::CREATED,
        Json(ReserveResponseDto {
            reservation_id: outcome.reservation_id,
            sku,
            quantity: dto.quantity,
            expires_at: outcome.expires_at,
            ttl_seconds: state.settings.reservation_ttl_seconds,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/ws/{sku}",
    params(("sku" = String, Path, description = "Stock-keeping unit")),
    responses((status = 101, description = "Upgraded to a WebSocket availability stream")),
    tag = "Inventory"
)]
async fn ws_subscribe(
    State(state): State<AppState>,
    Path(raw_sku): Path<String>,
    ws: WebSocketUpgrade,
) -> AppResult<impl IntoResponse> {
    let sku = normalize_sku_or_400(&raw_sku)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(state, sku, socket)))
}

/// Subscribes to [`crate::services::broadcaster::AvailabilityBroadcaster`]
/// for `sku`, sends an `initial` snapshot recomputed from authoritative
/// state, then forwards every subsequent `update` until the socket
/// closes or a send fails (§4.8: delivery is best-effort, no retention).
async fn handle_socket(state: AppState, sku: String, mut socket: WebSocket) {
    let mut rx = state.broadcaster.subscribe(&sku);

    let initial = match state.reservation_service.get_inventory_status(&sku).await {
        Ok(status) => AvailabilityMessage {
            kind: AvailabilityEventKind::Initial,
            sku: sku.clone(),
            available: status.available,
            total: status.total,
        },
        Err(err) => {
            tracing::warn!(sku, error = %err, "ws subscribe: failed to compute initial snapshot");
            return;
        }
    };

    if send_availability(&mut socket, &initial).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            message = rx.recv() => {
                match message {
                    Ok(msg) if msg.sku == sku => {
                        if send_availability(&mut socket, &msg).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => break,
                }
            }
        }
    }
}

async fn send_availability(socket: &mut WebSocket, message: &AvailabilityMessage) -> Result<(), ()> {
    let text = serde_json::to_string(message).map_err(|_| ())?;
    socket.send(Message::Text(text.into())).await.map_err(|_| ())
}
