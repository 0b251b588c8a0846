use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::dtos::{CancelRequestDto, CancelResponseDto, ConfirmRequestDto, ConfirmResponseDto, OrderResponseDto};
use crate::errors::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::validation::ValidatedJson;
use crate::model::audit::AuditEventType;
use crate::state::AppState;

pub fn build_route() -> Router<AppState> {
    Router::new()
        .route("/confirm", post(confirm))
        .route("/cancel", post(cancel))
        .route("/orders/{order_id}", get(get_order))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/confirm",
    request_body = ConfirmRequestDto,
    responses(
        (status = 200, description = "Order confirmed", body = ConfirmResponseDto),
        (status = 403, description = "Wrong owner"),
        (status = 404, description = "Reservation not found or expired"),
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
async fn confirm(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidatedJson(dto): ValidatedJson<ConfirmRequestDto>,
) -> AppResult<impl IntoResponse> {
    let order = state
        .order_promoter
        .confirm_checkout(&dto.reservation_id, &user_id)
        .await?;

    // The units were already deducted from `available` at reserve time
    // and confirm never restores them; the reserved-sum counter moves
    // from "reserved" to "sold" though, so subscribers still see it.
    if let Some(item) = order.items.first() {
        state.broadcast_availability(&item.sku).await;
    }

    Ok((StatusCode::OK, Json(ConfirmResponseDto::from(order))))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/cancel",
    request_body = CancelRequestDto,
    responses(
        (status = 200, description = "Reservation cancelled", body = CancelResponseDto),
        (status = 403, description = "Wrong owner"),
        (status = 404, description = "Reservation not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
async fn cancel(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidatedJson(dto): ValidatedJson<CancelRequestDto>,
) -> AppResult<impl IntoResponse> {
    // cancel needs the reservation's sku to broadcast afterwards, so look
    // it up before popping it.
    let sku = state
        .reservation_service
        .lookup(&dto.reservation_id)
        .await
        .map_err(AppError::Internal)?
        .map(|r| r.sku);

    let existed = state
        .reservation_service
        .cancel(&dto.reservation_id, &user_id)
        .await?;

    if existed {
        if let Some(sku) = &sku {
            if let Err(err) = state
                .audit
                .append(
                    AuditEventType::Cancel,
                    &user_id,
                    sku,
                    &dto.reservation_id,
                    json!({}),
                )
                .await
            {
                tracing::error!(reservation_id = %dto.reservation_id, error = %err, "failed to append cancel audit event");
            }
            state.broadcast_availability(sku).await;
        }
        Ok(Json(CancelResponseDto {
            status: "cancelled".to_string(),
            message: "reservation cancelled".to_string(),
        }))
    } else {
        Err(AppError::ReservationNotFound)
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/checkout/orders/{order_id}",
    params(("order_id" = String, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with line items", body = OrderResponseDto),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
async fn get_order(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(order_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let order = state
        .order_promoter
        .orders()
        .get_with_items(&order_id)
        .await
        .map_err(AppError::Database)?
        .ok_or(AppError::OrderNotFound)?;

    Ok(Json(OrderResponseDto::from(order)))
}
