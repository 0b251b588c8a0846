use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Core error kinds, independent of the HTTP transport. Service-layer code
/// returns these; the web layer is the only place that knows how to turn
/// one into a response.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("insufficient inventory: {available} available")]
    InsufficientInventory { available: i64 },

    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("reservation not found")]
    ReservationNotFound,

    #[error("reservation expired")]
    ReservationExpired,

    #[error("order not found")]
    OrderNotFound,

    #[error("a user with that id already exists")]
    DuplicateUser,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// RFC 7807 problem-details body. `errors`/`available`/`retry_after` are
/// only populated for the error kinds they're relevant to.
#[derive(Debug, Serialize)]
struct ProblemDetails {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'static str,
    status: u16,
    detail: String,
    trace_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl AppError {
    fn problem_type(&self) -> &'static str {
        match self {
            AppError::InsufficientInventory { .. } => "https://holdfast.dev/errors/insufficient-inventory",
            AppError::RateLimited { .. } => "https://holdfast.dev/errors/rate-limited",
            AppError::Validation(_) => "https://holdfast.dev/errors/invalid-request",
            AppError::Unauthenticated => "https://holdfast.dev/errors/unauthenticated",
            AppError::Forbidden(_) => "https://holdfast.dev/errors/forbidden",
            AppError::ReservationNotFound => "https://holdfast.dev/errors/reservation-not-found",
            AppError::ReservationExpired => "https://holdfast.dev/errors/reservation-expired",
            AppError::OrderNotFound => "https://holdfast.dev/errors/order-not-found",
            AppError::DuplicateUser => "https://holdfast.dev/errors/duplicate-user",
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                "https://holdfast.dev/errors/internal"
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InsufficientInventory { .. } => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::ReservationNotFound | AppError::OrderNotFound => StatusCode::NOT_FOUND,
            AppError::ReservationExpired => StatusCode::NOT_FOUND,
            AppError::DuplicateUser => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn title(&self) -> &'static str {
        match self {
            AppError::InsufficientInventory { .. } => "Insufficient inventory",
            AppError::RateLimited { .. } => "Too many requests",
            AppError::Validation(_) => "Invalid request",
            AppError::Unauthenticated => "Unauthenticated",
            AppError::Forbidden(_) => "Forbidden",
            AppError::ReservationNotFound => "Reservation not found",
            AppError::ReservationExpired => "Reservation expired",
            AppError::OrderNotFound => "Order not found",
            AppError::DuplicateUser => "User already exists",
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                "Internal server error"
            }
        }
    }

    pub fn into_response_with_trace(self, trace_id: Uuid) -> Response {
        match &self {
            AppError::Database(err) => tracing::error!(%trace_id, "database error: {}", err),
            AppError::Cache(err) => tracing::error!(%trace_id, "cache error: {}", err),
            AppError::Internal(msg) => tracing::error!(%trace_id, "internal error: {}", msg),
            AppError::InsufficientInventory { available } => {
                tracing::warn!(%trace_id, available, "reserve rejected: insufficient inventory")
            }
            AppError::RateLimited { retry_after } => {
                tracing::warn!(%trace_id, retry_after, "request rate limited")
            }
            AppError::Forbidden(msg) => tracing::warn!(%trace_id, "forbidden: {}", msg),
            AppError::Validation(msg) => tracing::warn!(%trace_id, "validation failed: {}", msg),
            _ => tracing::info!(%trace_id, "{}", self),
        }

        let available = match &self {
            AppError::InsufficientInventory { available } => Some(*available),
            _ => None,
        };
        let retry_after = match &self {
            AppError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        };
        let errors = match &self {
            AppError::Validation(msg) => {
                Some(msg.split(", ").map(|s| s.to_string()).collect::<Vec<_>>())
            }
            _ => None,
        };

        let body = ProblemDetails {
            kind: self.problem_type(),
            title: self.title(),
            status: self.status().as_u16(),
            detail: self.to_string(),
            trace_id,
            errors,
            available,
            retry_after,
        };

        (self.status(), Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    /// Renders using the current request's trace id (set by
    /// [`crate::middleware::request_context`]), so the body's `trace_id`
    /// always matches the response's `X-Request-ID` header without every
    /// handler having to thread it through explicitly.
    fn into_response(self) -> Response {
        self.into_response_with_trace(crate::middleware::request_context::current_trace_id())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_inventory_maps_to_409_with_available() {
        let err = AppError::InsufficientInventory { available: 3 };
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn rate_limited_maps_to_429() {
        let err = AppError::RateLimited { retry_after: 12 };
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn reservation_expired_maps_to_404() {
        assert_eq!(AppError::ReservationExpired.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn forbidden_maps_to_403() {
        assert_eq!(
            AppError::Forbidden("wrong owner".into()).status(),
            StatusCode::FORBIDDEN
        );
    }
}
