use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use std::net::SocketAddr;

use crate::dtos::{LoginDto, RegisterDto, TokenResponseDto, UserResponseDto};
use crate::errors::{AppError, AppResult};
use crate::middleware::validation::ValidatedJson;
use crate::redis_store::RateLimitOutcome;
use crate::state::AppState;

pub fn build_route() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Coarser per-IP rate limit guarding the unauthenticated endpoints
/// (§3 Rate-limit bucket, §5): no verified principal exists yet at this
/// point in the request.
async fn check_ip_rate_limit(state: &AppState, addr: &SocketAddr, endpoint: &str) -> AppResult<()> {
    let outcome = state
        .rate_limiter
        .check_ip(&addr.ip().to_string(), state.settings.rate_limit_per_ip_minute, 60)
        .await
        .map_err(AppError::Cache)?;
    match outcome {
        RateLimitOutcome::Allowed => Ok(()),
        RateLimitOutcome::Limited { retry_after } => {
            tracing::warn!(endpoint, %addr, retry_after, "auth endpoint rate limited");
            Err(AppError::RateLimited { retry_after })
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterDto,
    responses(
        (status = 201, description = "User created", body = UserResponseDto),
        (status = 400, description = "Validation error"),
        (status = 409, description = "User already exists"),
        (status = 429, description = "Rate limited"),
    ),
    tag = "Authentication"
)]
async fn register(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ValidatedJson(dto): ValidatedJson<RegisterDto>,
) -> AppResult<impl IntoResponse> {
    check_ip_rate_limit(&state, &addr, "auth.register").await?;
    let user = state.auth_service.register(dto).await?;
    Ok((StatusCode::CREATED, Json(UserResponseDto::from(user))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginDto,
    responses(
        (status = 200, description = "Login successful", body = TokenResponseDto),
        (status = 401, description = "Invalid credentials"),
        (status = 400, description = "Validation error"),
        (status = 429, description = "Rate limited"),
    ),
    tag = "Authentication"
)]
async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ValidatedJson(dto): ValidatedJson<LoginDto>,
) -> AppResult<impl IntoResponse> {
    check_ip_rate_limit(&state, &addr, "auth.login").await?;
    let token = state.auth_service.login(dto).await?;
    Ok((
        StatusCode::OK,
        Json(TokenResponseDto::new(token, state.settings.jwt_expiry_minutes)),
    ))
}
