//! Per-request trace id and timing (§6 Headers, §7): every response
//! carries `X-Request-ID`/`X-Process-Time`, and every error body's
//! `trace_id` matches the request id header exactly. A `tokio::task_local`
//! threads the trace id down to [`crate::errors::AppError`]'s
//! `IntoResponse` impl without changing every handler's signature.

use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tokio::task_local;
use uuid::Uuid;

task_local! {
    static TRACE_ID: Uuid;
}

/// Returns the current request's trace id, or a fresh one if called
/// outside a request scope (e.g. from a test that doesn't go through
/// this middleware).
pub fn current_trace_id() -> Uuid {
    TRACE_ID.try_with(|id| *id).unwrap_or_else(|_| Uuid::new_v4())
}

pub async fn request_context(mut req: Request, next: Next) -> Response {
    let trace_id = Uuid::new_v4();
    let start = Instant::now();
    req.extensions_mut().insert(trace_id);

    let mut response = TRACE_ID.scope(trace_id, next.run(req)).await;

    if let Ok(header) = HeaderValue::from_str(&trace_id.to_string()) {
        response.headers_mut().insert("x-request-id", header);
    }
    let elapsed_secs = start.elapsed().as_secs_f64();
    if let Ok(header) = HeaderValue::from_str(&format!("{elapsed_secs:.6}")) {
        response.headers_mut().insert("x-process-time", header);
    }

    response
}
