pub mod auth;
pub mod checkout;
pub mod health;
pub mod inventory;

use axum::Router;
use utoipa::OpenApi as _;
use utoipa_swagger_ui::SwaggerUi;

use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Assembles the full HTTP surface (§6): versioned API routes nested
/// under `/api/v1`, plus the unversioned `/health` probe and the Swagger
/// UI. `main` layers request-context, tracing and CORS middleware around
/// whatever this returns.
pub fn build_route(state: AppState) -> Router {
    let api_v1 = Router::new()
        .nest("/auth", auth::build_route())
        .nest("/inventory", inventory::build_route())
        .nest("/checkout", checkout::build_route());

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(health::build_route())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}
