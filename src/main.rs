use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Settings;
use crate::redis_store::{IdempotencyCache, RateLimiter, ReservationLedger, StockStore};
use crate::repository::{AuditRepository, OrderRepository, UserRepository};
use crate::services::auth_service::AuthService;
use crate::services::broadcaster::AvailabilityBroadcaster;
use crate::services::order_promoter::OrderPromoter;
use crate::services::price_catalog::{FlatPriceCatalog, PriceCatalog};
use crate::services::reservation_service::ReservationService;
use crate::state::AppState;

mod config;
mod dtos;
mod errors;
mod middleware;
mod model;
mod openapi;
mod redis_store;
mod repository;
mod routes;
mod services;
mod sku;
mod state;
mod workers;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "holdfast_backend=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Arc::new(Settings::from_env());

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&settings.database_url)
        .await
        .expect("cannot connect to database");

    tracing::info!("running database migrations...");
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("database migrations completed");

    let redis_conn = redis_store::connect(&settings.redis_url)
        .await
        .expect("cannot connect to redis");

    let stock = StockStore::new(redis_conn.clone());
    let ledger = ReservationLedger::new(redis_conn.clone());
    let idempotency = IdempotencyCache::new(redis_conn.clone());
    let rate_limiter = RateLimiter::new(redis_conn.clone());

    let reservation_service = ReservationService::new(stock, ledger, idempotency, settings.clone());

    let orders = OrderRepository::new(pool.clone());
    let audit = AuditRepository::new(pool.clone());
    let audit_for_state = AuditRepository::new(pool.clone());
    let users = UserRepository::new(pool.clone());
    let price_catalog: Arc<dyn PriceCatalog> = Arc::new(FlatPriceCatalog::new(settings.default_unit_price));

    let order_promoter = OrderPromoter::new(reservation_service.clone(), orders, audit, price_catalog);
    let auth_service = AuthService::new(
        users,
        settings.jwt_secret.clone(),
        settings.jwt_expiry_minutes,
    );
    let broadcaster = AvailabilityBroadcaster::new();

    let state = AppState {
        db: pool,
        settings: settings.clone(),
        reservation_service,
        order_promoter,
        auth_service,
        broadcaster,
        rate_limiter,
        audit: audit_for_state,
    };

    tracing::info!(
        interval_seconds = settings.expiry_check_interval_seconds,
        "starting expiry sweeper"
    );
    tokio::spawn(workers::sweeper::run(state.clone()));

    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any); // Configure this properly for production

    let server_address = format!("0.0.0.0:{}", settings.port);
    let listener = TcpListener::bind(&server_address).await?;
    tracing::info!("server listening on {}", server_address);

    let router = routes::build_route(state)
        .layer(axum::middleware::from_fn(
            middleware::request_context::request_context,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
