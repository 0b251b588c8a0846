use std::env;
use std::sync::Arc;

use axum::Router;
use axum_test::{TestServer, TestServerConfig, Transport};
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;

use holdfast_backend::config::Settings;
use holdfast_backend::dtos::Claims;
use holdfast_backend::redis_store::{self, IdempotencyCache, RateLimiter, ReservationLedger, StockStore};
use holdfast_backend::repository::{AuditRepository, OrderRepository, UserRepository};
use holdfast_backend::routes;
use holdfast_backend::services::auth_service::AuthService;
use holdfast_backend::services::broadcaster::AvailabilityBroadcaster;
use holdfast_backend::services::order_promoter::OrderPromoter;
use holdfast_backend::services::price_catalog::{FlatPriceCatalog, PriceCatalog};
use holdfast_backend::services::reservation_service::ReservationService;
use holdfast_backend::state::AppState;

pub const TEST_JWT_SECRET: &str = "test_secret";

fn test_settings(database_url: String, redis_url: String) -> Settings {
    Settings {
        port: 0,
        database_url,
        redis_url,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        jwt_expiry_minutes: 15,
        reservation_ttl_seconds: 300,
        min_quantity_per_reserve: 1,
        max_quantity_per_reserve: 5,
        rate_limit_per_minute: 10,
        rate_limit_per_ip_minute: 100,
        idempotency_cache_ttl_seconds: 310,
        expiry_check_interval_seconds: 10,
        confirm_grace_seconds: 5,
        default_unit_price: Decimal::new(1999, 2),
    }
}

/// Builds a full `AppState` against real Postgres/Redis instances, gated
/// on `TEST_DATABASE_URL`/`TEST_REDIS_URL`. Returns `None` (with a
/// diagnostic on stderr) when either is absent, so database-backed tests
/// skip cleanly instead of failing in environments with no backing
/// stores available (§10 Test tooling).
pub async fn test_state_db() -> Option<AppState> {
    test_state_db_with(|_| {}).await
}

/// Like [`test_state_db`] but lets a test tweak the generated `Settings`
/// before they're wired into the service layer — used by the expiry
/// scenario (S5) to shrink `reservation_ttl_seconds` down to something a
/// test can wait out.
pub async fn test_state_db_with(configure: impl FnOnce(&mut Settings)) -> Option<AppState> {
    let database_url = match env::var("TEST_DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("skipping: TEST_DATABASE_URL not set");
            return None;
        }
    };
    let redis_url = match env::var("TEST_REDIS_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("skipping: TEST_REDIS_URL not set");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .map_err(|e| eprintln!("skipping: failed to connect to TEST_DATABASE_URL: {e}"))
        .ok()?;

    if env::var("TEST_RUN_MIGRATIONS").unwrap_or_else(|_| "1".to_string()) == "1" {
        if let Err(e) = sqlx::migrate!().run(&pool).await {
            eprintln!("skipping: failed to run migrations: {e}");
            return None;
        }
    }

    let redis_conn = redis_store::connect(&redis_url)
        .await
        .map_err(|e| eprintln!("skipping: failed to connect to TEST_REDIS_URL: {e}"))
        .ok()?;

    let mut settings = test_settings(database_url, redis_url);
    configure(&mut settings);
    let settings = Arc::new(settings);

    let stock = StockStore::new(redis_conn.clone());
    let ledger = ReservationLedger::new(redis_conn.clone());
    let idempotency = IdempotencyCache::new(redis_conn.clone());
    let rate_limiter = RateLimiter::new(redis_conn);

    let reservation_service = ReservationService::new(stock, ledger, idempotency, settings.clone());

    let orders = OrderRepository::new(pool.clone());
    let audit = AuditRepository::new(pool.clone());
    let audit_for_state = AuditRepository::new(pool.clone());
    let users = UserRepository::new(pool.clone());
    let price_catalog: Arc<dyn PriceCatalog> = Arc::new(FlatPriceCatalog::new(settings.default_unit_price));

    let order_promoter = OrderPromoter::new(reservation_service.clone(), orders, audit, price_catalog);
    let auth_service = AuthService::new(users, settings.jwt_secret.clone(), settings.jwt_expiry_minutes);
    let broadcaster = AvailabilityBroadcaster::new();

    Some(AppState {
        db: pool,
        settings,
        reservation_service,
        order_promoter,
        auth_service,
        broadcaster,
        rate_limiter,
        audit: audit_for_state,
    })
}

pub async fn app_with_state(state: AppState) -> Router {
    routes::build_route(state)
}

/// Runs the router over a real bound port rather than axum-test's default
/// in-process mock transport, so `ConnectInfo<SocketAddr>` (used by the
/// auth routes' per-IP rate limit) resolves the same way it does behind
/// `into_make_service_with_connect_info` in `main`.
pub async fn test_server(state: AppState) -> TestServer {
    let app = app_with_state(state).await;
    let config = TestServerConfig {
        transport: Some(Transport::HttpRandomPort),
        ..TestServerConfig::default()
    };
    TestServer::new_with_config(app, config).expect("failed to start test server")
}

/// Mints a bearer token for `user_id`, signed with the same secret the
/// test `AppState` is configured with, so `AuthUser` extraction succeeds
/// against handlers under test without going through `/auth/login`.
pub fn jwt_for(user_id: &str) -> String {
    let now = chrono_like_now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + 15 * 60,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("failed to mint test jwt")
}

fn chrono_like_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

#[derive(Debug, Serialize)]
pub struct ReserveBody<'a> {
    pub sku: &'a str,
    pub quantity: i32,
}
