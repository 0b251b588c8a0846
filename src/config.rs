use std::env;

use rust_decimal::Decimal;

/// Typed settings loaded once at startup from the environment. Required
/// values fail startup immediately; everything else falls back to the
/// defaults used throughout the reservation core.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_expiry_minutes: i64,
    pub reservation_ttl_seconds: u64,
    pub min_quantity_per_reserve: i32,
    pub max_quantity_per_reserve: i32,
    pub rate_limit_per_minute: u32,
    pub rate_limit_per_ip_minute: u32,
    pub idempotency_cache_ttl_seconds: u64,
    pub expiry_check_interval_seconds: u64,
    pub confirm_grace_seconds: i64,
    /// Flat per-unit price used by the in-process `PriceCatalog` port
    /// (§10 of the design notes) since pricing/catalog is an external
    /// collaborator the core does not own.
    pub default_unit_price: Decimal,
}

impl Settings {
    /// Reads settings from the process environment. Panics with a clear
    /// message if a required variable is missing, mirroring the
    /// fail-fast startup behaviour the rest of this codebase uses for
    /// `DATABASE_URL`.
    pub fn from_env() -> Self {
        let database_url =
            env::var("DATABASE_URL").expect("Expected the DATABASE_URL environment variable");
        let redis_url =
            env::var("REDIS_URL").expect("Expected the REDIS_URL environment variable");
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using default (not secure for production)");
            "change_me_in_production".to_string()
        });

        Self {
            port: env_parse("PORT", 3000),
            database_url,
            redis_url,
            jwt_secret,
            jwt_expiry_minutes: env_parse("JWT_EXPIRY_MINUTES", 15),
            reservation_ttl_seconds: env_parse("RESERVATION_TTL_SECONDS", 300),
            min_quantity_per_reserve: env_parse("MIN_QUANTITY_PER_RESERVE", 1),
            max_quantity_per_reserve: env_parse("MAX_QUANTITY_PER_RESERVE", 5),
            rate_limit_per_minute: env_parse("RATE_LIMIT_PER_MINUTE", 10),
            rate_limit_per_ip_minute: env_parse("RATE_LIMIT_PER_IP_MINUTE", 100),
            idempotency_cache_ttl_seconds: env_parse("IDEMPOTENCY_CACHE_TTL_SECONDS", 310),
            expiry_check_interval_seconds: env_parse("EXPIRY_CHECK_INTERVAL_SECONDS", 10),
            confirm_grace_seconds: env_parse("CONFIRM_GRACE_SECONDS", 5),
            default_unit_price: env::var("DEFAULT_UNIT_PRICE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(Decimal::new(1999, 2)),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
