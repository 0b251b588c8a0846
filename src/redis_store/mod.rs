//! Atomic key-value primitives backing the stock store, reservation
//! ledger, idempotency cache and rate limiter (§4.1-§4.5, §5, §10). Every
//! compare-then-write sequence here runs as a single Redis Lua script so
//! no interleaving across concurrent tasks can observe or produce an
//! inconsistent state — the keystone atomicity the rest of the core
//! builds on.

pub mod idempotency;
pub mod ledger;
pub mod rate_limit;
pub mod stock;

pub use idempotency::{IdempotencyCache, IdempotencyRecord};
pub use ledger::{LedgerError, ReservationLedger};
pub use rate_limit::{RateLimitOutcome, RateLimiter};
pub use stock::{DecrementOutcome, StockStore};

use redis::aio::ConnectionManager;

/// Connects to Redis and returns a cheaply-cloneable connection manager
/// shared by all four components above.
pub async fn connect(redis_url: &str) -> redis::RedisResult<ConnectionManager> {
    let client = redis::Client::open(redis_url)?;
    ConnectionManager::new(client).await
}
