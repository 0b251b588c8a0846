use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

/// Outcome of [`StockStore::try_decrement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecrementOutcome {
    Ok { new_available: i64 },
    Insufficient { available: i64 },
}

/// Per-SKU available-unit counter with an atomic check-and-decrement and an
/// atomic restore, backed by a Redis scripted compare-and-set so read then
/// write is indivisible across every concurrent caller (§4.1).
#[derive(Clone)]
pub struct StockStore {
    conn: ConnectionManager,
}

/// `KEYS[1]` = `inventory:<sku>`, `ARGV[1]` = quantity to decrement.
/// Returns `{1, new_available}` on success or `{0, available}` if short.
const TRY_DECREMENT_SCRIPT: &str = r#"
local cur = tonumber(redis.call('GET', KEYS[1]) or '0')
local n = tonumber(ARGV[1])
if cur >= n then
    local newval = cur - n
    redis.call('SET', KEYS[1], newval)
    return {1, newval}
else
    return {0, cur}
end
"#;

fn inventory_key(sku: &str) -> String {
    format!("inventory:{sku}")
}

fn reserved_key(sku: &str) -> String {
    format!("reserved:{sku}")
}

impl StockStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Atomic check-and-decrement. Never observes or produces a negative
    /// value: a short read leaves the stored value untouched.
    pub async fn try_decrement(&self, sku: &str, n: i64) -> redis::RedisResult<DecrementOutcome> {
        let script = Script::new(TRY_DECREMENT_SCRIPT);
        let (ok, value): (i64, i64) = script
            .key(inventory_key(sku))
            .arg(n)
            .invoke_async(&mut self.conn.clone())
            .await?;
        Ok(if ok == 1 {
            DecrementOutcome::Ok { new_available: value }
        } else {
            DecrementOutcome::Insufficient { available: value }
        })
    }

    /// Atomic increment; a missing key is treated as 0 beforehand. Never
    /// fails on a missing key.
    pub async fn restore(&self, sku: &str, n: i64) -> redis::RedisResult<i64> {
        self.conn.clone().incr(inventory_key(sku), n).await
    }

    /// Administrative override, not used on the hot path.
    pub async fn set(&self, sku: &str, n: i64) -> redis::RedisResult<()> {
        self.conn.clone().set(inventory_key(sku), n).await
    }

    /// Best-effort read; may lag concurrent mutations but is always >= 0.
    pub async fn get(&self, sku: &str) -> redis::RedisResult<i64> {
        let value: Option<i64> = self.conn.clone().get(inventory_key(sku)).await?;
        Ok(value.unwrap_or(0))
    }

    /// Advisory reserved-sum counter (§3); adjusts alongside `available`
    /// but is not part of the atomicity contract. `delta` may be negative.
    pub async fn incr_reserved(&self, sku: &str, delta: i64) -> redis::RedisResult<i64> {
        self.conn.clone().incr(reserved_key(sku), delta).await
    }

    pub async fn get_reserved(&self, sku: &str) -> redis::RedisResult<i64> {
        let value: Option<i64> = self.conn.clone().get(reserved_key(sku)).await?;
        Ok(value.unwrap_or(0))
    }

    /// Liveness probe for `/health` (§6): round-trips a `PING`.
    pub async fn ping(&self) -> redis::RedisResult<()> {
        redis::cmd("PING").query_async(&mut self.conn.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrement_outcome_variants_are_distinct() {
        assert_ne!(
            DecrementOutcome::Ok { new_available: 1 },
            DecrementOutcome::Insufficient { available: 1 }
        );
    }
}
