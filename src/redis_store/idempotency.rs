use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

fn idempotency_key(key: &str) -> String {
    format!("idempotency:{key}")
}

/// The exact response payload recorded against a client-supplied
/// idempotency key, so a replayed request returns the original
/// reservation verbatim instead of re-running the decrement (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub reservation_id: String,
    pub sku: String,
    pub quantity: i64,
    pub expires_at: i64,
}

#[derive(Clone)]
pub struct IdempotencyCache {
    conn: ConnectionManager,
}

impl IdempotencyCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn get(&self, key: &str) -> redis::RedisResult<Option<IdempotencyRecord>> {
        let blob: Option<String> = self.conn.clone().get(idempotency_key(key)).await?;
        Ok(blob.map(|b| serde_json::from_str(&b).expect("idempotency blob is always valid JSON")))
    }

    /// Records `record` under `key` with the idempotency TTL, which must
    /// exceed the reservation TTL by a margin so a retry arriving near
    /// end-of-life still resolves (§4.4).
    pub async fn put(
        &self,
        key: &str,
        record: &IdempotencyRecord,
        ttl_seconds: u64,
    ) -> redis::RedisResult<()> {
        let blob = serde_json::to_string(record).expect("IdempotencyRecord always serializes");
        self.conn
            .clone()
            .set_ex(idempotency_key(key), blob, ttl_seconds)
            .await
    }
}
