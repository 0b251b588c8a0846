use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError, Script};
use thiserror::Error;

use crate::model::reservation::Reservation;

const RESERVATIONS_ZSET: &str = "expiring_reservations";

fn reservation_key(id: &str) -> String {
    format!("reservation:{id}")
}

/// Failure modes of a ledger pop that checks ownership and/or expiry.
/// These are raised by the backing scripts as Redis error replies
/// (`NOTFOUND` / `WRONGOWNER` / `EXPIRED`) and translated back here so the
/// rest of the service layer never has to pattern-match on raw script
/// output.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("reservation not found")]
    NotFound,
    #[error("reservation expired")]
    Expired,
    #[error("wrong owner")]
    WrongOwner,
    #[error("ledger error: {0}")]
    Redis(#[from] RedisError),
}

fn classify(err: RedisError) -> LedgerError {
    let msg = err.to_string();
    if msg.contains("NOTFOUND") {
        LedgerError::NotFound
    } else if msg.contains("WRONGOWNER") {
        LedgerError::WrongOwner
    } else if msg.contains("EXPIRED") {
        LedgerError::Expired
    } else {
        LedgerError::Redis(err)
    }
}

// KEYS[1] = reservation:<id>, KEYS[2] = expiring_reservations
// ARGV[1] = expected_user_id, ARGV[2] = now, ARGV[3] = grace_seconds, ARGV[4] = id
const CONSUME_SCRIPT: &str = r#"
local blob = redis.call('GET', KEYS[1])
if not blob then
    return redis.error_reply('NOTFOUND')
end
local res = cjson.decode(blob)
if res.user_id ~= ARGV[1] then
    return redis.error_reply('WRONGOWNER')
end
if tonumber(ARGV[2]) > (tonumber(res.expires_at) + tonumber(ARGV[3])) then
    return redis.error_reply('EXPIRED')
end
redis.call('DEL', KEYS[1])
redis.call('ZREM', KEYS[2], ARGV[4])
return blob
"#;

// KEYS[1] = reservation:<id>, KEYS[2] = expiring_reservations
// ARGV[1] = expected_user_id, ARGV[2] = id
const CANCEL_POP_SCRIPT: &str = r#"
local blob = redis.call('GET', KEYS[1])
if not blob then
    return redis.error_reply('NOTFOUND')
end
local res = cjson.decode(blob)
if res.user_id ~= ARGV[1] then
    return redis.error_reply('WRONGOWNER')
end
redis.call('DEL', KEYS[1])
redis.call('ZREM', KEYS[2], ARGV[2])
return blob
"#;

// KEYS[1] = reservation:<id>, KEYS[2] = expiring_reservations, ARGV[1] = id
const TAKE_SCRIPT: &str = r#"
local blob = redis.call('GET', KEYS[1])
if not blob then
    return false
end
redis.call('DEL', KEYS[1])
redis.call('ZREM', KEYS[2], ARGV[1])
return blob
"#;

/// The reservation map plus its time-ordered expiry index (§4.2). Both
/// collections live in the same Redis keyspace and are always mutated
/// together through the scripts above, so blob and index entry never
/// diverge.
#[derive(Clone)]
pub struct ReservationLedger {
    conn: ConnectionManager,
}

impl ReservationLedger {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, reservation: &Reservation) -> redis::RedisResult<()> {
        let blob = serde_json::to_string(reservation)
            .expect("Reservation always serializes to JSON");
        let mut conn = self.conn.clone();
        conn.set(reservation_key(&reservation.reservation_id), &blob)
            .await?;
        conn.zadd(
            RESERVATIONS_ZSET,
            &reservation.reservation_id,
            reservation.expires_at as f64,
        )
        .await
    }

    pub async fn lookup(&self, id: &str) -> redis::RedisResult<Option<Reservation>> {
        let blob: Option<String> = self.conn.clone().get(reservation_key(id)).await?;
        Ok(blob.map(|b| serde_json::from_str(&b).expect("ledger blob is always valid JSON")))
    }

    /// Validates ownership and non-expiry (under `grace_seconds`), then
    /// atomically removes both the blob and the index entry. Used by
    /// confirm.
    pub async fn consume(
        &self,
        id: &str,
        expected_user_id: &str,
        now: i64,
        grace_seconds: i64,
    ) -> Result<Reservation, LedgerError> {
        let script = Script::new(CONSUME_SCRIPT);
        let blob: String = script
            .key(reservation_key(id))
            .key(RESERVATIONS_ZSET)
            .arg(expected_user_id)
            .arg(now)
            .arg(grace_seconds)
            .arg(id)
            .invoke_async(&mut self.conn.clone())
            .await
            .map_err(classify)?;
        Ok(serde_json::from_str(&blob).expect("ledger blob is always valid JSON"))
    }

    /// Like [`Self::consume`] but without the expiry/grace check. Used by
    /// the owner-initiated cancel path.
    pub async fn cancel_pop(
        &self,
        id: &str,
        expected_user_id: &str,
    ) -> Result<Reservation, LedgerError> {
        let script = Script::new(CANCEL_POP_SCRIPT);
        let blob: String = script
            .key(reservation_key(id))
            .key(RESERVATIONS_ZSET)
            .arg(expected_user_id)
            .arg(id)
            .invoke_async(&mut self.conn.clone())
            .await
            .map_err(classify)?;
        Ok(serde_json::from_str(&blob).expect("ledger blob is always valid JSON"))
    }

    /// Unconditional atomic pop with no ownership or expiry check. A
    /// second racing caller observes `None` and does nothing further —
    /// this is what makes release idempotent under concurrent sweepers.
    pub async fn take(&self, id: &str) -> redis::RedisResult<Option<Reservation>> {
        let script = Script::new(TAKE_SCRIPT);
        let blob: Option<String> = script
            .key(reservation_key(id))
            .key(RESERVATIONS_ZSET)
            .arg(id)
            .invoke_async(&mut self.conn.clone())
            .await?;
        Ok(blob.map(|b| serde_json::from_str(&b).expect("ledger blob is always valid JSON")))
    }

    /// Ids whose expiry score is `<= now`. Advisory: a concurrent consume
    /// may have already removed the entry by the time the caller acts on
    /// it.
    pub async fn range_due(&self, now: i64) -> redis::RedisResult<Vec<String>> {
        self.conn
            .clone()
            .zrangebyscore(RESERVATIONS_ZSET, 0, now)
            .await
    }

    /// Idempotent removal of both the blob and the index entry.
    pub async fn remove(&self, id: &str) -> redis::RedisResult<()> {
        self.take(id).await.map(|_| ())
    }
}
