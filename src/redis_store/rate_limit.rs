use redis::aio::ConnectionManager;
use redis::Script;

/// `KEYS[1]` = bucket key, `ARGV[1]` = cap, `ARGV[2]` = window seconds.
/// The whole get-or-create-then-compare-then-increment sequence runs as
/// one script so concurrent requests in the same window can't race past
/// the cap (§4.5); the fixed-window boundary-burst caveat from §9 is
/// accepted as documented behavior, not patched here.
const CHECK_AND_INCREMENT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[2])
end
if count > tonumber(ARGV[1]) then
    local ttl = redis.call('TTL', KEYS[1])
    if ttl < 0 then
        ttl = tonumber(ARGV[2])
    end
    return {0, ttl}
end
return {1, 0}
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOutcome {
    Allowed,
    Limited { retry_after: u64 },
}

/// Fixed-window per-(principal, endpoint) counter (§4.5).
#[derive(Clone)]
pub struct RateLimiter {
    conn: ConnectionManager,
}

impl RateLimiter {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn bucket_key(principal: &str, endpoint: &str) -> String {
        format!("ratelimit:{principal}:{endpoint}")
    }

    fn ip_bucket_key(addr: &str) -> String {
        format!("ratelimit:ip:{addr}")
    }

    async fn check(&self, key: String, cap: u32, window_seconds: u64) -> redis::RedisResult<RateLimitOutcome> {
        let script = Script::new(CHECK_AND_INCREMENT_SCRIPT);
        let (allowed, retry_after): (i64, i64) = script
            .key(key)
            .arg(cap)
            .arg(window_seconds)
            .invoke_async(&mut self.conn.clone())
            .await?;
        Ok(if allowed == 1 {
            RateLimitOutcome::Allowed
        } else {
            let retry_after = if retry_after <= 0 { window_seconds } else { retry_after as u64 };
            RateLimitOutcome::Limited { retry_after }
        })
    }

    /// Per-authenticated-principal cap on a given endpoint (e.g. reserve).
    pub async fn check_principal(
        &self,
        principal: &str,
        endpoint: &str,
        cap: u32,
        window_seconds: u64,
    ) -> redis::RedisResult<RateLimitOutcome> {
        self.check(Self::bucket_key(principal, endpoint), cap, window_seconds)
            .await
    }

    /// Coarser per-IP cap guarding the unauthenticated auth endpoints,
    /// since no verified principal exists yet at that point (§3).
    pub async fn check_ip(
        &self,
        addr: &str,
        cap: u32,
        window_seconds: u64,
    ) -> redis::RedisResult<RateLimitOutcome> {
        self.check(Self::ip_bucket_key(addr), cap, window_seconds).await
    }
}
