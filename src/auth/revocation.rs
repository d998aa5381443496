/// Token revocation denylist
///
/// Revoked token ids are stored with a TTL and purge themselves. Callers
/// treat any store failure as "cannot confirm not-revoked" and reject.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;

use crate::auth::jwt::TokenCodec;
use crate::configuration::RedisSettings;

pub const DEFAULT_REVOCATION_TTL_SECS: u64 = 360;

const REVOKED_MARKER: &str = "1";

#[derive(Debug, thiserror::Error)]
pub enum RevocationError {
    #[error("revocation store unreachable: {0}")]
    Unavailable(String),
    #[error("revocation store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("revocation ttl {ttl:?} is shorter than the token lifetime {lifetime:?}")]
    TtlTooShort { ttl: Duration, lifetime: Duration },
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `token_id` as revoked for the store's TTL. Revoking again only
    /// resets the TTL.
    async fn revoke(&self, token_id: &str) -> Result<(), RevocationError>;

    async fn is_revoked(&self, token_id: &str) -> Result<bool, RevocationError>;
}

/// Key format: `token:revoked:{jti}`
fn revocation_key(token_id: &str) -> String {
    format!("token:revoked:{}", token_id)
}

/// Redis-backed store: `SET key 1 EX ttl` / `GET key`
pub struct RedisRevocationStore {
    redis: ConnectionManager,
    ttl: Duration,
    timeout: Duration,
}

impl RedisRevocationStore {
    pub fn new(redis: ConnectionManager, ttl: Duration, timeout: Duration) -> Self {
        Self { redis, ttl, timeout }
    }

    pub async fn connect(settings: &RedisSettings) -> Result<Self, RevocationError> {
        let timeout = Duration::from_millis(settings.timeout_ms);
        let client = redis::Client::open(settings.url())
            .map_err(|e| RevocationError::Unavailable(e.to_string()))?;

        let manager = tokio::time::timeout(timeout, client.get_connection_manager())
            .await
            .map_err(|_| RevocationError::Timeout(timeout))?
            .map_err(|e| RevocationError::Unavailable(e.to_string()))?;

        Ok(Self::new(manager, Duration::from_secs(settings.revocation_ttl), timeout))
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, token_id: &str) -> Result<(), RevocationError> {
        let mut conn = self.redis.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(revocation_key(token_id))
            .arg(REVOKED_MARKER)
            .arg("EX")
            .arg(self.ttl.as_secs());

        tokio::time::timeout(self.timeout, cmd.query_async::<_, ()>(&mut conn))
            .await
            .map_err(|_| RevocationError::Timeout(self.timeout))?
            .map_err(|e| RevocationError::Unavailable(e.to_string()))?;

        tracing::info!(jti = %token_id, ttl = self.ttl.as_secs(), "Token added to revocation list");
        Ok(())
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, RevocationError> {
        let mut conn = self.redis.clone();
        let mut cmd = redis::cmd("GET");
        cmd.arg(revocation_key(token_id));

        let value = tokio::time::timeout(self.timeout, cmd.query_async::<_, Option<String>>(&mut conn))
            .await
            .map_err(|_| RevocationError::Timeout(self.timeout))?
            .map_err(|e| RevocationError::Unavailable(e.to_string()))?;

        Ok(value.is_some())
    }
}

/// In-process store with the same TTL semantics, for local runs and tests
pub struct InMemoryRevocationStore {
    entries: RwLock<HashMap<String, Instant>>,
    ttl: Duration,
}

impl InMemoryRevocationStore {
    /// # Errors
    /// `TtlTooShort` when `ttl` would let an entry lapse before a token of
    /// `longest_lifetime` expires
    pub fn new(ttl: Duration, longest_lifetime: Duration) -> Result<Self, RevocationError> {
        if ttl < longest_lifetime {
            return Err(RevocationError::TtlTooShort {
                ttl,
                lifetime: longest_lifetime,
            });
        }

        Ok(Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        })
    }

    /// Store whose TTL equals the longest lifetime `codec` issues.
    pub fn for_codec(codec: &TokenCodec) -> Self {
        let longest = codec
            .access_lifetime()
            .max(codec.refresh_lifetime())
            .to_std()
            .unwrap_or_default();

        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: longest,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, token_id: &str) -> Result<(), RevocationError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, expires_at| *expires_at > now);
        entries.insert(token_id.to_string(), now + self.ttl);
        Ok(())
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, RevocationError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(token_id)
            .map_or(false, |expires_at| *expires_at > Instant::now()))
    }
}
