//! Server-side session management using Redis
//!
//! The client holds only an opaque token in an HttpOnly cookie; the
//! principal (user id and role) lives in Redis under a key with a TTL, so
//! expiry is enforced by Redis and an expired session simply resolves to no
//! principal.

use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use crate::models::Principal;
use common::cache::RedisPool;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "nagrik.sid";

/// Session store configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session time-to-live in seconds
    pub ttl_seconds: u64,
}

impl SessionConfig {
    /// Create a new SessionConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SESSION_TTL_SECONDS`: session TTL in seconds (default: 86400)
    pub fn from_env() -> Self {
        let ttl_seconds = std::env::var("SESSION_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400);

        SessionConfig { ttl_seconds }
    }
}

/// Session store backed by Redis
#[derive(Clone)]
pub struct SessionStore {
    redis_pool: RedisPool,
    ttl_seconds: u64,
}

impl SessionStore {
    /// Create a new session store
    pub fn new(redis_pool: RedisPool, config: SessionConfig) -> Self {
        Self {
            redis_pool,
            ttl_seconds: config.ttl_seconds,
        }
    }

    fn key(token: &str) -> String {
        format!("session:{}", token)
    }

    /// Create a new session for a principal; returns the opaque token
    pub async fn create(&self, principal: &Principal) -> Result<String> {
        let token = Uuid::new_v4().simple().to_string();
        let value = serde_json::to_string(principal)?;

        self.redis_pool
            .set(&Self::key(&token), &value, Some(self.ttl_seconds))
            .await?;

        info!("Created session for user: {}", principal.user_id);
        Ok(token)
    }

    /// Resolve a token to its principal; `None` if unknown or expired
    pub async fn get(&self, token: &str) -> Result<Option<Principal>> {
        let value = self.redis_pool.get(&Self::key(token)).await?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Delete a session
    pub async fn delete(&self, token: &str) -> Result<()> {
        self.redis_pool.delete(&Self::key(token)).await?;
        Ok(())
    }

    /// Get Redis health status
    pub async fn health_check(&self) -> Result<bool> {
        self.redis_pool.health_check().await
    }
}
