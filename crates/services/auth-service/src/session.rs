//! Session cache: the single live refresh token per user.

use async_trait::async_trait;
use chrono::Duration;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use uuid::Uuid;

use common::{AppResult, CacheConfig};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Expiring store mapping a user to their currently valid refresh token.
///
/// `put` overwrites, so at most one session exists per user and the most
/// recent login wins.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn put(&self, user_id: Uuid, refresh_token: String, ttl: Duration) -> AppResult<()>;

    async fn get(&self, user_id: Uuid) -> AppResult<Option<String>>;

    /// Remove the session. Deleting a missing session is not an error.
    async fn delete(&self, user_id: Uuid) -> AppResult<()>;
}

/// Redis-backed session cache (`SET key token EX ttl`).
#[derive(Clone)]
pub struct RedisSessionCache {
    connection: ConnectionManager,
    prefix: String,
}

impl RedisSessionCache {
    /// Connect to Redis.
    pub async fn connect(config: &CacheConfig) -> AppResult<Self> {
        let client = Client::open(config.url.as_str())?;
        let connection = ConnectionManager::new(client).await?;
        tracing::info!("Session cache connected");

        Ok(Self::new(connection, config.session_prefix.clone()))
    }

    pub fn new(connection: ConnectionManager, prefix: String) -> Self {
        Self { connection, prefix }
    }

    /// Get the connection manager for direct Redis operations.
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    fn key(&self, user_id: Uuid) -> String {
        session_key(&self.prefix, user_id)
    }

    /// Round-trip a PING.
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

fn session_key(prefix: &str, user_id: Uuid) -> String {
    format!("{}{}", prefix, user_id)
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn put(&self, user_id: Uuid, refresh_token: String, ttl: Duration) -> AppResult<()> {
        let mut conn = self.connection.clone();
        // SET EX rejects zero; a non-positive TTL still stores a 1s session.
        let seconds = u64::try_from(ttl.num_seconds()).unwrap_or(0).max(1);

        conn.set_ex::<_, _, ()>(self.key(user_id), refresh_token, seconds)
            .await?;

        tracing::debug!(user_id = %user_id, ttl_seconds = seconds, "Session stored");
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> AppResult<Option<String>> {
        let mut conn = self.connection.clone();
        let token: Option<String> = conn.get(self.key(user_id)).await?;
        Ok(token)
    }

    async fn delete(&self, user_id: Uuid) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(self.key(user_id)).await?;

        tracing::debug!(user_id = %user_id, "Session removed");
        Ok(())
    }
}
