//! Event publisher seam.
//!
//! The orchestrator treats publication as fire-and-forget; adapters report
//! failures, the caller decides to log and move on.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};

use common::{AppError, AppResult};
use domain::AuthEvent;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one event under its topic.
    async fn publish(&self, event: AuthEvent) -> AppResult<()>;
}

/// Publishes events as JSON on Redis pub/sub channel `{exchange}:{topic}`.
#[derive(Clone)]
pub struct RedisEventPublisher {
    connection: ConnectionManager,
    exchange: String,
}

impl RedisEventPublisher {
    pub fn new(connection: ConnectionManager, exchange: impl Into<String>) -> Self {
        Self {
            connection,
            exchange: exchange.into(),
        }
    }

    fn channel(&self, event: &AuthEvent) -> String {
        channel_name(&self.exchange, event)
    }
}

fn channel_name(exchange: &str, event: &AuthEvent) -> String {
    format!("{}:{}", exchange, event.topic())
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, event: AuthEvent) -> AppResult<()> {
        let payload = serde_json::to_string(&event)
            .map_err(|e| AppError::internal(format!("Event serialization error: {}", e)))?;
        let channel = self.channel(&event);

        let mut conn = self.connection.clone();
        let receivers: i64 = conn.publish(&channel, payload).await?;

        tracing::debug!(
            channel = %channel,
            correlation_id = %event.correlation_id,
            receivers,
            "Event published"
        );
        Ok(())
    }
}
