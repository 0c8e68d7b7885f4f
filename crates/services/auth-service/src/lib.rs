//! Auth Service Library
//!
//! Credential and session lifecycle: registration, login under a lockout
//! policy, token issuance and refresh, logout, and password change/reset.
//! Users live in the credential store; the single live refresh token per
//! user lives in Redis.

pub mod clock;
pub mod config;
pub mod events;
pub mod service;
pub mod session;
pub mod token;

use std::sync::Arc;

use tracing::info;

use common::{AppError, AppResult};
use credential_store::{Database, MigrateAction, MigrationState, UserStore};

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::AuthServiceConfig;
pub use crate::events::{EventPublisher, RedisEventPublisher};
pub use crate::service::{
    AccessTokenResponse, AuthResponse, AuthService, AuthSettings, Authenticator,
};
pub use crate::session::{RedisSessionCache, SessionCache};
pub use crate::token::{AccessClaims, IssuedToken, RefreshClaims, TokenIssuer};

/// Connect to Postgres and Redis and wire a production authenticator.
///
/// Pending migrations are applied on connect.
pub async fn connect(config: &AuthServiceConfig) -> AppResult<Authenticator> {
    let db = Database::connect(&config.database).await?;
    let sessions = RedisSessionCache::connect(&config.cache).await?;
    let events = RedisEventPublisher::new(sessions.connection(), config.events_exchange.clone());

    info!("Auth service backends connected");

    Ok(build_authenticator(
        config,
        Arc::new(UserStore::new(db.get_connection())),
        Arc::new(sessions),
        Arc::new(events),
        Arc::new(SystemClock),
    ))
}

/// Wire an authenticator from explicit dependencies.
pub fn build_authenticator(
    config: &AuthServiceConfig,
    users: Arc<dyn credential_store::UserRepository>,
    sessions: Arc<dyn SessionCache>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
) -> Authenticator {
    let tokens = Arc::new(TokenIssuer::new(&config.jwt, clock.clone()));
    Authenticator::new(
        users,
        sessions,
        events,
        tokens,
        clock,
        AuthSettings::from(config),
    )
}

/// Run a migration action (for CLI commands).
pub async fn run_migrations(
    config: &AuthServiceConfig,
    action: MigrateAction,
) -> AppResult<Vec<MigrationState>> {
    let db = Database::connect_without_migrations(&config.database).await?;
    Ok(credential_store::run_migrations(&db, action).await?)
}

/// Ping both backing stores.
pub async fn check(config: &AuthServiceConfig) -> AppResult<()> {
    let db = Database::connect_without_migrations(&config.database).await?;
    db.ping().await?;
    info!("Credential store reachable");

    let sessions = RedisSessionCache::connect(&config.cache).await?;
    sessions.ping().await.map_err(|e| {
        tracing::error!(error = %e, "Session cache ping failed");
        AppError::transient("session cache")
    })?;
    info!("Session cache reachable");

    Ok(())
}
