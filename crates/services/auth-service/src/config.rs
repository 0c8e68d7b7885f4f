//! Auth service configuration.

use std::env;
use std::str::FromStr;

use chrono::Duration;
use common::{AppError, AppResult, CacheConfig, DatabaseConfig, JwtConfig, TimeoutConfig};
use domain::{
    HashParams, LockoutPolicy, DEFAULT_LOCK_DURATION_MINUTES, DEFAULT_MAX_LOGIN_ATTEMPTS,
    DEFAULT_PASSWORD_RESET_TTL_MINUTES, MAX_ACCESS_TOKEN_TTL_MINUTES, MAX_LOCK_DURATION_MINUTES,
    MAX_PASSWORD_RESET_TTL_MINUTES, MAX_REFRESH_TOKEN_TTL_DAYS, MIN_JWT_SECRET_LENGTH,
    USER_EVENTS_EXCHANGE,
};

/// Auth service configuration.
///
/// Secrets and connection URLs are redacted from `Debug` output by the
/// nested config types.
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub jwt: JwtConfig,
    /// Argon2id cost for new hashes
    pub hash: HashParams,
    pub lockout: LockoutPolicy,
    /// Password reset token lifetime in minutes
    pub reset_ttl_minutes: i64,
    pub timeouts: TimeoutConfig,
    /// Channel prefix for published events
    pub events_exchange: String,
}

impl AuthServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_defaults = DatabaseConfig::default();
        let cache_defaults = CacheConfig::default();
        let jwt_defaults = JwtConfig::default();
        let hash_defaults = HashParams::default();
        let timeout_defaults = TimeoutConfig::default();

        let lock_minutes = parse(
            &lookup,
            "LOCKOUT_DURATION_MINUTES",
            DEFAULT_LOCK_DURATION_MINUTES,
        )?;
        let lock_duration = Duration::try_minutes(lock_minutes)
            .ok_or_else(|| out_of_range("LOCKOUT_DURATION_MINUTES", MAX_LOCK_DURATION_MINUTES))?;

        let config = Self {
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").unwrap_or(database_defaults.url),
                max_connections: parse(
                    &lookup,
                    "DATABASE_MAX_CONNECTIONS",
                    database_defaults.max_connections,
                )?,
                min_connections: parse(
                    &lookup,
                    "DATABASE_MIN_CONNECTIONS",
                    database_defaults.min_connections,
                )?,
            },
            cache: CacheConfig {
                url: lookup("REDIS_URL").unwrap_or(cache_defaults.url),
                session_prefix: cache_defaults.session_prefix,
            },
            jwt: JwtConfig {
                access_secret: required(&lookup, "JWT_SECRET")?,
                refresh_secret: required(&lookup, "JWT_REFRESH_SECRET")?,
                access_ttl_minutes: parse(
                    &lookup,
                    "JWT_EXPIRES_IN_MINUTES",
                    jwt_defaults.access_ttl_minutes,
                )?,
                refresh_ttl_days: parse(
                    &lookup,
                    "JWT_REFRESH_EXPIRES_IN_DAYS",
                    jwt_defaults.refresh_ttl_days,
                )?,
            },
            hash: HashParams {
                memory_kib: parse(
                    &lookup,
                    "PASSWORD_HASH_MEMORY_KIB",
                    hash_defaults.memory_kib,
                )?,
                iterations: parse(
                    &lookup,
                    "PASSWORD_HASH_ITERATIONS",
                    hash_defaults.iterations,
                )?,
                parallelism: parse(
                    &lookup,
                    "PASSWORD_HASH_PARALLELISM",
                    hash_defaults.parallelism,
                )?,
            },
            lockout: LockoutPolicy::new(
                parse(&lookup, "LOCKOUT_MAX_ATTEMPTS", DEFAULT_MAX_LOGIN_ATTEMPTS)?,
                lock_duration,
            ),
            reset_ttl_minutes: parse(
                &lookup,
                "PASSWORD_RESET_TTL_MINUTES",
                DEFAULT_PASSWORD_RESET_TTL_MINUTES,
            )?,
            timeouts: TimeoutConfig {
                store_timeout_ms: parse(
                    &lookup,
                    "STORE_TIMEOUT_MS",
                    timeout_defaults.store_timeout_ms,
                )?,
                publish_timeout_ms: parse(
                    &lookup,
                    "PUBLISH_TIMEOUT_MS",
                    timeout_defaults.publish_timeout_ms,
                )?,
            },
            events_exchange: lookup("USER_EVENTS_EXCHANGE")
                .unwrap_or_else(|| USER_EVENTS_EXCHANGE.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would run insecurely or not at all.
    pub fn validate(&self) -> AppResult<()> {
        if self.jwt.access_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(AppError::validation(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_JWT_SECRET_LENGTH
            )));
        }
        if self.jwt.refresh_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(AppError::validation(format!(
                "JWT_REFRESH_SECRET must be at least {} characters",
                MIN_JWT_SECRET_LENGTH
            )));
        }
        if self.jwt.access_secret == self.jwt.refresh_secret {
            return Err(AppError::validation(
                "JWT_SECRET and JWT_REFRESH_SECRET must differ",
            ));
        }

        // Expiries are added to the clock; bounded so that can never overflow.
        within(
            "JWT_EXPIRES_IN_MINUTES",
            self.jwt.access_ttl_minutes,
            MAX_ACCESS_TOKEN_TTL_MINUTES,
        )?;
        within(
            "JWT_REFRESH_EXPIRES_IN_DAYS",
            self.jwt.refresh_ttl_days,
            MAX_REFRESH_TOKEN_TTL_DAYS,
        )?;
        within(
            "LOCKOUT_DURATION_MINUTES",
            self.lockout.lock_duration.num_minutes(),
            MAX_LOCK_DURATION_MINUTES,
        )?;
        within(
            "PASSWORD_RESET_TTL_MINUTES",
            self.reset_ttl_minutes,
            MAX_PASSWORD_RESET_TTL_MINUTES,
        )?;

        if self.lockout.max_attempts == 0 {
            return Err(AppError::validation("LOCKOUT_MAX_ATTEMPTS must be positive"));
        }
        if self.timeouts.store_timeout_ms == 0 || self.timeouts.publish_timeout_ms == 0 {
            return Err(AppError::validation("Timeouts must be positive"));
        }

        self.hash
            .validate()
            .map_err(|e| AppError::validation(format!("PASSWORD_HASH_* rejected: {}", e)))
    }
}

fn within(key: &str, value: i64, max: i64) -> AppResult<()> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(out_of_range(key, max))
    }
}

fn out_of_range(key: &str, max: i64) -> AppError {
    AppError::validation(format!("{} must be between 1 and {}", key, max))
}

fn required<F>(lookup: &F, key: &str) -> AppResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| AppError::validation(format!("{} must be set", key)))
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::validation(format!("{} has an invalid value", key))),
        None => Ok(default),
    }
}
