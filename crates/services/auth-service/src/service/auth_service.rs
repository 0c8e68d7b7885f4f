//! Authentication service - the credential and session lifecycle.
//!
//! Sequences the credential store, lockout policy, token issuer and session
//! cache for every lifecycle operation, then emits a domain event. Every
//! store and cache call is time-bounded; events are best effort.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::OnceCell;
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::AuthServiceConfig;
use crate::events::EventPublisher;
use crate::session::SessionCache;
use crate::token::{AccessClaims, TokenIssuer};
use common::{bounded, AppError, AppResult, OptionExt};
use credential_store::UserRepository;
use domain::{
    is_locked, normalize_email, AuthEvent, HashParams, LockoutPolicy, NewUser, Password,
    RegisterUser, UpdateProfile, User, UserPatch, UserResponse, DEFAULT_PASSWORD_RESET_TTL_MINUTES,
    PASSWORD_RESET_TOKEN_BYTES, TOKEN_TYPE_BEARER,
};

const CREDENTIAL_STORE: &str = "credential store";
const SESSION_CACHE: &str = "session cache";
const EVENT_PUBLISHER: &str = "event publisher";

/// Compare-and-set attempts when recording a failed login under contention.
const MAX_ATTEMPT_WRITES: usize = 3;

/// Plaintext hashed once to produce the dummy hash for unknown emails.
const DUMMY_PASSWORD: &str = "dummy-password-for-timing-equalization";

/// Returned after register and login.
#[derive(Clone, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl std::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("user", &self.user)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Returned by a refresh. The refresh token itself is not rotated.
#[derive(Clone, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl std::fmt::Debug for AccessTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub hash: HashParams,
    pub lockout: LockoutPolicy,
    /// Password reset token lifetime
    pub reset_ttl: Duration,
    /// Upper bound on each credential store and session cache call
    pub store_timeout: StdDuration,
    pub publish_timeout: StdDuration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            hash: HashParams::default(),
            lockout: LockoutPolicy::default(),
            reset_ttl: Duration::minutes(DEFAULT_PASSWORD_RESET_TTL_MINUTES),
            store_timeout: StdDuration::from_millis(5000),
            publish_timeout: StdDuration::from_millis(2000),
        }
    }
}

impl From<&AuthServiceConfig> for AuthSettings {
    fn from(config: &AuthServiceConfig) -> Self {
        Self {
            hash: config.hash,
            lockout: config.lockout,
            reset_ttl: Duration::try_minutes(config.reset_ttl_minutes)
                .unwrap_or(Duration::MAX),
            store_timeout: StdDuration::from_millis(config.timeouts.store_timeout_ms),
            publish_timeout: StdDuration::from_millis(config.timeouts.publish_timeout_ms),
        }
    }
}

/// Authentication service trait for dependency injection.
///
/// Protected operations take an already-authenticated `user_id`.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account and open its first session
    async fn register(&self, input: RegisterUser) -> AppResult<AuthResponse>;

    /// Check credentials under the lockout policy and open a session
    async fn login(&self, email: &str, password: &str) -> AppResult<AuthResponse>;

    /// Exchange the live refresh token for a new access token
    async fn refresh_access_token(&self, refresh_token: &str) -> AppResult<AccessTokenResponse>;

    /// Drop the user's session. Idempotent.
    async fn logout(&self, user_id: Uuid) -> AppResult<()>;

    async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()>;

    /// Always succeeds, whether or not the email is known
    async fn request_password_reset(&self, email: &str) -> AppResult<()>;

    async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()>;

    /// Validate an access token and return its claims
    fn verify_access_token(&self, token: &str) -> AppResult<AccessClaims>;

    async fn get_profile(&self, user_id: Uuid) -> AppResult<UserResponse>;

    async fn update_profile(&self, user_id: Uuid, input: UpdateProfile) -> AppResult<UserResponse>;

    /// Deactivate the account and drop its session. Idempotent.
    async fn deactivate(&self, user_id: Uuid) -> AppResult<()>;
}

/// Concrete implementation of AuthService.
pub struct Authenticator {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionCache>,
    events: Arc<dyn EventPublisher>,
    tokens: Arc<TokenIssuer>,
    clock: Arc<dyn Clock>,
    settings: AuthSettings,
    dummy_hash: OnceCell<String>,
}

impl Authenticator {
    /// Create new auth service instance
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionCache>,
        events: Arc<dyn EventPublisher>,
        tokens: Arc<TokenIssuer>,
        clock: Arc<dyn Clock>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            users,
            sessions,
            events,
            tokens,
            clock,
            settings,
            dummy_hash: OnceCell::new(),
        }
    }

    async fn store<T, F>(&self, call: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        bounded(CREDENTIAL_STORE, self.settings.store_timeout, call).await
    }

    async fn cache<T, F>(&self, call: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        bounded(SESSION_CACHE, self.settings.store_timeout, call).await
    }

    /// Publish without letting a broker failure fail the caller.
    async fn emit(&self, event: AuthEvent) {
        let topic = event.topic();
        let correlation_id = event.correlation_id;

        let published = bounded(
            EVENT_PUBLISHER,
            self.settings.publish_timeout,
            self.events.publish(event),
        )
        .await;

        if let Err(e) = published {
            warn!(
                topic,
                correlation_id = %correlation_id,
                error = %e,
                "Failed to publish user event"
            );
        }
    }

    /// Argon2 hash of the dummy password at the configured cost, built once
    /// on the blocking pool.
    async fn dummy_hash(&self) -> String {
        if let Some(hash) = self.dummy_hash.get() {
            return hash.clone();
        }

        match self.hash_password(DUMMY_PASSWORD).await {
            Ok(hash) => self.dummy_hash.get_or_init(|| hash).clone(),
            Err(e) => {
                warn!(error = %e, "Could not build dummy hash");
                String::new()
            }
        }
    }

    async fn hash_password(&self, plain: &str) -> AppResult<String> {
        let plain = plain.to_owned();
        let params = self.settings.hash;

        tokio::task::spawn_blocking(move || {
            Password::new(&plain, &params).map(Password::into_string)
        })
        .await
        .map_err(|e| AppError::internal(format!("Hashing task failed: {}", e)))?
        .map_err(AppError::from)
    }

    async fn verify_password(&self, hash: String, plain: &str) -> AppResult<bool> {
        let plain = plain.to_owned();

        tokio::task::spawn_blocking(move || Password::from_hash(hash).verify(&plain))
            .await
            .map_err(|e| AppError::internal(format!("Verification task failed: {}", e)))
    }

    /// Issue both tokens and overwrite the user's session slot.
    async fn open_session(&self, user: &User) -> AppResult<AuthResponse> {
        let access = self.tokens.issue_access_token(user)?;
        let refresh = self.tokens.issue_refresh_token(user)?;

        self.cache(
            self.sessions
                .put(user.id, refresh.token.clone(), self.tokens.refresh_ttl()),
        )
        .await?;

        Ok(AuthResponse {
            user: UserResponse::from(user),
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: access.expires_in_seconds,
        })
    }

    /// Apply the failure transition with compare-and-set, re-reading on conflict.
    async fn record_failed_login(&self, mut user: User, now: DateTime<Utc>) -> AppResult<()> {
        for _ in 0..MAX_ATTEMPT_WRITES {
            let attempts = self.settings.lockout.on_failure(&user, now);
            let written = self
                .store(self.users.record_login_attempts(
                    user.id,
                    user.failed_login_count,
                    attempts,
                ))
                .await?;

            if written {
                if attempts.starts_lock(&user) {
                    warn!(
                        user_id = %user.id,
                        failed_login_count = attempts.failed_login_count,
                        locked_until = ?attempts.locked_until,
                        "Account locked after repeated failed logins"
                    );
                } else {
                    debug!(
                        user_id = %user.id,
                        failed_login_count = attempts.failed_login_count,
                        "Failed login recorded"
                    );
                }
                return Ok(());
            }

            match self.store(self.users.find_by_id(user.id)).await? {
                Some(fresh) => user = fresh,
                None => return Ok(()),
            }
        }

        warn!(user_id = %user.id, "Failed login not recorded after repeated write conflicts");
        Ok(())
    }

    async fn issue_reset_token(&self, email: &str) -> AppResult<()> {
        let Some(user) = self.store(self.users.find_by_email(email)).await? else {
            debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let now = self.clock.now();
        let expiry = now
            .checked_add_signed(self.settings.reset_ttl)
            .ok_or_else(|| AppError::internal("Reset token lifetime overflows the clock"))?;
        let token = generate_reset_token();
        let patch = UserPatch {
            password_reset_token: Some(Some(token.clone())),
            password_reset_expiry: Some(Some(expiry)),
            ..Default::default()
        };

        let user = self.store(self.users.update(user.id, patch)).await?;
        info!(user_id = %user.id, "Password reset requested");

        self.emit(AuthEvent::password_reset_requested(&user, &token, now))
            .await;
        Ok(())
    }
}

/// 32 random bytes from the OS, hex-encoded.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; PASSWORD_RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[async_trait]
impl AuthService for Authenticator {
    async fn register(&self, input: RegisterUser) -> AppResult<AuthResponse> {
        let email = normalize_email(&input.email);

        if self
            .store(self.users.find_by_email(&email))
            .await?
            .is_some()
        {
            return Err(AppError::conflict("User"));
        }

        let password_hash = self.hash_password(&input.password).await?;

        let user = self
            .store(self.users.create(NewUser {
                email,
                password_hash,
                first_name: input.first_name,
                last_name: input.last_name,
                role: input.role.unwrap_or_default(),
            }))
            .await?;
        info!(user_id = %user.id, role = %user.role, "User registered");

        let response = self.open_session(&user).await?;
        self.emit(AuthEvent::created(&user, self.clock.now())).await;

        Ok(response)
    }

    async fn login(&self, email: &str, password: &str) -> AppResult<AuthResponse> {
        let now = self.clock.now();

        let Some(user) = self.store(self.users.find_by_email(email)).await? else {
            // Pay the same Argon2 cost as a real check before refusing.
            let _ = self.verify_password(self.dummy_hash().await, password).await?;
            debug!("Login attempt for unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if is_locked(&user, now) {
            warn!(
                user_id = %user.id,
                locked_until = ?user.locked_until,
                "Login attempt on locked account"
            );
            return Err(AppError::AccountLocked);
        }

        if !user.is_active {
            debug!(user_id = %user.id, "Login attempt on deactivated account");
            return Err(AppError::AccountDeactivated);
        }

        if !self
            .verify_password(user.password_hash.clone(), password)
            .await?
        {
            self.record_failed_login(user, now).await?;
            return Err(AppError::InvalidCredentials);
        }

        let patch = UserPatch {
            last_login: Some(Some(now)),
            ..UserPatch::from(self.settings.lockout.on_success())
        };
        let user = self.store(self.users.update(user.id, patch)).await?;

        let response = self.open_session(&user).await?;
        info!(user_id = %user.id, "User logged in");

        self.emit(AuthEvent::login(&user, now)).await;
        Ok(response)
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> AppResult<AccessTokenResponse> {
        let claims = self.tokens.verify_refresh(refresh_token).map_err(|e| {
            debug!(error = %e, "Refresh token rejected");
            AppError::InvalidRefreshToken
        })?;

        let stored = self.cache(self.sessions.get(claims.sub)).await?;
        if stored.as_deref() != Some(refresh_token) {
            debug!(user_id = %claims.sub, "Refresh token does not match live session");
            return Err(AppError::InvalidRefreshToken);
        }

        let user = match self.store(self.users.find_by_id(claims.sub)).await? {
            Some(user) if user.is_active => user,
            _ => return Err(AppError::InvalidRefreshToken),
        };

        // Fresh user data, so a role change shows up in the new token.
        let access = self.tokens.issue_access_token(&user)?;

        Ok(AccessTokenResponse {
            access_token: access.token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: access.expires_in_seconds,
        })
    }

    async fn logout(&self, user_id: Uuid) -> AppResult<()> {
        self.cache(self.sessions.delete(user_id)).await?;
        info!(user_id = %user_id, "User logged out");

        self.emit(AuthEvent::logout(user_id, self.clock.now())).await;
        Ok(())
    }

    async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let user = self
            .store(self.users.find_by_id(user_id))
            .await?
            .ok_or_not_found()?;

        if !self
            .verify_password(user.password_hash, current_password)
            .await?
        {
            return Err(AppError::IncorrectPassword);
        }

        let password_hash = self.hash_password(new_password).await?;
        let patch = UserPatch {
            password_hash: Some(password_hash),
            ..Default::default()
        };
        self.store(self.users.update(user_id, patch)).await?;

        self.cache(self.sessions.delete(user_id)).await?;
        info!(user_id = %user_id, "Password changed");

        self.emit(AuthEvent::password_changed(user_id, self.clock.now()))
            .await;
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        // The outcome never reveals whether the email is registered.
        if let Err(e) = self.issue_reset_token(email).await {
            warn!(error = %e, "Password reset request could not be processed");
        }
        Ok(())
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()> {
        let now = self.clock.now();

        // Reject dead tokens before paying for a hash.
        if self
            .store(self.users.find_by_reset_token(token, now))
            .await?
            .is_none()
        {
            return Err(AppError::InvalidOrExpiredToken);
        }

        let password_hash = self.hash_password(new_password).await?;

        let user = self
            .store(self.users.consume_reset_token(token, password_hash, now))
            .await?
            .ok_or(AppError::InvalidOrExpiredToken)?;

        self.cache(self.sessions.delete(user.id)).await?;
        info!(user_id = %user.id, "Password reset completed");

        self.emit(AuthEvent::password_reset(&user, now)).await;
        Ok(())
    }

    fn verify_access_token(&self, token: &str) -> AppResult<AccessClaims> {
        self.tokens
            .verify_access(token)
            .map_err(|_| AppError::InvalidToken)
    }

    async fn get_profile(&self, user_id: Uuid) -> AppResult<UserResponse> {
        let user = self
            .store(self.users.find_by_id(user_id))
            .await?
            .ok_or_not_found()?;

        Ok(UserResponse::from(user))
    }

    async fn update_profile(&self, user_id: Uuid, input: UpdateProfile) -> AppResult<UserResponse> {
        let patch = UserPatch {
            first_name: input.first_name,
            last_name: input.last_name,
            ..Default::default()
        };

        if patch.is_empty() {
            return self.get_profile(user_id).await;
        }

        let user = self.store(self.users.update(user_id, patch)).await?;
        info!(user_id = %user.id, "Profile updated");

        self.emit(AuthEvent::updated(&user, self.clock.now())).await;
        Ok(UserResponse::from(user))
    }

    async fn deactivate(&self, user_id: Uuid) -> AppResult<()> {
        let user = self
            .store(self.users.find_by_id(user_id))
            .await?
            .ok_or_not_found()?;

        if user.is_active {
            let patch = UserPatch {
                is_active: Some(false),
                ..Default::default()
            };
            let user = self.store(self.users.update(user_id, patch)).await?;
            info!(user_id = %user_id, "User deactivated");

            self.emit(AuthEvent::deactivated(&user, self.clock.now()))
                .await;
        }

        self.cache(self.sessions.delete(user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::MockEventPublisher;
    use crate::session::MockSessionCache;
    use common::JwtConfig;
    use credential_store::MockUserRepository;
    use domain::{LoginAttempts, UserRole};

    fn settings() -> AuthSettings {
        AuthSettings {
            hash: HashParams::insecure_fast(),
            ..Default::default()
        }
    }

    fn jwt() -> JwtConfig {
        JwtConfig {
            access_secret: "unit-test-access-secret-0123456789abcdef".to_string(),
            refresh_secret: "unit-test-refresh-secret-0123456789abcdef".to_string(),
            ..Default::default()
        }
    }

    fn user_with_password(plain: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            password_hash: Password::new(plain, &HashParams::insecure_fast())
                .unwrap()
                .into_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            role: UserRole::Customer,
            is_active: true,
            email_verified: false,
            last_login: None,
            failed_login_count: 0,
            locked_until: None,
            password_reset_token: None,
            password_reset_expiry: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn authenticator(
        users: MockUserRepository,
        sessions: MockSessionCache,
        events: MockEventPublisher,
    ) -> Authenticator {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let tokens = Arc::new(TokenIssuer::new(&jwt(), clock.clone()));
        Authenticator::new(
            Arc::new(users),
            Arc::new(sessions),
            Arc::new(events),
            tokens,
            clock,
            settings(),
        )
    }

    #[tokio::test]
    async fn test_logout_survives_publisher_failure() {
        let mut sessions = MockSessionCache::new();
        sessions.expect_delete().times(1).returning(|_| Ok(()));

        let mut events = MockEventPublisher::new();
        events
            .expect_publish()
            .times(1)
            .returning(|_| Err(AppError::transient("event publisher")));

        let auth = authenticator(MockUserRepository::new(), sessions, events);

        assert!(auth.logout(Uuid::new_v4()).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_email_never_touches_counters() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        users.expect_record_login_attempts().times(0);

        let auth = authenticator(users, MockSessionCache::new(), MockEventPublisher::new());
        let result = auth.login("ghost@example.com", "whatever-password").await;

        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_dummy_hash_is_built_once_at_configured_cost() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().times(2).returning(|_| Ok(None));

        let auth = authenticator(users, MockSessionCache::new(), MockEventPublisher::new());
        assert!(auth.dummy_hash.get().is_none());

        let _ = auth.login("ghost@example.com", "whatever-password").await;
        let first = auth.dummy_hash.get().cloned().unwrap();
        assert!(first.starts_with("$argon2id$"));
        assert!(first.contains("m=256,t=1,p=1"));

        let _ = auth.login("ghost@example.com", "whatever-password").await;
        assert_eq!(auth.dummy_hash.get(), Some(&first));
    }

    #[tokio::test]
    async fn test_failed_login_retries_after_lost_race() {
        let mut stale = user_with_password("correct-horse");
        stale.failed_login_count = 2;
        let mut fresh = stale.clone();
        fresh.failed_login_count = 3;
        let user_id = stale.id;

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(stale.clone())));
        users
            .expect_record_login_attempts()
            .withf(|_, expected, _| *expected == 2)
            .times(1)
            .returning(|_, _, _| Ok(false));
        users
            .expect_find_by_id()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(move |_| Ok(Some(fresh.clone())));
        users
            .expect_record_login_attempts()
            .withf(|_, expected, attempts: &LoginAttempts| {
                *expected == 3 && attempts.failed_login_count == 4
            })
            .times(1)
            .returning(|_, _, _| Ok(true));

        let auth = authenticator(users, MockSessionCache::new(), MockEventPublisher::new());
        let result = auth.login("alice@example.com", "wrong-password").await;

        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_deactivated_account_is_refused_before_password_check() {
        let mut user = user_with_password("correct-horse");
        user.is_active = false;

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        users.expect_record_login_attempts().times(0);

        let auth = authenticator(users, MockSessionCache::new(), MockEventPublisher::new());
        let result = auth.login("alice@example.com", "wrong-password").await;

        assert!(matches!(result, Err(AppError::AccountDeactivated)));
    }

    #[tokio::test]
    async fn test_session_cache_error_fails_login() {
        let user = user_with_password("correct-horse");
        let updated = user.clone();

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        users
            .expect_update()
            .returning(move |_, _| Ok(updated.clone()));

        let mut sessions = MockSessionCache::new();
        sessions
            .expect_put()
            .returning(|_, _, _| Err(AppError::transient("session cache")));

        let mut events = MockEventPublisher::new();
        events.expect_publish().times(0);

        let auth = authenticator(users, sessions, events);
        let result = auth.login("alice@example.com", "correct-horse").await;

        assert!(matches!(result, Err(AppError::Transient(_))));
    }

    #[tokio::test]
    async fn test_reset_request_swallows_store_errors() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Err(AppError::transient("credential store")));

        let auth = authenticator(users, MockSessionCache::new(), MockEventPublisher::new());

        assert!(auth.request_password_reset("alice@example.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_lifetime_overflow_writes_nothing() {
        let user = user_with_password("correct-horse");

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        users.expect_update().times(0);

        let mut events = MockEventPublisher::new();
        events.expect_publish().times(0);

        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let auth = Authenticator::new(
            Arc::new(users),
            Arc::new(MockSessionCache::new()),
            Arc::new(events),
            Arc::new(TokenIssuer::new(&jwt(), clock.clone())),
            clock,
            AuthSettings {
                reset_ttl: Duration::MAX,
                ..settings()
            },
        );

        assert!(auth.request_password_reset("alice@example.com").await.is_ok());
    }

    #[test]
    fn test_reset_token_shape() {
        let a = generate_reset_token();
        let b = generate_reset_token();

        assert_eq!(a.len(), PASSWORD_RESET_TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_response_debug_redacts_tokens() {
        let response = AccessTokenResponse {
            access_token: "secret.jwt.value".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 60,
        };

        assert!(!format!("{:?}", response).contains("secret.jwt.value"));
    }
}
