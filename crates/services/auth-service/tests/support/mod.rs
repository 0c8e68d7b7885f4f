//! In-memory backends for driving the authenticator end to end.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use auth_service_lib::{
    build_authenticator, AuthServiceConfig, Authenticator, Clock, EventPublisher, ManualClock,
    SessionCache,
};
use common::{AppError, AppResult};
use credential_store::UserRepository;
use domain::{
    normalize_email, AuthEvent, AuthEventType, LoginAttempts, NewUser, RegisterUser, User,
    UserPatch, UserRole,
};

pub const PASSWORD: &str = "correct-horse-battery";

/// Credential store backed by a map; every write happens under one lock.
pub struct InMemoryUsers {
    users: Mutex<HashMap<Uuid, User>>,
    clock: Arc<ManualClock>,
}

impl InMemoryUsers {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub fn by_email(&self, email: &str) -> Option<User> {
        let email = normalize_email(email);
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.get(id))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.by_email(email))
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| {
                u.password_reset_token.as_deref() == Some(token) && u.has_live_reset_token(now)
            })
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let email = normalize_email(&new_user.email);
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == email) {
            return Err(AppError::conflict("User"));
        }

        let now = self.clock.now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            role: new_user.role,
            is_active: true,
            email_verified: false,
            last_login: None,
            failed_login_count: 0,
            locked_until: None,
            password_reset_token: None,
            password_reset_expiry: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or(AppError::NotFound)?;
        patch.apply_to(user, self.clock.now());
        Ok(user.clone())
    }

    async fn record_login_attempts(
        &self,
        id: Uuid,
        expected_count: u32,
        attempts: LoginAttempts,
    ) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&id) {
            Some(user) if user.failed_login_count == expected_count => {
                UserPatch::from(attempts).apply_to(user, self.clock.now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> AppResult<Option<User>> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.values_mut().find(|u| {
            u.password_reset_token.as_deref() == Some(token) && u.has_live_reset_token(now)
        }) else {
            return Ok(None);
        };

        let patch = UserPatch {
            password_hash: Some(password_hash),
            password_reset_token: Some(None),
            password_reset_expiry: Some(None),
            ..Default::default()
        };
        patch.apply_to(user, now);
        Ok(Some(user.clone()))
    }
}

/// Session cache with clock-driven expiry and an optional artificial delay.
pub struct InMemorySessions {
    slots: Mutex<HashMap<Uuid, (String, DateTime<Utc>)>>,
    clock: Arc<ManualClock>,
    delay: Mutex<Option<std::time::Duration>>,
}

impl InMemorySessions {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            clock,
            delay: Mutex::new(None),
        }
    }

    /// Make every subsequent call wait this long first.
    pub fn stall(&self, delay: std::time::Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn live_token(&self, user_id: Uuid) -> Option<String> {
        let now = self.clock.now();
        self.slots
            .lock()
            .unwrap()
            .get(&user_id)
            .filter(|(_, expires_at)| now < *expires_at)
            .map(|(token, _)| token.clone())
    }

    async fn maybe_stall(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SessionCache for InMemorySessions {
    async fn put(&self, user_id: Uuid, refresh_token: String, ttl: Duration) -> AppResult<()> {
        self.maybe_stall().await;
        let expires_at = self.clock.now() + ttl;
        self.slots
            .lock()
            .unwrap()
            .insert(user_id, (refresh_token, expires_at));
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> AppResult<Option<String>> {
        self.maybe_stall().await;
        Ok(self.live_token(user_id))
    }

    async fn delete(&self, user_id: Uuid) -> AppResult<()> {
        self.maybe_stall().await;
        self.slots.lock().unwrap().remove(&user_id);
        Ok(())
    }
}

/// Publisher that records every event, or fails on demand.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<AuthEvent>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn types(&self) -> Vec<AuthEventType> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type)
            .collect()
    }

    pub fn last(&self, event_type: AuthEventType) -> Option<AuthEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|e| e.event_type == event_type)
            .cloned()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: AuthEvent) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::transient("event publisher"));
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Authenticator wired to in-memory backends and a manual clock.
pub struct Harness {
    pub auth: Authenticator,
    pub users: Arc<InMemoryUsers>,
    pub sessions: Arc<InMemorySessions>,
    pub events: Arc<RecordingPublisher>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store_timeout_ms(5000)
    }

    pub fn with_store_timeout_ms(timeout_ms: u64) -> Self {
        let timeout = timeout_ms.to_string();
        let vars: HashMap<&str, &str> = HashMap::from([
            ("JWT_SECRET", "integration-access-secret-0123456789abcdef"),
            ("JWT_REFRESH_SECRET", "integration-refresh-secret-0123456789abcdef"),
            ("PASSWORD_HASH_MEMORY_KIB", "256"),
            ("PASSWORD_HASH_ITERATIONS", "1"),
            ("PASSWORD_HASH_PARALLELISM", "1"),
            ("STORE_TIMEOUT_MS", timeout.as_str()),
        ]);
        let config = AuthServiceConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
            .expect("test config is valid");

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let users = Arc::new(InMemoryUsers::new(clock.clone()));
        let sessions = Arc::new(InMemorySessions::new(clock.clone()));
        let events = Arc::new(RecordingPublisher::default());

        let auth = build_authenticator(
            &config,
            users.clone(),
            sessions.clone(),
            events.clone(),
            clock.clone(),
        );

        Self {
            auth,
            users,
            sessions,
            events,
            clock,
        }
    }
}

impl Harness {
    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Token carried by the latest reset-request event.
    pub fn reset_token(&self) -> String {
        self.events
            .last(AuthEventType::PasswordResetRequested)
            .and_then(|e| e.data["resetToken"].as_str().map(str::to_string))
            .expect("a reset was requested")
    }
}

pub fn registration(email: &str) -> RegisterUser {
    RegisterUser {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        first_name: "Alice".to_string(),
        last_name: "Liddell".to_string(),
        role: None,
    }
}

pub fn admin_registration(email: &str) -> RegisterUser {
    RegisterUser {
        role: Some(UserRole::Admin),
        ..registration(email)
    }
}
