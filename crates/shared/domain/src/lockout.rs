//! Account lockout policy.
//!
//! Lock state is never stored as a flag. It is derived from
//! `failed_login_count` and `locked_until`, and a lock lapses on its own:
//! the next login attempt after `locked_until` simply sees an unlocked account.

use chrono::{DateTime, Duration, Utc};

use crate::constants::{DEFAULT_LOCK_DURATION_MINUTES, DEFAULT_MAX_LOGIN_ATTEMPTS};
use crate::user::{User, UserPatch};

/// Login-attempt fields written after a login outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginAttempts {
    pub failed_login_count: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LoginAttempts {
    /// Cleared counters, written on every successful login.
    pub const fn cleared() -> Self {
        Self {
            failed_login_count: 0,
            locked_until: None,
        }
    }

    /// Whether this transition starts a new lock relative to `previous`.
    pub fn starts_lock(&self, previous: &User) -> bool {
        self.locked_until.is_some() && self.locked_until != previous.locked_until
    }
}

impl From<LoginAttempts> for UserPatch {
    fn from(attempts: LoginAttempts) -> Self {
        UserPatch {
            failed_login_count: Some(attempts.failed_login_count),
            locked_until: Some(attempts.locked_until),
            ..Default::default()
        }
    }
}

/// Threshold/duration pair governing lockout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_LOGIN_ATTEMPTS,
            lock_duration: Duration::minutes(DEFAULT_LOCK_DURATION_MINUTES),
        }
    }
}

impl LockoutPolicy {
    pub fn new(max_attempts: u32, lock_duration: Duration) -> Self {
        Self {
            max_attempts,
            lock_duration,
        }
    }

    /// Counters after a failed password check at `now`.
    pub fn on_failure(&self, user: &User, now: DateTime<Utc>) -> LoginAttempts {
        // A lapsed lock opens a fresh window starting at this failure.
        if user.locked_until.is_some_and(|until| until <= now) {
            return LoginAttempts {
                failed_login_count: 1,
                locked_until: None,
            };
        }

        let failed_login_count = user.failed_login_count.saturating_add(1);
        let locked_until = if failed_login_count >= self.max_attempts && !is_locked(user, now) {
            // Saturates rather than wrapping for an unbounded duration.
            Some(
                now.checked_add_signed(self.lock_duration)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            )
        } else {
            user.locked_until
        };

        LoginAttempts {
            failed_login_count,
            locked_until,
        }
    }

    /// Counters after a successful login.
    pub fn on_success(&self) -> LoginAttempts {
        LoginAttempts::cleared()
    }
}

/// Pure lock check: `locked_until > now`.
pub fn is_locked(user: &User, now: DateTime<Utc>) -> bool {
    user.locked_until.is_some_and(|until| until > now)
}
