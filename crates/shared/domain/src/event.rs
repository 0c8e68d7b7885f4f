//! Outbound user lifecycle events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::user::User;

/// Kind of lifecycle change; doubles as the routing topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthEventType {
    Created,
    Login,
    Logout,
    Updated,
    Deactivated,
    PasswordChanged,
    PasswordReset,
    PasswordResetRequested,
}

impl AuthEventType {
    /// Topic / `type` field value.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEventType::Created => "user.created",
            AuthEventType::Login => "user.login",
            AuthEventType::Logout => "user.logout",
            AuthEventType::Updated => "user.updated",
            AuthEventType::Deactivated => "user.deactivated",
            AuthEventType::PasswordChanged => "user.password_changed",
            AuthEventType::PasswordReset => "user.password_reset",
            AuthEventType::PasswordResetRequested => "user.password_reset_requested",
        }
    }
}

impl std::fmt::Display for AuthEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AuthEventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Wire envelope published for every lifecycle change.
///
/// Each event gets a fresh correlation id; consumers must tolerate
/// redelivery and de-duplicate on it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthEvent {
    #[serde(rename = "type")]
    pub event_type: AuthEventType,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
}

impl AuthEvent {
    pub fn new(event_type: AuthEventType, data: Value, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_type,
            data,
            timestamp,
            correlation_id: Uuid::new_v4(),
        }
    }

    /// Topic the event is routed under.
    pub fn topic(&self) -> &'static str {
        self.event_type.as_str()
    }

    /// The user id carried in the payload, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.data.get("userId").and_then(Value::as_str)
    }

    pub fn created(user: &User, at: DateTime<Utc>) -> Self {
        Self::new(AuthEventType::Created, profile_payload(user), at)
    }

    pub fn updated(user: &User, at: DateTime<Utc>) -> Self {
        Self::new(AuthEventType::Updated, profile_payload(user), at)
    }

    pub fn login(user: &User, at: DateTime<Utc>) -> Self {
        Self::new(
            AuthEventType::Login,
            json!({
                "userId": user.id.to_string(),
                "email": user.email,
                "lastLogin": user.last_login,
            }),
            at,
        )
    }

    pub fn logout(user_id: Uuid, at: DateTime<Utc>) -> Self {
        Self::new(
            AuthEventType::Logout,
            json!({ "userId": user_id.to_string() }),
            at,
        )
    }

    pub fn deactivated(user: &User, at: DateTime<Utc>) -> Self {
        Self::new(
            AuthEventType::Deactivated,
            json!({ "userId": user.id.to_string(), "email": user.email }),
            at,
        )
    }

    pub fn password_changed(user_id: Uuid, at: DateTime<Utc>) -> Self {
        Self::new(
            AuthEventType::PasswordChanged,
            json!({ "userId": user_id.to_string() }),
            at,
        )
    }

    pub fn password_reset(user: &User, at: DateTime<Utc>) -> Self {
        Self::new(
            AuthEventType::PasswordReset,
            json!({ "userId": user.id.to_string(), "email": user.email }),
            at,
        )
    }

    /// Carries the raw reset token so a notifier can deliver it.
    pub fn password_reset_requested(user: &User, reset_token: &str, at: DateTime<Utc>) -> Self {
        Self::new(
            AuthEventType::PasswordResetRequested,
            json!({
                "userId": user.id.to_string(),
                "email": user.email,
                "resetToken": reset_token,
            }),
            at,
        )
    }
}

fn profile_payload(user: &User) -> Value {
    json!({
        "userId": user.id.to_string(),
        "email": user.email,
        "firstName": user.first_name,
        "lastName": user.last_name,
        "role": user.role.to_string(),
    })
}
