//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{ROLE_ADMIN, ROLE_CUSTOMER};

/// User roles enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}

impl From<&str> for UserRole {
    fn from(s: &str) -> Self {
        match s {
            ROLE_ADMIN => UserRole::Admin,
            _ => UserRole::Customer,
        }
    }
}

impl From<String> for UserRole {
    fn from(s: String) -> Self {
        UserRole::from(s.as_str())
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.to_string()
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "{}", ROLE_ADMIN),
            UserRole::Customer => write!(f, "{}", ROLE_CUSTOMER),
        }
    }
}

/// Normalize an email for storage and lookup (trimmed, lowercase).
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User domain entity.
///
/// Credential and lockout fields are never serialized; hand callers a
/// [`UserResponse`] instead of this type.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub email_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub failed_login_count: u32,
    #[serde(skip_serializing)]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether a reset token is set and still usable at `now`.
    pub fn has_live_reset_token(&self, now: DateTime<Utc>) -> bool {
        self.password_reset_token.is_some()
            && self.password_reset_expiry.is_some_and(|expiry| now < expiry)
    }
}

/// Data required to persist a new user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

/// Field-level partial update.
///
/// `None` leaves a field untouched. For nullable columns the inner option
/// distinguishes "set" (`Some(Some(v))`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub email_verified: Option<bool>,
    pub last_login: Option<Option<DateTime<Utc>>>,
    pub failed_login_count: Option<u32>,
    pub locked_until: Option<Option<DateTime<Utc>>>,
    pub password_reset_token: Option<Option<String>>,
    pub password_reset_expiry: Option<Option<DateTime<Utc>>>,
}

impl UserPatch {
    /// Whether the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.password_hash.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
            && self.email_verified.is_none()
            && self.last_login.is_none()
            && self.failed_login_count.is_none()
            && self.locked_until.is_none()
            && self.password_reset_token.is_none()
            && self.password_reset_expiry.is_none()
    }

    /// Apply this patch to an in-memory user, bumping `updated_at`.
    pub fn apply_to(self, user: &mut User, now: DateTime<Utc>) {
        if let Some(v) = self.password_hash {
            user.password_hash = v;
        }
        if let Some(v) = self.first_name {
            user.first_name = v;
        }
        if let Some(v) = self.last_name {
            user.last_name = v;
        }
        if let Some(v) = self.role {
            user.role = v;
        }
        if let Some(v) = self.is_active {
            user.is_active = v;
        }
        if let Some(v) = self.email_verified {
            user.email_verified = v;
        }
        if let Some(v) = self.last_login {
            user.last_login = v;
        }
        if let Some(v) = self.failed_login_count {
            user.failed_login_count = v;
        }
        if let Some(v) = self.locked_until {
            user.locked_until = v;
        }
        if let Some(v) = self.password_reset_token {
            user.password_reset_token = v;
        }
        if let Some(v) = self.password_reset_expiry {
            user.password_reset_expiry = v;
        }
        user.updated_at = now;
    }
}

/// Registration input (fields already validated upstream)
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    /// Defaults to customer when absent
    #[serde(default)]
    pub role: Option<UserRole>,
}

/// Profile update input
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// User response (safe to return to client)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    /// Unique user identifier
    pub id: Uuid,
    /// User email address
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// User role
    pub role: String,
    pub is_active: bool,
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role.to_string(),
            is_active: user.is_active,
            email_verified: user.email_verified,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse::from(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            role: UserRole::Customer,
            is_active: true,
            email_verified: false,
            last_login: None,
            failed_login_count: 3,
            locked_until: None,
            password_reset_token: Some("reset-token".to_string()),
            password_reset_expiry: Some(now + Duration::hours(1)),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_role_round_trip_and_default() {
        assert_eq!(UserRole::from("admin"), UserRole::Admin);
        assert_eq!(UserRole::from("customer"), UserRole::Customer);
        assert_eq!(UserRole::from("unknown"), UserRole::Customer);
        assert_eq!(UserRole::default(), UserRole::Customer);
        assert_eq!(String::from(UserRole::Admin), "admin");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_serialized_user_hides_credentials() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("reset-token"));
        assert!(!json.contains("failed_login_count"));
        assert!(json.contains("alice@example.com"));
    }

    #[test]
    fn test_user_response_drops_credentials() {
        let user = sample_user();
        let response = UserResponse::from(&user);
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(response.id, user.id);
        assert_eq!(response.role, "customer");
        assert!(!json.contains("argon2id"));
    }

    #[test]
    fn test_patch_sets_and_clears_nullable_fields() {
        let mut user = sample_user();
        let later = user.updated_at + Duration::minutes(5);

        UserPatch {
            failed_login_count: Some(0),
            password_reset_token: Some(None),
            password_reset_expiry: Some(None),
            first_name: Some("Alicia".to_string()),
            ..Default::default()
        }
        .apply_to(&mut user, later);

        assert_eq!(user.failed_login_count, 0);
        assert!(user.password_reset_token.is_none());
        assert!(user.password_reset_expiry.is_none());
        assert_eq!(user.first_name, "Alicia");
        assert_eq!(user.last_name, "Liddell");
        assert_eq!(user.updated_at, later);
    }

    #[test]
    fn test_empty_patch() {
        assert!(UserPatch::default().is_empty());
        assert!(!UserPatch {
            is_active: Some(false),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn test_live_reset_token() {
        let user = sample_user();
        let now = user.created_at;
        assert!(user.has_live_reset_token(now));
        assert!(!user.has_live_reset_token(now + Duration::hours(2)));
    }
}
