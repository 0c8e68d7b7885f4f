//! Domain-level constants.
//!
//! These constants define business rules and security defaults.

// =============================================================================
// User Roles
// =============================================================================

/// Default role assigned to new users
pub const ROLE_CUSTOMER: &str = "customer";

/// Administrator role with elevated privileges
pub const ROLE_ADMIN: &str = "admin";

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 8;

// =============================================================================
// Tokens
// =============================================================================

/// Default access token lifetime in minutes (24 hours)
pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 24 * 60;

/// Default refresh token lifetime in days
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Longest accepted access token lifetime in minutes (30 days)
pub const MAX_ACCESS_TOKEN_TTL_MINUTES: i64 = 30 * 24 * 60;

/// Longest accepted refresh token lifetime in days
pub const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 365;

/// Minimum JWT secret length (security requirement)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Seconds per minute (for token expiration calculation)
pub const SECONDS_PER_MINUTE: i64 = 60;

/// JWT token type identifier
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

// =============================================================================
// Lockout
// =============================================================================

/// Consecutive failed logins that trigger a lock
pub const DEFAULT_MAX_LOGIN_ATTEMPTS: u32 = 5;

/// How long a triggered lock lasts, in minutes (2 hours)
pub const DEFAULT_LOCK_DURATION_MINUTES: i64 = 2 * 60;

/// Longest accepted lock in minutes (30 days)
pub const MAX_LOCK_DURATION_MINUTES: i64 = 30 * 24 * 60;

// =============================================================================
// Password Reset
// =============================================================================

/// Reset token lifetime in minutes
pub const DEFAULT_PASSWORD_RESET_TTL_MINUTES: i64 = 60;

/// Longest accepted reset token lifetime in minutes (7 days)
pub const MAX_PASSWORD_RESET_TTL_MINUTES: i64 = 7 * 24 * 60;

/// Random bytes in a reset token (hex-encoded to twice this length)
pub const PASSWORD_RESET_TOKEN_BYTES: usize = 32;

// =============================================================================
// Events
// =============================================================================

/// Logical exchange that carries every user lifecycle event
pub const USER_EVENTS_EXCHANGE: &str = "user.events";
