//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies:
//! the user record, password hashing, the lockout state machine and the
//! lifecycle events the auth service emits.

pub mod constants;
pub mod error;
pub mod event;
pub mod lockout;
pub mod password;
pub mod user;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use event::{AuthEvent, AuthEventType};
pub use lockout::{is_locked, LockoutPolicy, LoginAttempts};
pub use password::{HashParams, Password};
pub use user::{
    normalize_email, NewUser, RegisterUser, UpdateProfile, User, UserPatch, UserResponse, UserRole,
};
