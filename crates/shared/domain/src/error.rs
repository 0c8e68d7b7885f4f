//! Errors raised by the domain layer itself.
//!
//! Lifecycle refusals (wrong password, locked account, bad token) are
//! decided by the service and live in `common::AppError`. The domain only
//! fails when a password or hashing cost is unusable.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Plaintext password rejected before hashing
    #[error("{0}")]
    WeakPassword(String),

    /// Argon2 refused the configured cost
    #[error("Invalid Argon2 parameters: {0}")]
    HashParams(String),

    /// Hashing failed for a reason other than the cost
    #[error("Password hash failed: {0}")]
    Hashing(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
