//! Common utilities shared across the auth workspace.
//!
//! This crate provides:
//! - Unified error handling with HTTP status mapping
//! - Configuration structures
//! - Bounded dependency calls

pub mod config;
pub mod error;
pub mod timeout;

pub use config::*;
pub use error::{AppError, AppResult, OptionExt};
pub use timeout::bounded;
