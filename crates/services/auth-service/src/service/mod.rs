//! Authentication service business logic.

mod auth_service;

pub use auth_service::{
    AccessTokenResponse, AuthResponse, AuthService, AuthSettings, Authenticator,
};
