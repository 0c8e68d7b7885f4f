//! Token issuer.
//!
//! Access and refresh tokens are HS256 JWTs signed with separate keys and
//! tagged with a `typ` claim, so one kind can never be accepted as the other
//! even if the keys were ever shared. Expiry is checked against the injected
//! [`Clock`] with zero leeway.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use common::{AppError, AppResult, JwtConfig};
use domain::{User, SECONDS_PER_MINUTE};

const ACCESS_TYP: &str = "access";
const REFRESH_TYP: &str = "refresh";

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub typ: String,
}

/// Claims carried by a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per issuance, so two refresh tokens minted in the same second differ
    pub jti: Uuid,
    pub typ: String,
}

trait TypedClaims {
    fn typ(&self) -> &str;
    fn exp(&self) -> i64;
}

impl TypedClaims for AccessClaims {
    fn typ(&self) -> &str {
        &self.typ
    }
    fn exp(&self) -> i64 {
        self.exp
    }
}

impl TypedClaims for RefreshClaims {
    fn typ(&self) -> &str {
        &self.typ
    }
    fn exp(&self) -> i64 {
        self.exp
    }
}

/// A freshly signed token and its lifetime.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in_seconds: i64,
}

/// Signs and verifies access and refresh tokens.
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock instead.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            // Out-of-range lifetimes saturate; issuing then fails instead of panicking.
            access_ttl: Duration::try_minutes(config.access_ttl_minutes)
                .unwrap_or(Duration::MAX),
            refresh_ttl: Duration::try_days(config.refresh_ttl_days)
                .unwrap_or(Duration::MAX),
            validation,
            clock,
        }
    }

    /// Refresh token lifetime, also used as the session TTL.
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_access_token(&self, user: &User) -> AppResult<IssuedToken> {
        let now = self.clock.now();
        let claims = AccessClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role.to_string(),
            iat: now.timestamp(),
            exp: expiry(now, self.access_ttl)?,
            typ: ACCESS_TYP.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.access_encoding)?;

        Ok(IssuedToken {
            token,
            expires_in_seconds: self.access_ttl.num_minutes() * SECONDS_PER_MINUTE,
        })
    }

    pub fn issue_refresh_token(&self, user: &User) -> AppResult<IssuedToken> {
        let now = self.clock.now();
        let claims = RefreshClaims {
            sub: user.id,
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: expiry(now, self.refresh_ttl)?,
            jti: Uuid::new_v4(),
            typ: REFRESH_TYP.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.refresh_encoding)?;

        Ok(IssuedToken {
            token,
            expires_in_seconds: self.refresh_ttl.num_seconds(),
        })
    }

    /// Verify an access token. Fails with `TokenExpired` or `TokenInvalid`.
    pub fn verify_access(&self, token: &str) -> AppResult<AccessClaims> {
        self.verify(token, &self.access_decoding, ACCESS_TYP)
    }

    /// Verify a refresh token. Fails with `TokenExpired` or `TokenInvalid`.
    pub fn verify_refresh(&self, token: &str) -> AppResult<RefreshClaims> {
        self.verify(token, &self.refresh_decoding, REFRESH_TYP)
    }

    fn verify<C>(&self, token: &str, key: &DecodingKey, expected_typ: &str) -> AppResult<C>
    where
        C: DeserializeOwned + TypedClaims,
    {
        let claims = decode::<C>(token, key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::TokenInvalid,
            })?
            .claims;

        if claims.typ() != expected_typ {
            return Err(AppError::TokenInvalid);
        }

        if self.clock.now().timestamp() >= claims.exp() {
            return Err(AppError::TokenExpired);
        }

        Ok(claims)
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> AppResult<i64> {
    now.checked_add_signed(ttl)
        .map(|at| at.timestamp())
        .ok_or_else(|| AppError::internal("Token lifetime overflows the clock"))
}
