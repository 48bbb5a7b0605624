use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nexgen_core::{RoleId, UserId};

/// Allowed drift between the issuer's clock and ours.
pub const CLOCK_SKEW_SECS: i64 = 60;

/// JWT claims model (transport-agnostic).
///
/// `iat`/`exp` are seconds since the Unix epoch, as required by RFC 7519, so
/// that tokens minted by other tooling decode without conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the user id, stringified.
    pub sub: String,

    /// Role id at the time of issuance. Informational only; authorization
    /// always re-reads the user.
    pub role: RoleId,

    #[serde(default)]
    pub is_superadmin: bool,

    /// Issued-at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("token subject is not a user id")]
    InvalidSubject,
}

impl JwtClaims {
    pub fn new(user_id: UserId, role: RoleId, is_superadmin: bool, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: user_id.to_string(),
            role,
            is_superadmin,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn user_id(&self) -> Result<UserId, TokenValidationError> {
        self.sub.parse().map_err(|_| TokenValidationError::InvalidSubject)
    }
}

/// Deterministically validate JWT claims.
///
/// Note: this validates the *claims* only. Signature verification lives in
/// [`crate::jwt::JwtService`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now + CLOCK_SKEW_SECS < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    claims.user_id()?;
    Ok(())
}
