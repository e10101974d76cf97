//! Access-token issuance/validation and refresh-token generation.
//!
//! Access tokens are HS256-signed JWTs; validity is purely cryptographic
//! and time-based, there is no server-side revocation list for them.
//! Refresh tokens are opaque random strings persisted by the store.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::claims::UserClaims;

/// The `iss` claim stamped on every access token.
pub const ISSUER: &str = "userhub";

/// Default access-token lifetime.
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::minutes(30);

/// Default refresh-token lifetime.
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::days(7);

// ============================================================================
// Errors
// ============================================================================

/// Errors from token operations.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Signing failed; only happens on misconfiguration.
    #[error("failed to sign token: {message}")]
    Signing {
        /// Description of the signing failure.
        message: String,
    },

    /// The token is malformed, unsigned, or carries a bad signature or
    /// issuer.
    #[error("invalid token")]
    Invalid,

    /// The token was once valid but is past its expiry.
    ///
    /// Distinct from [`TokenError::Invalid`] so callers can prompt
    /// re-authentication instead of rejecting outright.
    #[error("token expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid,
        }
    }
}

// ============================================================================
// Claims
// ============================================================================

/// JWT claims carried by an access token.
///
/// Immutable once issued; `iat`/`nbf`/`exp` are unix seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub user_id: i64,
    pub username: String,
    pub role: String,
}

impl AccessTokenClaims {
    /// Converts into the transport-agnostic principal.
    #[must_use]
    pub fn into_user_claims(self) -> UserClaims {
        UserClaims {
            user_id: self.user_id,
            username: self.username,
            role: self.role,
        }
    }
}

// ============================================================================
// Token service
// ============================================================================

/// Issues and validates access tokens with a symmetric secret.
///
/// Thread-safe; shared across request tasks behind an `Arc`.
pub struct TokenService {
    secret: String,
    access_ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: DEFAULT_ACCESS_TOKEN_TTL,
        }
    }

    /// Overrides the access-token lifetime.
    #[must_use]
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Issues a signed access token for the given identity.
    ///
    /// Claims: `iat = nbf = now`, `exp = now + access_ttl`,
    /// `iss = "userhub"`.
    pub fn issue_access_token(
        &self,
        user_id: i64,
        username: &str,
        role: &str,
    ) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = AccessTokenClaims {
            iss: ISSUER.to_string(),
            iat: now,
            nbf: now,
            exp: now + self.access_ttl.whole_seconds(),
            user_id,
            username: username.to_string(),
            role: role.to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Signing {
            message: e.to_string(),
        })
    }

    /// Verifies signature, issuer and the `[nbf, exp]` window.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        let data = decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?;
        Ok(data.claims)
    }
}

/// Generates an opaque refresh token: 256 bits of randomness encoded as
/// base64url without padding (43 characters).
///
/// Collisions are negligible by construction; the store layer still
/// enforces uniqueness as defense-in-depth.
#[must_use]
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

// ============================================================================
// Tests
// ============================================================================
