//! Authentication for userhub: JWT access tokens, opaque refresh tokens,
//! password hashing and the single authorization policy shared by every
//! transport binding.

pub mod authenticator;
pub mod claims;
pub mod password;
pub mod policy;
pub mod token;

pub use authenticator::{AuthResult, Authenticator, extract_bearer_token};
pub use claims::UserClaims;
pub use policy::{PolicyError, authorize};
pub use token::{
    AccessTokenClaims, DEFAULT_ACCESS_TOKEN_TTL, DEFAULT_REFRESH_TOKEN_TTL, ISSUER, TokenError,
    TokenService, generate_refresh_token,
};
