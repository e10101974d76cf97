//! The authenticated principal carried in request-scoped context.

/// Identity attached to a request after successful authentication.
///
/// Inserted into request extensions by the transport interceptors so
/// downstream handlers never re-parse tokens. `user_id == 0` is reserved
/// and means "not authenticated" — real user IDs start at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserClaims {
    pub user_id: i64,
    pub username: String,
    /// "admin" or "user".
    pub role: String,
}
