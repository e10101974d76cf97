//! The single authenticate-and-authorize policy.
//!
//! Every transport binding funnels into [`authorize`]; the per-transport
//! adapters only extract the header and method name and translate
//! [`PolicyError`] into the binding's native error representation.

use userhub_api::methods::is_public_method;

use crate::authenticator::Authenticator;
use crate::claims::UserClaims;

/// The request carried no usable credentials for a non-public method.
#[derive(Debug, thiserror::Error)]
#[error("authentication required")]
pub struct PolicyError;

/// Runs the shared authorization algorithm for one request.
///
/// Returns `Ok(Some(claims))` for an authenticated caller, `Ok(None)` for
/// an anonymous caller hitting a public method, and `Err(PolicyError)` for
/// an anonymous caller hitting anything else.
pub fn authorize(
    authenticator: &Authenticator,
    auth_header: Option<&str>,
    method: &str,
) -> Result<Option<UserClaims>, PolicyError> {
    match authenticator.authenticate(auth_header) {
        Some(result) => Ok(Some(result.claims)),
        None if is_public_method(method) => Ok(None),
        None => Err(PolicyError),
    }
}
