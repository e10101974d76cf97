//! The fixed error-code table shared by every binding.
//!
//! The numeric values are the `state` field of the HTTP envelope and map
//! 1:1 onto gRPC status codes; they are a wire contract and must not be
//! renumbered.

use std::fmt;

/// Stable error classification carried on every failed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl ErrorCode {
    /// The numeric `state` value used in the response envelope.
    #[must_use]
    pub fn state(self) -> i32 {
        self as i32
    }

    /// The Connect protocol code string for this error.
    #[must_use]
    pub fn connect_code(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Cancelled => "canceled",
            Self::Unknown => "unknown",
            Self::InvalidArgument => "invalid_argument",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::PermissionDenied => "permission_denied",
            Self::ResourceExhausted => "resource_exhausted",
            Self::FailedPrecondition => "failed_precondition",
            Self::Aborted => "aborted",
            Self::OutOfRange => "out_of_range",
            Self::Unimplemented => "unimplemented",
            Self::Internal => "internal",
            Self::Unavailable => "unavailable",
            Self::DataLoss => "data_loss",
            Self::Unauthenticated => "unauthenticated",
        }
    }

    /// The HTTP status this error maps to on the gateway and Connect
    /// bindings (Connect's standard code-to-HTTP table).
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Cancelled => 408,
            Self::InvalidArgument | Self::OutOfRange | Self::FailedPrecondition => 400,
            Self::DeadlineExceeded => 408,
            Self::NotFound => 404,
            Self::AlreadyExists | Self::Aborted => 409,
            Self::PermissionDenied => 403,
            Self::ResourceExhausted => 429,
            Self::Unimplemented => 501,
            Self::Unavailable => 503,
            Self::Unauthenticated => 401,
            Self::Unknown | Self::Internal | Self::DataLoss => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.connect_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_values_match_table() {
        assert_eq!(ErrorCode::Ok.state(), 0);
        assert_eq!(ErrorCode::InvalidArgument.state(), 3);
        assert_eq!(ErrorCode::NotFound.state(), 5);
        assert_eq!(ErrorCode::AlreadyExists.state(), 6);
        assert_eq!(ErrorCode::Internal.state(), 13);
        assert_eq!(ErrorCode::Unauthenticated.state(), 16);
    }

    #[test]
    fn test_http_mapping() {
        assert_eq!(ErrorCode::Unauthenticated.http_status(), 401);
        assert_eq!(ErrorCode::AlreadyExists.http_status(), 409);
        assert_eq!(ErrorCode::InvalidArgument.http_status(), 400);
        assert_eq!(ErrorCode::NotFound.http_status(), 404);
        assert_eq!(ErrorCode::Internal.http_status(), 500);
    }

    #[test]
    fn test_connect_codes() {
        assert_eq!(ErrorCode::Unauthenticated.connect_code(), "unauthenticated");
        assert_eq!(ErrorCode::Cancelled.connect_code(), "canceled");
        assert_eq!(ErrorCode::InvalidArgument.connect_code(), "invalid_argument");
    }
}
