//! Service-level error taxonomy.
//!
//! One enum, mapped losslessly onto the shared numeric code table by
//! [`ServiceError::code`] and onto native gRPC statuses via `From`.

use userhub_api::ErrorCode;
use userhub_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{message}")]
    InvalidArgument { message: String },

    #[error("{message}")]
    Unauthenticated { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    AlreadyExists { message: String },

    #[error("{message}")]
    Internal { message: String },
}

impl ServiceError {
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The shared numeric classification for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::Unauthenticated { .. } => ErrorCode::Unauthenticated,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            Self::Internal { .. } => ErrorCode::Internal,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { message } => Self::AlreadyExists { message },
            StoreError::NotFound { message } => Self::NotFound { message },
            StoreError::Internal { message } => {
                tracing::error!(error = %message, "storage failure");
                Self::internal("internal storage error")
            }
        }
    }
}

impl From<ServiceError> for tonic::Status {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidArgument { message } => Self::invalid_argument(message),
            ServiceError::Unauthenticated { message } => Self::unauthenticated(message),
            ServiceError::NotFound { message } => Self::not_found(message),
            ServiceError::AlreadyExists { message } => Self::already_exists(message),
            ServiceError::Internal { message } => Self::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(ServiceError::invalid_argument("x").code(), ErrorCode::InvalidArgument);
        assert_eq!(ServiceError::unauthenticated("x").code(), ErrorCode::Unauthenticated);
        assert_eq!(ServiceError::not_found("x").code(), ErrorCode::NotFound);
        assert_eq!(ServiceError::already_exists("x").code(), ErrorCode::AlreadyExists);
        assert_eq!(ServiceError::internal("x").code(), ErrorCode::Internal);
    }

    #[test]
    fn test_store_conflict_maps_to_already_exists() {
        let err: ServiceError = StoreError::conflict("username taken").into();
        assert!(matches!(err, ServiceError::AlreadyExists { .. }));
        assert_eq!(err.to_string(), "username taken");
    }

    #[test]
    fn test_store_internal_is_not_leaked() {
        let err: ServiceError = StoreError::internal("connection reset by peer").into();
        assert_eq!(err.to_string(), "internal storage error");
    }

    #[test]
    fn test_grpc_status_mapping() {
        let status: tonic::Status = ServiceError::unauthenticated("nope").into();
        assert_eq!(status.code(), tonic::Code::Unauthenticated);
        assert_eq!(status.message(), "nope");
    }
}
