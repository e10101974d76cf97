//! Unified JSON response envelope for the REST gateway.
//!
//! Every gateway response carries `{state, message, data}`; `state == 0`
//! signals success, non-zero values come from [`crate::ErrorCode`].

use serde::{Deserialize, Serialize};

use crate::ErrorCode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub state: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl Envelope {
    /// Wraps a successful payload.
    ///
    /// Falls back to an internal-error envelope if the payload cannot be
    /// serialized, which only happens on a programming error.
    #[must_use]
    pub fn ok<T: Serialize>(data: T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                state: ErrorCode::Ok.state(),
                message: "success".to_string(),
                data: Some(value),
            },
            Err(e) => Self::error(ErrorCode::Internal, format!("failed to encode response: {e}")),
        }
    }

    #[must_use]
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            state: code.state(),
            message: message.into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope() {
        let env = Envelope::ok(serde_json::json!({"id": 1}));
        assert_eq!(env.state, 0);
        assert_eq!(env.message, "success");
        assert_eq!(env.data.unwrap()["id"], 1);
    }

    #[test]
    fn test_error_envelope() {
        let env = Envelope::error(ErrorCode::Unauthenticated, "authentication required");
        assert_eq!(env.state, 16);
        assert_eq!(env.message, "authentication required");
        assert!(env.data.is_none());
    }

    #[test]
    fn test_envelope_json_shape() {
        let env = Envelope::error(ErrorCode::NotFound, "user not found");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["state"], 5);
        assert_eq!(json["message"], "user not found");
        assert_eq!(json["data"], serde_json::Value::Null);
    }
}
