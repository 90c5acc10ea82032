use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorMessage {
    #[serde(default)]
    pub lang: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    #[serde(default)]
    pub code: String,
    pub message: ErrorMessage,
}

/// `{"error": {...}}` body returned by the remote API on failed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiError,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: ErrorMessage {
                lang: None,
                value: message.into(),
            },
        }
    }

    /// Extracts the error from a raw response body, if it carries one.
    pub fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .map(|envelope| envelope.error)
    }
}

#[derive(Debug, Error)]
#[error("remote API returned status {status}: {message}")]
pub struct ApiException {
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
}

impl ApiException {
    pub fn new(status: u16, body: &str) -> Self {
        match ApiError::from_body(body) {
            Some(error) => Self {
                status,
                code: (!error.code.is_empty()).then_some(error.code),
                message: error.message.value,
            },
            None => Self {
                status,
                code: None,
                message: body.trim().to_string(),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

impl From<ApiError> for ErrorEnvelope {
    fn from(value: ApiError) -> Self {
        Self { error: value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_prefers_structured_error_message() {
        let body = r#"{"error":{"code":"","message":{"lang":"","value":"Forbidden: Account"}}}"#;
        let err = ApiException::new(403, body);
        assert_eq!(err.message, "Forbidden: Account");
        assert_eq!(err.code, None);
        assert_eq!(
            err.to_string(),
            "remote API returned status 403: Forbidden: Account"
        );
    }

    #[test]
    fn exception_falls_back_to_raw_body() {
        let err = ApiException::new(404, "  not here \n");
        assert!(err.is_not_found());
        assert_eq!(err.message, "not here");
    }
}
