use thiserror::Error;

/// Failure taxonomy for the whole service.
///
/// Validation errors block the operation before any network call is made.
/// Backend errors carry whatever message the hosted store returned. Nothing
/// here is fatal: callers log, surface a toast, and leave state unchanged.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("backend error {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("function {name} failed: {message}")]
    Function { name: String, message: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// Only transient transport failures and server-side 5xx responses are
    /// worth retrying; everything else would fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network(_) => true,
            AppError::Backend { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        let server = AppError::Backend {
            status: 503,
            message: "unavailable".to_string(),
        };
        let client = AppError::Backend {
            status: 404,
            message: "missing".to_string(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(!AppError::validation("name is required").is_retryable());
    }
}
