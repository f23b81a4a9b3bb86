//! API error types.

use thiserror::Error;

/// Error type for backend API operations.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Token missing, expired, or revoked (401/403)
    #[error("Unauthorized: {message}")]
    Unauthorized { status: u16, message: String },

    /// Backend rejected the request (4xx); message is surfaced verbatim
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Server-side failure (5xx); transient, the user may retry
    #[error("Server error {status} ({body_summary})")]
    Server { status: u16, body_summary: String },

    /// HTTP transport error (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Unexpected response shape: {0}")]
    Decode(String),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request rejected client-side before sending
    #[error("Invalid request: {0}")]
    Invalid(String),
}

impl ApiError {
    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors include:
    /// - Connection failures and timeouts
    /// - HTTP 5xx responses
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Server { .. } => true,
            ApiError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            _ => false,
        }
    }

    /// Returns true if the backend explicitly rejected the session token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient_server_error() {
        let err = ApiError::Server {
            status: 503,
            body_summary: "len=0,digest=0000000000000000".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_is_not_transient_unauthorized() {
        let err = ApiError::Unauthorized {
            status: 401,
            message: "token expired".to_string(),
        };
        assert!(!err.is_transient());
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_is_not_transient_rejected() {
        let err = ApiError::Rejected {
            status: 400,
            message: "Correo o contraseña incorrectos".to_string(),
        };
        assert!(!err.is_transient());
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_rejected_message_is_verbatim() {
        let err = ApiError::Rejected {
            status: 422,
            message: "El código de cuidador no es válido".to_string(),
        };
        assert_eq!(err.to_string(), "El código de cuidador no es válido");
    }

    #[test]
    fn test_is_not_transient_decode() {
        assert!(!ApiError::Decode("missing field `id`".to_string()).is_transient());
    }
}
