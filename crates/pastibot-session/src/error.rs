//! Session error types.

use thiserror::Error;

/// Session error type.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Backend API error (credentials rejected, server failure, network, ...)
    #[error(transparent)]
    Api(#[from] pastibot_api::ApiError),

    /// Token storage error
    #[error("Storage error: {0}")]
    Storage(#[from] pastibot_storage::StorageError),

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Operation requires a signed-in session
    #[error("Not signed in")]
    NotSignedIn,

    /// Federated sign-in flow error (browser hand-off, callback, provider)
    #[error("Federated sign-in error: {0}")]
    Federated(String),

    /// Input rejected before any request was sent
    #[error("{0}")]
    InvalidInput(String),

    /// The session changed (login or logout) while a request was in flight;
    /// the response belongs to a superseded session and was discarded
    #[error("Session changed while the request was in flight")]
    Superseded,

    /// Waiting for the federated redirect timed out
    #[error("Timed out waiting for the sign-in redirect")]
    RedirectTimeout,

    /// IO error (callback listener)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors are connection failures, timeouts and 5xx responses;
    /// they never invalidate a stored token.
    pub fn is_transient(&self) -> bool {
        match self {
            SessionError::Api(e) => e.is_transient(),
            SessionError::RedirectTimeout => true,
            _ => false,
        }
    }

    /// Returns true if the server rejected the credential itself (401/403).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SessionError::Api(e) if e.is_unauthorized())
    }
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
