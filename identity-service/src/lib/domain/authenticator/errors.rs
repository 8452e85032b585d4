use thiserror::Error;

/// Error for authenticator lifecycle operations.
///
/// Each variant names the lifecycle step that failed. Retrieval of an absent,
/// tampered or expired value is not an error; it yields no authenticator.
#[derive(Debug, Clone, Error)]
pub enum AuthenticatorError {
    #[error("Could not create authenticator: {0}")]
    Creation(String),

    #[error("Could not retrieve authenticator: {0}")]
    Retrieval(String),

    #[error("Could not initialize authenticator: {0}")]
    Initialization(String),

    #[error("Could not update authenticator: {0}")]
    Update(String),

    #[error("Could not renew authenticator: {0}")]
    Renewal(String),

    #[error("Could not discard authenticator: {0}")]
    Discard(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Authenticator of strategy {found} passed to {expected} service")]
    StrategyMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl From<http::header::InvalidHeaderValue> for AuthenticatorError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        AuthenticatorError::InvalidHeader(err.to_string())
    }
}
