use auth::CryptoError;
use thiserror::Error;

/// Error for social state handling and OAuth callbacks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OAuthStateError {
    #[error("State cookie is missing")]
    MissingState,

    #[error("State cookie is malformed: {0}")]
    Malformed(String),

    #[error("State has expired")]
    Expired,

    #[error("Provider did not echo the {0} parameter")]
    MissingEcho(&'static str),

    #[error("Echoed {0} does not match the stored value")]
    Mismatch(&'static str),

    #[error("No handler registered for state item {0}")]
    UnknownItem(String),

    #[error("Required state item {0} is missing")]
    MissingItem(String),

    #[error("Access denied by provider {0}")]
    AccessDenied(String),

    #[error("Provider {provider} returned error {error}")]
    ProviderError { provider: String, error: String },

    #[error("Provider {0} did not return an authorization code")]
    MissingCode(String),

    #[error("Provider {0} did not return a verifier")]
    MissingVerifier(String),

    #[error("State could not be generated: {0}")]
    Generation(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
