use thiserror::Error;

/// Error type for signing, encryption and encoding operations.
///
/// Every variant is a hard failure: callers must never fall back to
/// interpreting the payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Bad signature")]
    BadSignature,

    #[error("Unknown envelope version: {0}")]
    UnknownVersion(String),

    #[error("Invalid envelope format")]
    InvalidFormat,

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Failed to decode payload: {0}")]
    Decoding(String),

    #[error("Failed to decrypt payload: {0}")]
    Decryption(String),
}
