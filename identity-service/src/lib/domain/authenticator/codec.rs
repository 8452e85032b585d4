use std::sync::Arc;

use auth::AuthenticatorEncoder;
use auth::CryptoError;
use auth::Signer;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Error turning an authenticator into a transport value or back.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Malformed authenticator: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serializes authenticators as signed, encoded JSON.
///
/// The JSON is signed first and the signed envelope is then encoded, so with
/// an encrypting encoder the signature itself is never visible to the client.
#[derive(Clone)]
pub struct AuthenticatorCodec {
    signer: Arc<dyn Signer>,
    encoder: Arc<dyn AuthenticatorEncoder>,
}

impl AuthenticatorCodec {
    pub fn new(signer: Arc<dyn Signer>, encoder: Arc<dyn AuthenticatorEncoder>) -> Self {
        Self { signer, encoder }
    }

    pub fn serialize<T: Serialize>(&self, authenticator: &T) -> Result<String, CodecError> {
        let json = serde_json::to_string(authenticator)?;
        let signed = self.signer.sign(&json)?;

        Ok(self.encoder.encode(&signed)?)
    }

    pub fn unserialize<T: DeserializeOwned>(&self, value: &str) -> Result<T, CodecError> {
        let signed = self.encoder.decode(value)?;
        let json = self.signer.extract(&signed)?;

        Ok(serde_json::from_str(&json)?)
    }
}
