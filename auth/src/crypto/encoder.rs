use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::crypter::Crypter;
use super::errors::CryptoError;

/// Transforms serialized authenticator data before it leaves the server.
pub trait AuthenticatorEncoder: Send + Sync + 'static {
    fn encode(&self, data: &str) -> Result<String, CryptoError>;

    fn decode(&self, data: &str) -> Result<String, CryptoError>;
}

/// Plain base64 encoding. Obfuscates the payload, does not hide it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64AuthenticatorEncoder;

impl AuthenticatorEncoder for Base64AuthenticatorEncoder {
    fn encode(&self, data: &str) -> Result<String, CryptoError> {
        Ok(STANDARD.encode(data))
    }

    fn decode(&self, data: &str) -> Result<String, CryptoError> {
        let bytes = STANDARD
            .decode(data)
            .map_err(|e| CryptoError::Decoding(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| CryptoError::Decoding(e.to_string()))
    }
}

/// Encrypts the payload so that its content is confidential.
#[derive(Clone)]
pub struct CrypterAuthenticatorEncoder {
    crypter: Arc<dyn Crypter>,
}

impl CrypterAuthenticatorEncoder {
    pub fn new(crypter: Arc<dyn Crypter>) -> Self {
        Self { crypter }
    }
}

impl AuthenticatorEncoder for CrypterAuthenticatorEncoder {
    fn encode(&self, data: &str) -> Result<String, CryptoError> {
        self.crypter.encrypt(data)
    }

    fn decode(&self, data: &str) -> Result<String, CryptoError> {
        self.crypter.decrypt(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::AesCtrCrypter;

    #[test]
    fn test_base64_encoder() {
        let encoder = Base64AuthenticatorEncoder;

        let encoded = encoder.encode("{\"a\":1}").expect("Failed to encode");
        assert_eq!(encoded, "eyJhIjoxfQ==");
        assert_eq!(encoder.decode(&encoded), Ok("{\"a\":1}".to_string()));
    }

    #[test]
    fn test_base64_encoder_rejects_garbage() {
        let encoder = Base64AuthenticatorEncoder;
        assert!(matches!(
            encoder.decode("not*base64"),
            Err(CryptoError::Decoding(_))
        ));
    }

    #[test]
    fn test_crypter_encoder_hides_payload() {
        let encoder = CrypterAuthenticatorEncoder::new(Arc::new(AesCtrCrypter::new("secret")));

        let encoded = encoder.encode("user@example.com").expect("Failed to encode");
        assert!(!encoded.contains("user@example.com"));
        assert_eq!(encoder.decode(&encoded), Ok("user@example.com".to_string()));
    }
}
