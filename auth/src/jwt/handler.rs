use std::str::FromStr;

use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::Deserialize;
use serde::Serialize;

use super::errors::JwtError;

/// Key material for a signing algorithm.
#[derive(Clone)]
pub enum JwtKey {
    /// Shared secret for the HMAC family.
    Secret(Vec<u8>),
    /// PEM encoded key pair for RSA, EC and EdDSA algorithms.
    Pem { private: Vec<u8>, public: Vec<u8> },
}

/// JWT token handler for encoding and decoding tokens.
///
/// Generic over the claims type to allow callers to define their own token
/// payload. Built through [`JwtHandler::from_algorithm`], which selects the
/// key type from the algorithm identifier.
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: Option<String>,
    validate_expiration: bool,
}

impl JwtHandler {
    /// Build a handler for the algorithm named by `algorithm`.
    ///
    /// # Arguments
    /// * `algorithm` - Identifier such as `HS256`, `RS256`, `ES256` or `EdDSA`
    /// * `key` - Key material matching the algorithm family
    ///
    /// # Errors
    /// * `UnsupportedAlgorithm` - Identifier is unknown
    /// * `InvalidKey` - Key material does not fit the algorithm or cannot be parsed
    pub fn from_algorithm(algorithm: &str, key: &JwtKey) -> Result<Self, JwtError> {
        let algorithm = Algorithm::from_str(algorithm)
            .map_err(|_| JwtError::UnsupportedAlgorithm(algorithm.to_string()))?;
        let invalid = |e: jsonwebtoken::errors::Error| JwtError::InvalidKey(e.to_string());

        let (encoding_key, decoding_key) = match (algorithm, key) {
            (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512, JwtKey::Secret(secret)) => {
                if secret.is_empty() {
                    return Err(JwtError::InvalidKey("empty secret".to_string()));
                }
                (
                    EncodingKey::from_secret(secret),
                    DecodingKey::from_secret(secret),
                )
            }
            (
                Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512,
                JwtKey::Pem { private, public },
            ) => (
                EncodingKey::from_rsa_pem(private).map_err(invalid)?,
                DecodingKey::from_rsa_pem(public).map_err(invalid)?,
            ),
            (Algorithm::ES256 | Algorithm::ES384, JwtKey::Pem { private, public }) => (
                EncodingKey::from_ec_pem(private).map_err(invalid)?,
                DecodingKey::from_ec_pem(public).map_err(invalid)?,
            ),
            (Algorithm::EdDSA, JwtKey::Pem { private, public }) => (
                EncodingKey::from_ed_pem(private).map_err(invalid)?,
                DecodingKey::from_ed_pem(public).map_err(invalid)?,
            ),
            (algorithm, _) => {
                return Err(JwtError::InvalidKey(format!(
                    "key material does not match {:?}",
                    algorithm
                )))
            }
        };

        Ok(Self {
            encoding_key,
            decoding_key,
            algorithm,
            issuer: None,
            validate_expiration: true,
        })
    }

    /// Require and verify the `iss` claim.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Leave the `exp` check to the caller, which compares against its own clock.
    pub fn without_expiration_check(mut self) -> Self {
        self.validate_expiration = false;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Encode claims into a JWT token.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        let header = Header::new(self.algorithm);

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Decode and validate a JWT token.
    ///
    /// The signature is verified before any claim is returned.
    ///
    /// # Errors
    /// * `TokenExpired` - Token has expired (when expiration is checked)
    /// * `DecodingFailed` - Signature, issuer or format is invalid
    pub fn decode<T: for<'de> Deserialize<'de>>(&self, token: &str) -> Result<T, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = self.validate_expiration;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let token_data =
            decode::<T>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                _ => JwtError::DecodingFailed(e.to_string()),
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn hs256(secret: &[u8]) -> JwtHandler {
        JwtHandler::from_algorithm("HS256", &JwtKey::Secret(secret.to_vec())).unwrap()
    }
    use crate::jwt::Claims;

    fn claims() -> Claims {
        Claims::new()
            .with_subject("user123")
            .with_issuer("test")
            .with_expiration(Utc::now().timestamp() + 3600)
    }

    #[test]
    fn test_encode_and_decode() {
        let handler = hs256(b"my_secret_key_at_least_32_bytes_long!");

        let claims = claims();
        let token = handler.encode(&claims).expect("Failed to encode token");
        assert_eq!(token.split('.').count(), 3);

        let decoded: Claims = handler.decode(&token).expect("Failed to decode token");
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_decode_invalid_token() {
        let handler = hs256(b"my_secret_key_at_least_32_bytes_long!");

        let result = handler.decode::<Claims>("invalid.token.here");
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_with_wrong_secret() {
        let handler1 = hs256(b"secret1_at_least_32_bytes_long_key!");
        let handler2 = hs256(b"secret2_at_least_32_bytes_long_key!");

        let token = handler1.encode(&claims()).expect("Failed to encode token");

        let result = handler2.decode::<Claims>(&token);
        assert!(matches!(result, Err(JwtError::DecodingFailed(_))));
    }

    #[test]
    fn test_decode_expired() {
        let handler = hs256(b"my_secret_key_at_least_32_bytes_long!");
        let expired = claims().with_expiration(Utc::now().timestamp() - 3600);
        let token = handler.encode(&expired).expect("Failed to encode token");

        assert!(matches!(
            handler.decode::<Claims>(&token),
            Err(JwtError::TokenExpired)
        ));

        let lenient = hs256(b"my_secret_key_at_least_32_bytes_long!")
            .without_expiration_check();
        let decoded: Claims = lenient.decode(&token).expect("Failed to decode token");
        assert_eq!(decoded.sub, Some("user123".to_string()));
    }

    #[test]
    fn test_decode_wrong_issuer() {
        let issuing = hs256(b"my_secret_key_at_least_32_bytes_long!");
        let verifying =
            hs256(b"my_secret_key_at_least_32_bytes_long!").with_issuer("someone-else");

        let token = issuing.encode(&claims()).expect("Failed to encode token");
        assert!(verifying.decode::<Claims>(&token).is_err());
    }

    #[test]
    fn test_decode_tampered_payload() {
        let handler = hs256(b"my_secret_key_at_least_32_bytes_long!");
        let token = handler.encode(&claims()).expect("Failed to encode token");
        let other = handler
            .encode(&claims().with_subject("admin"))
            .expect("Failed to encode token");

        // Payload of one token with the signature of another.
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert!(handler.decode::<Claims>(&forged).is_err());
    }

    #[test]
    fn test_from_algorithm_hmac() {
        let key = JwtKey::Secret(b"my_secret_key_at_least_32_bytes_long!".to_vec());

        for name in ["HS256", "HS384", "HS512"] {
            let handler = JwtHandler::from_algorithm(name, &key).expect("Failed to build handler");
            let token = handler.encode(&claims()).expect("Failed to encode token");
            let decoded: Claims = handler.decode(&token).expect("Failed to decode token");
            assert_eq!(decoded.sub, Some("user123".to_string()));
        }
    }

    #[test]
    fn test_from_algorithm_unknown() {
        let key = JwtKey::Secret(b"secret".to_vec());
        assert!(matches!(
            JwtHandler::from_algorithm("XX999", &key),
            Err(JwtError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_from_algorithm_key_mismatch() {
        let secret = JwtKey::Secret(b"secret".to_vec());
        assert!(matches!(
            JwtHandler::from_algorithm("RS256", &secret),
            Err(JwtError::InvalidKey(_))
        ));

        let pem = JwtKey::Pem {
            private: b"not a pem".to_vec(),
            public: b"not a pem".to_vec(),
        };
        assert!(matches!(
            JwtHandler::from_algorithm("HS256", &pem),
            Err(JwtError::InvalidKey(_))
        ));
        assert!(matches!(
            JwtHandler::from_algorithm("RS256", &pem),
            Err(JwtError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_from_algorithm_empty_secret() {
        assert!(matches!(
            JwtHandler::from_algorithm("HS256", &JwtKey::Secret(Vec::new())),
            Err(JwtError::InvalidKey(_))
        ));
    }
}
