use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ctr::cipher::KeyIvInit;
use ctr::cipher::StreamCipher;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Digest;
use sha2::Sha256;

use super::errors::CryptoError;
use super::ENVELOPE_VERSION;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

const IV_LENGTH: usize = 16;

/// Encrypts and decrypts client-visible values.
///
/// Implementations provide confidentiality only. Compose with a
/// [`Signer`](super::Signer) when tamper evidence is required.
pub trait Crypter: Send + Sync + 'static {
    /// Encrypt a value into a versioned envelope.
    fn encrypt(&self, value: &str) -> Result<String, CryptoError>;

    /// Decrypt a versioned envelope.
    ///
    /// # Errors
    /// * `UnknownVersion` - Version tag is not supported
    /// * `InvalidFormat` - Envelope is not `version-payload`
    /// * `Decoding` - Payload is not valid base64
    /// * `Decryption` - Payload is too short or not valid UTF-8 once decrypted
    fn decrypt(&self, value: &str) -> Result<String, CryptoError>;
}

/// AES-256 in counter mode.
///
/// The key is the SHA-256 digest of the configured secret. Every call to
/// `encrypt` draws a fresh random IV from the OS generator, the envelope is
/// `1-base64(iv || ciphertext)`.
#[derive(Clone)]
pub struct AesCtrCrypter {
    key: [u8; 32],
}

impl AesCtrCrypter {
    /// Create a crypter deriving its key from `secret`.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: Sha256::digest(secret.as_ref()).into(),
        }
    }

    fn cipher(&self, iv: &[u8]) -> Result<Aes256Ctr, CryptoError> {
        Aes256Ctr::new_from_slices(&self.key, iv).map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }
}

impl Crypter for AesCtrCrypter {
    fn encrypt(&self, value: &str) -> Result<String, CryptoError> {
        let mut iv = [0u8; IV_LENGTH];
        OsRng.fill_bytes(&mut iv);

        let mut buffer = value.as_bytes().to_vec();
        self.cipher(&iv)?.apply_keystream(&mut buffer);

        let mut payload = Vec::with_capacity(IV_LENGTH + buffer.len());
        payload.extend_from_slice(&iv);
        payload.extend_from_slice(&buffer);

        Ok(format!("{ENVELOPE_VERSION}-{}", STANDARD.encode(payload)))
    }

    fn decrypt(&self, value: &str) -> Result<String, CryptoError> {
        let (version, data) = value.split_once('-').ok_or(CryptoError::InvalidFormat)?;
        if version != ENVELOPE_VERSION {
            return Err(CryptoError::UnknownVersion(version.to_string()));
        }

        let payload = STANDARD
            .decode(data)
            .map_err(|e| CryptoError::Decoding(e.to_string()))?;
        if payload.len() < IV_LENGTH {
            return Err(CryptoError::Decryption("payload shorter than IV".to_string()));
        }

        let (iv, ciphertext) = payload.split_at(IV_LENGTH);
        let mut buffer = ciphertext.to_vec();
        self.cipher(iv)?.apply_keystream(&mut buffer);

        String::from_utf8(buffer).map_err(|e| CryptoError::Decryption(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_and_decrypt() {
        let crypter = AesCtrCrypter::new("secret");

        for plaintext in ["", "a", "hello world", "{\"json\":[1,2,3]}", "ünïcödé"] {
            let encrypted = crypter.encrypt(plaintext).expect("Failed to encrypt");
            assert!(encrypted.starts_with("1-"));
            assert_eq!(crypter.decrypt(&encrypted), Ok(plaintext.to_string()));
        }
    }

    #[test]
    fn test_encrypt_uses_fresh_iv() {
        let crypter = AesCtrCrypter::new("secret");

        let first = crypter.encrypt("same value").expect("Failed to encrypt");
        let second = crypter.encrypt("same value").expect("Failed to encrypt");

        assert_ne!(first, second);
    }

    #[test]
    fn test_decrypt_with_wrong_key() {
        let encrypted = AesCtrCrypter::new("secret")
            .encrypt("confidential")
            .expect("Failed to encrypt");

        let result = AesCtrCrypter::new("other").decrypt(&encrypted);
        assert_ne!(result, Ok("confidential".to_string()));
    }

    #[test]
    fn test_decrypt_flipped_ciphertext_never_yields_original() {
        let crypter = AesCtrCrypter::new("secret");
        let encrypted = crypter.encrypt("confidential").expect("Failed to encrypt");
        let payload = STANDARD.decode(&encrypted[2..]).unwrap();

        for index in 0..payload.len() {
            let mut tampered = payload.clone();
            tampered[index] ^= 0x01;
            let envelope = format!("1-{}", STANDARD.encode(&tampered));

            assert_ne!(crypter.decrypt(&envelope), Ok("confidential".to_string()));
        }
    }

    #[test]
    fn test_decrypt_unknown_version() {
        let crypter = AesCtrCrypter::new("secret");
        let encrypted = crypter.encrypt("value").expect("Failed to encrypt");
        let altered = format!("7{}", &encrypted[1..]);

        assert_eq!(
            crypter.decrypt(&altered),
            Err(CryptoError::UnknownVersion("7".to_string()))
        );
    }

    #[test]
    fn test_decrypt_malformed() {
        let crypter = AesCtrCrypter::new("secret");

        assert_eq!(crypter.decrypt("novalue"), Err(CryptoError::InvalidFormat));
        assert!(matches!(
            crypter.decrypt("1-!!not base64!!"),
            Err(CryptoError::Decoding(_))
        ));
        assert!(matches!(
            crypter.decrypt("1-AAAA"),
            Err(CryptoError::Decryption(_))
        ));
    }
}
