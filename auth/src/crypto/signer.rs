use hmac::Hmac;
use hmac::Mac;
use sha1::Sha1;
use subtle::ConstantTimeEq;

use super::errors::CryptoError;
use super::ENVELOPE_VERSION;

type HmacSha1 = Hmac<Sha1>;

/// Pepper used when none is configured.
pub const DEFAULT_PEPPER: &str = "-identity-service-signer-";

/// Signs values so that tampering on the client side can be detected.
pub trait Signer: Send + Sync + 'static {
    /// Sign a value.
    ///
    /// # Returns
    /// Envelope in the form `version-signature-data`
    ///
    /// # Errors
    /// * `InvalidKey` - The MAC could not be keyed
    fn sign(&self, data: &str) -> Result<String, CryptoError>;

    /// Verify an envelope and return the embedded data.
    ///
    /// # Errors
    /// * `UnknownVersion` - Version tag is not supported
    /// * `InvalidFormat` - Envelope is not `version-signature-data`
    /// * `BadSignature` - Signature does not match the data
    fn extract(&self, message: &str) -> Result<String, CryptoError>;
}

/// HMAC-SHA1 signer.
///
/// The MAC is computed over `pepper || data || pepper` and hex encoded.
#[derive(Clone)]
pub struct HmacSigner {
    key: Vec<u8>,
    pepper: String,
}

impl HmacSigner {
    /// Create a signer with the default pepper.
    ///
    /// # Arguments
    /// * `key` - Secret key for the MAC
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
            pepper: DEFAULT_PEPPER.to_string(),
        }
    }

    /// Replace the pepper.
    pub fn with_pepper(mut self, pepper: impl Into<String>) -> Self {
        self.pepper = pepper.into();
        self
    }

    fn signature(&self, data: &str) -> Result<String, CryptoError> {
        let mut mac = HmacSha1::new_from_slice(&self.key)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        mac.update(self.pepper.as_bytes());
        mac.update(data.as_bytes());
        mac.update(self.pepper.as_bytes());

        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl Signer for HmacSigner {
    fn sign(&self, data: &str) -> Result<String, CryptoError> {
        let signature = self.signature(data)?;
        Ok(format!("{ENVELOPE_VERSION}-{signature}-{data}"))
    }

    fn extract(&self, message: &str) -> Result<String, CryptoError> {
        let (version, rest) = message.split_once('-').ok_or(CryptoError::InvalidFormat)?;
        if version != ENVELOPE_VERSION {
            return Err(CryptoError::UnknownVersion(version.to_string()));
        }

        let (signature, data) = rest.split_once('-').ok_or(CryptoError::InvalidFormat)?;
        let expected = self.signature(data)?;

        // Compared on the hex text so that case changes are rejected too.
        if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            Ok(data.to_string())
        } else {
            Err(CryptoError::BadSignature)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> HmacSigner {
        HmacSigner::new("k").with_pepper("-p-")
    }

    #[test]
    fn test_sign_format() {
        let signed = signer().sign("abc").expect("Failed to sign");

        let parts: Vec<&str> = signed.splitn(3, '-').collect();
        assert_eq!(parts[0], "1");
        assert_eq!(parts[1].len(), 40);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(parts[2], "abc");
    }

    #[test]
    fn test_extract_signed_value() {
        let signer = signer();
        let signed = signer.sign("abc").expect("Failed to sign");

        assert_eq!(signer.extract(&signed), Ok("abc".to_string()));
    }

    #[test]
    fn test_extract_data_containing_separator() {
        let signer = signer();
        let signed = signer.sign("a-b-c").expect("Failed to sign");

        assert_eq!(signer.extract(&signed), Ok("a-b-c".to_string()));
    }

    #[test]
    fn test_extract_altered_signature() {
        let signer = signer();
        let signed = signer.sign("abc").expect("Failed to sign");

        let mut altered: Vec<char> = signed.chars().collect();
        altered[2] = if altered[2] == '0' { '1' } else { '0' };
        let altered: String = altered.into_iter().collect();

        assert_eq!(signer.extract(&altered), Err(CryptoError::BadSignature));
    }

    #[test]
    fn test_extract_rejects_every_flipped_byte() {
        let signer = signer();
        let signed = signer.sign("payload").expect("Failed to sign");

        // Skip the version tag and the separator after it.
        for index in 2..signed.len() {
            let mut bytes = signed.clone().into_bytes();
            if bytes[index] == b'-' {
                continue;
            }
            bytes[index] = if bytes[index] == b'x' { b'y' } else { b'x' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert!(
                signer.extract(&tampered).is_err(),
                "tampered byte {} was accepted",
                index
            );
        }
    }

    #[test]
    fn test_extract_uppercased_signature() {
        let signer = signer();
        let signed = signer.sign("abc").expect("Failed to sign");
        let (head, data) = signed.rsplit_once('-').unwrap();

        let altered = format!("{}-{}", head.to_uppercase(), data);
        assert_eq!(signer.extract(&altered), Err(CryptoError::BadSignature));
    }

    #[test]
    fn test_extract_with_different_key() {
        let signed = signer().sign("abc").expect("Failed to sign");
        let other = HmacSigner::new("other").with_pepper("-p-");

        assert_eq!(other.extract(&signed), Err(CryptoError::BadSignature));
    }

    #[test]
    fn test_extract_with_different_pepper() {
        let signed = signer().sign("abc").expect("Failed to sign");
        let other = HmacSigner::new("k");

        assert_eq!(other.extract(&signed), Err(CryptoError::BadSignature));
    }

    #[test]
    fn test_extract_unknown_version() {
        let signer = signer();
        let signed = signer.sign("abc").expect("Failed to sign");
        let altered = format!("2{}", &signed[1..]);

        assert_eq!(
            signer.extract(&altered),
            Err(CryptoError::UnknownVersion("2".to_string()))
        );
        assert_eq!(
            signer.extract("9-whatever"),
            Err(CryptoError::UnknownVersion("9".to_string()))
        );
    }

    #[test]
    fn test_extract_invalid_format() {
        let signer = signer();

        assert_eq!(signer.extract("abc"), Err(CryptoError::InvalidFormat));
        assert_eq!(signer.extract("1-abc"), Err(CryptoError::InvalidFormat));
    }
}
