use std::net::IpAddr;

use http::header::ACCEPT_CHARSET;
use http::header::ACCEPT_LANGUAGE;
use http::header::USER_AGENT;
use http::HeaderMap;
use http::HeaderName;
use sha2::Digest;
use sha2::Sha256;

/// Derives a hash from stable request characteristics.
pub trait FingerprintGenerator: Send + Sync + 'static {
    fn generate(&self, headers: &HeaderMap, remote_addr: Option<IpAddr>) -> String;
}

/// Hashes `User-Agent`, `Accept-Language`, `Accept-Charset` and optionally the
/// remote address.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFingerprintGenerator {
    include_remote_address: bool,
}

impl DefaultFingerprintGenerator {
    pub fn new(include_remote_address: bool) -> Self {
        Self {
            include_remote_address,
        }
    }

    fn header<'a>(headers: &'a HeaderMap, name: &HeaderName) -> &'a str {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

impl FingerprintGenerator for DefaultFingerprintGenerator {
    fn generate(&self, headers: &HeaderMap, remote_addr: Option<IpAddr>) -> String {
        let mut parts = vec![
            Self::header(headers, &USER_AGENT).to_string(),
            Self::header(headers, &ACCEPT_LANGUAGE).to_string(),
            Self::header(headers, &ACCEPT_CHARSET).to_string(),
        ];
        if self.include_remote_address {
            parts.push(remote_addr.map(|a| a.to_string()).unwrap_or_default());
        }

        hex::encode(Sha256::digest(parts.join(":").as_bytes()))
    }
}
