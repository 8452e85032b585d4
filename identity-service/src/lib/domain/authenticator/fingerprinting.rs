use std::sync::Arc;

use auth::FingerprintGenerator;

use crate::domain::http::AuthRequest;

/// Binds cookie-based authenticators to the client that created them.
#[derive(Clone)]
pub struct Fingerprinting {
    generator: Option<Arc<dyn FingerprintGenerator>>,
}

impl Fingerprinting {
    pub fn new(enabled: bool, generator: Arc<dyn FingerprintGenerator>) -> Self {
        Self {
            generator: enabled.then_some(generator),
        }
    }

    pub fn disabled() -> Self {
        Self { generator: None }
    }

    /// Fingerprint to store with a new authenticator.
    pub fn generate(&self, request: &AuthRequest) -> Option<String> {
        self.generator
            .as_ref()
            .map(|generator| generator.generate(request.headers(), request.remote_addr()))
    }

    /// Whether a stored fingerprint matches the current request. Always true
    /// when fingerprinting is disabled or nothing was stored.
    pub fn matches(&self, stored: Option<&str>, request: &AuthRequest) -> bool {
        match (stored, self.generate(request)) {
            (Some(stored), Some(current)) => stored == current,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use auth::util::DefaultFingerprintGenerator;
    use http::header::USER_AGENT;
    use http::HeaderMap;
    use http::HeaderValue;

    use super::*;

    fn request(user_agent: &'static str) -> AuthRequest {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(user_agent));
        AuthRequest::new(headers)
    }

    #[test]
    fn test_matches() {
        let fingerprinting = Fingerprinting::new(true, Arc::new(DefaultFingerprintGenerator::default()));
        let stored = fingerprinting.generate(&request("browser-a"));

        assert!(stored.is_some());
        assert!(fingerprinting.matches(stored.as_deref(), &request("browser-a")));
        assert!(!fingerprinting.matches(stored.as_deref(), &request("browser-b")));
        assert!(fingerprinting.matches(None, &request("browser-b")));
    }

    #[test]
    fn test_disabled() {
        let fingerprinting = Fingerprinting::disabled();

        assert_eq!(fingerprinting.generate(&request("browser-a")), None);
        assert!(fingerprinting.matches(Some("anything"), &request("browser-b")));
    }
}
