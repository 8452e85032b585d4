use std::sync::Arc;

use async_trait::async_trait;
use auth::Clock;
use chrono::Duration;

use super::codec::AuthenticatorCodec;
use super::errors::AuthenticatorError;
use super::fingerprinting::Fingerprinting;
use super::models::SessionAuthenticator;
use super::models::Touched;
use super::ports::AuthenticatorService;
use crate::domain::http::AuthRequest;
use crate::domain::http::AuthResponse;
use crate::domain::http::CookieSettings;
use crate::domain::login::LoginInfo;

#[derive(Debug, Clone)]
pub struct SessionAuthenticatorSettings {
    /// Session cookie holding the serialized authenticator. Its name is the
    /// session key.
    pub cookie: CookieSettings,
    pub use_fingerprinting: bool,
    pub idle_timeout: Option<Duration>,
    pub expiry: Duration,
}

impl Default for SessionAuthenticatorSettings {
    fn default() -> Self {
        Self {
            cookie: CookieSettings::named("authenticator"),
            use_fingerprinting: true,
            idle_timeout: None,
            expiry: Duration::hours(12),
        }
    }
}

/// Keeps the whole authenticator client side, inside a signed session cookie.
pub struct SessionAuthenticatorService {
    settings: SessionAuthenticatorSettings,
    codec: AuthenticatorCodec,
    fingerprinting: Fingerprinting,
    clock: Arc<dyn Clock>,
}

impl SessionAuthenticatorService {
    pub fn new(
        settings: SessionAuthenticatorSettings,
        codec: AuthenticatorCodec,
        fingerprinting: Fingerprinting,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            codec,
            fingerprinting,
            clock,
        }
    }

    pub fn settings(&self) -> &SessionAuthenticatorSettings {
        &self.settings
    }
}

#[async_trait]
impl AuthenticatorService for SessionAuthenticatorService {
    type Authenticator = SessionAuthenticator;
    type Value = String;

    async fn create(
        &self,
        login_info: LoginInfo,
        request: &AuthRequest,
    ) -> Result<SessionAuthenticator, AuthenticatorError> {
        let now = self.clock.now();

        Ok(SessionAuthenticator {
            login_info,
            last_used_at: now,
            expires_at: now + self.settings.expiry,
            idle_timeout: self.settings.idle_timeout,
            fingerprint: self.fingerprinting.generate(request),
        })
    }

    async fn retrieve(
        &self,
        request: &AuthRequest,
    ) -> Result<Option<SessionAuthenticator>, AuthenticatorError> {
        let Some(value) = request.cookie(&self.settings.cookie.name) else {
            return Ok(None);
        };

        let authenticator = match self.codec.unserialize::<SessionAuthenticator>(&value) {
            Ok(authenticator) => authenticator,
            Err(e) => {
                tracing::info!(error = %e, "Rejected session authenticator");
                return Ok(None);
            }
        };

        if !self
            .fingerprinting
            .matches(authenticator.fingerprint.as_deref(), request)
        {
            tracing::info!(
                login_info = %authenticator.login_info,
                "Fingerprint does not match session authenticator"
            );
            return Ok(None);
        }

        Ok(Some(authenticator))
    }

    async fn init(&self, authenticator: SessionAuthenticator) -> Result<String, AuthenticatorError> {
        self.codec
            .serialize(&authenticator)
            .map_err(|e| AuthenticatorError::Initialization(e.to_string()))
    }

    fn embed(&self, value: String, response: AuthResponse) -> Result<AuthResponse, AuthenticatorError> {
        Ok(response.with_cookie(&self.settings.cookie.cookie(value))?)
    }

    fn embed_request(&self, value: String, request: AuthRequest) -> Result<AuthRequest, AuthenticatorError> {
        Ok(request.with_cookie(&self.settings.cookie.name, &value)?)
    }

    fn touch(&self, authenticator: SessionAuthenticator) -> Touched<SessionAuthenticator> {
        if authenticator.idle_timeout.is_some() {
            Touched::Touched(SessionAuthenticator {
                last_used_at: self.clock.now(),
                ..authenticator
            })
        } else {
            Touched::Untouched(authenticator)
        }
    }

    async fn update(
        &self,
        authenticator: SessionAuthenticator,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        let value = self
            .codec
            .serialize(&authenticator)
            .map_err(|e| AuthenticatorError::Update(e.to_string()))?;

        self.embed(value, response)
    }

    async fn renew(
        &self,
        authenticator: SessionAuthenticator,
        request: &AuthRequest,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        let renewed = self.create(authenticator.login_info, request).await?;
        let value = self
            .init(renewed)
            .await
            .map_err(|e| AuthenticatorError::Renewal(e.to_string()))?;

        self.embed(value, response)
    }

    async fn discard(
        &self,
        _authenticator: SessionAuthenticator,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        Ok(response.discarding_cookie(&self.settings.cookie.discarding())?)
    }
}

#[cfg(test)]
mod tests {
    use auth::util::DefaultFingerprintGenerator;
    use auth::util::FixedClock;
    use auth::Base64AuthenticatorEncoder;
    use auth::HmacSigner;
    use chrono::TimeZone;
    use chrono::Utc;
    use http::header::USER_AGENT;
    use http::HeaderMap;
    use http::HeaderValue;

    use super::*;
    use crate::domain::authenticator::models::Authenticator;

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn codec(key: &str) -> AuthenticatorCodec {
        AuthenticatorCodec::new(
            Arc::new(HmacSigner::new(key)),
            Arc::new(Base64AuthenticatorEncoder),
        )
    }

    fn service(settings: SessionAuthenticatorSettings, clock: Arc<FixedClock>) -> SessionAuthenticatorService {
        let fingerprinting = Fingerprinting::new(
            settings.use_fingerprinting,
            Arc::new(DefaultFingerprintGenerator::default()),
        );
        SessionAuthenticatorService::new(settings, codec("signer-key"), fingerprinting, clock)
    }

    fn request(user_agent: &'static str) -> AuthRequest {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(user_agent));
        AuthRequest::new(headers)
    }

    fn login_info() -> LoginInfo {
        LoginInfo::new("credentials", "user@example.com")
    }

    async fn issue(service: &SessionAuthenticatorService, request: AuthRequest) -> AuthRequest {
        let authenticator = service.create(login_info(), &request).await.unwrap();
        let value = service.init(authenticator).await.unwrap();
        service.embed_request(value, request).unwrap()
    }

    #[tokio::test]
    async fn test_roundtrip() {
        let clock = clock();
        let service = service(SessionAuthenticatorSettings::default(), clock.clone());

        let request = issue(&service, request("browser")).await;
        let retrieved = service.retrieve(&request).await.unwrap().unwrap();

        assert_eq!(retrieved.login_info, login_info());
        assert_eq!(retrieved.expires_at, clock.now() + Duration::hours(12));
        assert!(retrieved.fingerprint.is_some());
        assert!(retrieved.is_valid(clock.now()));
    }

    #[tokio::test]
    async fn test_embed_sets_session_cookie() {
        let service = service(SessionAuthenticatorSettings::default(), clock());
        let authenticator = service.create(login_info(), &request("browser")).await.unwrap();
        let value = service.init(authenticator).await.unwrap();

        let response = service.embed(value.clone(), AuthResponse::new()).unwrap();

        assert_eq!(response.cookie_value("authenticator"), Some(value));
        let header = response.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(!header.contains("Max-Age"));
        assert!(header.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_missing_cookie() {
        let service = service(SessionAuthenticatorSettings::default(), clock());
        assert!(service.retrieve(&request("browser")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tampered_value() {
        let service = service(SessionAuthenticatorSettings::default(), clock());
        let request = issue(&service, request("browser")).await;
        let value = request.cookie("authenticator").unwrap();

        let mut bytes = value.into_bytes();
        let middle = bytes.len() / 2;
        bytes[middle] = if bytes[middle] == b'A' { b'B' } else { b'A' };
        let tampered = request
            .with_cookie("authenticator", &String::from_utf8(bytes).unwrap())
            .unwrap();

        assert!(service.retrieve(&tampered).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_value_from_other_key_rejected() {
        let clock = clock();
        let issuing = service(SessionAuthenticatorSettings::default(), clock.clone());
        let verifying = SessionAuthenticatorService::new(
            SessionAuthenticatorSettings::default(),
            codec("other-key"),
            Fingerprinting::disabled(),
            clock,
        );

        let request = issue(&issuing, request("browser")).await;
        assert!(verifying.retrieve(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fingerprint_mismatch() {
        let service = service(SessionAuthenticatorSettings::default(), clock());
        let issued = issue(&service, request("browser-a")).await;
        let value = issued.cookie("authenticator").unwrap();

        let other_client = request("browser-b")
            .with_cookie("authenticator", &value)
            .unwrap();
        assert!(service.retrieve(&other_client).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fingerprinting_disabled() {
        let settings = SessionAuthenticatorSettings {
            use_fingerprinting: false,
            ..SessionAuthenticatorSettings::default()
        };
        let service = service(settings, clock());
        let issued = issue(&service, request("browser-a")).await;
        let value = issued.cookie("authenticator").unwrap();

        let other_client = request("browser-b")
            .with_cookie("authenticator", &value)
            .unwrap();
        assert!(service.retrieve(&other_client).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_touch_with_idle_timeout() {
        let clock = clock();
        let settings = SessionAuthenticatorSettings {
            idle_timeout: Some(Duration::minutes(30)),
            ..SessionAuthenticatorSettings::default()
        };
        let service = service(settings, clock.clone());
        let authenticator = service.create(login_info(), &request("browser")).await.unwrap();

        clock.advance(Duration::minutes(20));
        let touched = service.touch(authenticator);

        assert!(touched.is_touched());
        assert_eq!(touched.authenticator().last_used_at, clock.now());

        clock.advance(Duration::minutes(29));
        assert!(touched.authenticator().is_valid(clock.now()));
    }

    #[tokio::test]
    async fn test_touch_without_idle_timeout() {
        let service = service(SessionAuthenticatorSettings::default(), clock());
        let authenticator = service.create(login_info(), &request("browser")).await.unwrap();

        assert!(!service.touch(authenticator).is_touched());
    }

    #[tokio::test]
    async fn test_discard() {
        let service = service(SessionAuthenticatorSettings::default(), clock());
        let authenticator = service.create(login_info(), &request("browser")).await.unwrap();

        let response = service.discard(authenticator, AuthResponse::new()).await.unwrap();

        assert_eq!(response.cookie_value("authenticator"), Some(String::new()));
    }

    #[tokio::test]
    async fn test_renew_issues_fresh_expiry() {
        let clock = clock();
        let service = service(SessionAuthenticatorSettings::default(), clock.clone());
        let request = request("browser");
        let authenticator = service.create(login_info(), &request).await.unwrap();

        clock.advance(Duration::hours(1));
        let response = service
            .renew(authenticator.clone(), &request, AuthResponse::new())
            .await
            .unwrap();

        let value = response.cookie_value("authenticator").unwrap();
        let renewed = service
            .retrieve(&request.with_cookie("authenticator", &value).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renewed.expires_at, authenticator.expires_at + Duration::hours(1));
    }
}
