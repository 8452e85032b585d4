use std::sync::Arc;

use async_trait::async_trait;
use auth::Clock;
use auth::IdGenerator;
use chrono::Duration;

use super::codec::AuthenticatorCodec;
use super::errors::AuthenticatorError;
use super::fingerprinting::Fingerprinting;
use super::models::CookieAuthenticator;
use super::models::Touched;
use super::ports::AuthenticatorRepository;
use super::ports::AuthenticatorService;
use crate::domain::http::AuthRequest;
use crate::domain::http::AuthResponse;
use crate::domain::http::Cookie;
use crate::domain::http::CookieSettings;
use crate::domain::login::LoginInfo;

#[derive(Debug, Clone)]
pub struct CookieAuthenticatorSettings {
    pub cookie: CookieSettings,
    pub use_fingerprinting: bool,
    pub idle_timeout: Option<Duration>,
    pub expiry: Duration,
}

impl Default for CookieAuthenticatorSettings {
    fn default() -> Self {
        Self {
            cookie: CookieSettings::named("id"),
            use_fingerprinting: true,
            idle_timeout: None,
            expiry: Duration::hours(12),
        }
    }
}

/// Transports the authenticator in a cookie.
///
/// With a repository the cookie holds only the authenticator id and the
/// authenticator lives server side. Without one the cookie holds the signed,
/// encoded authenticator itself.
pub struct CookieAuthenticatorService {
    settings: CookieAuthenticatorSettings,
    repository: Option<Arc<dyn AuthenticatorRepository<CookieAuthenticator>>>,
    codec: AuthenticatorCodec,
    fingerprinting: Fingerprinting,
    id_generator: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl CookieAuthenticatorService {
    pub fn new(
        settings: CookieAuthenticatorSettings,
        repository: Option<Arc<dyn AuthenticatorRepository<CookieAuthenticator>>>,
        codec: AuthenticatorCodec,
        fingerprinting: Fingerprinting,
        id_generator: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            repository,
            codec,
            fingerprinting,
            id_generator,
            clock,
        }
    }

    pub fn is_stateful(&self) -> bool {
        self.repository.is_some()
    }

    fn cookie(&self, value: String, authenticator: &CookieAuthenticator) -> Cookie {
        self.settings
            .cookie
            .clone()
            .with_max_age(authenticator.cookie_max_age)
            .cookie(value)
    }

    async fn lookup(&self, value: &str) -> Result<Option<CookieAuthenticator>, AuthenticatorError> {
        match &self.repository {
            Some(repository) => repository
                .find(value)
                .await
                .map_err(|e| AuthenticatorError::Retrieval(e.to_string())),
            None => match self.codec.unserialize::<CookieAuthenticator>(value) {
                Ok(authenticator) => Ok(Some(authenticator)),
                Err(e) => {
                    tracing::info!(error = %e, "Rejected cookie authenticator");
                    Ok(None)
                }
            },
        }
    }
}

#[async_trait]
impl AuthenticatorService for CookieAuthenticatorService {
    type Authenticator = CookieAuthenticator;
    type Value = Cookie;

    async fn create(
        &self,
        login_info: LoginInfo,
        request: &AuthRequest,
    ) -> Result<CookieAuthenticator, AuthenticatorError> {
        let id = self
            .id_generator
            .generate()
            .await
            .map_err(|e| AuthenticatorError::Creation(e.to_string()))?;
        let now = self.clock.now();

        Ok(CookieAuthenticator {
            id,
            login_info,
            last_used_at: now,
            expires_at: now + self.settings.expiry,
            idle_timeout: self.settings.idle_timeout,
            cookie_max_age: self.settings.cookie.max_age,
            fingerprint: self.fingerprinting.generate(request),
        })
    }

    async fn retrieve(
        &self,
        request: &AuthRequest,
    ) -> Result<Option<CookieAuthenticator>, AuthenticatorError> {
        let Some(value) = request.cookie(&self.settings.cookie.name) else {
            return Ok(None);
        };

        match self.lookup(&value).await? {
            Some(authenticator)
                if !self
                    .fingerprinting
                    .matches(authenticator.fingerprint.as_deref(), request) =>
            {
                tracing::info!(
                    login_info = %authenticator.login_info,
                    "Fingerprint does not match cookie authenticator"
                );
                Ok(None)
            }
            found => Ok(found),
        }
    }

    async fn init(&self, authenticator: CookieAuthenticator) -> Result<Cookie, AuthenticatorError> {
        let value = match &self.repository {
            Some(repository) => repository
                .add(authenticator.clone())
                .await
                .map(|stored| stored.id)
                .map_err(|e| AuthenticatorError::Initialization(e.to_string()))?,
            None => self
                .codec
                .serialize(&authenticator)
                .map_err(|e| AuthenticatorError::Initialization(e.to_string()))?,
        };

        Ok(self.cookie(value, &authenticator))
    }

    fn embed(&self, value: Cookie, response: AuthResponse) -> Result<AuthResponse, AuthenticatorError> {
        Ok(response.with_cookie(&value)?)
    }

    fn embed_request(&self, value: Cookie, request: AuthRequest) -> Result<AuthRequest, AuthenticatorError> {
        Ok(request.with_cookie(&value.name, &value.value)?)
    }

    fn touch(&self, authenticator: CookieAuthenticator) -> Touched<CookieAuthenticator> {
        if authenticator.idle_timeout.is_some() {
            Touched::Touched(CookieAuthenticator {
                last_used_at: self.clock.now(),
                ..authenticator
            })
        } else {
            Touched::Untouched(authenticator)
        }
    }

    async fn update(
        &self,
        authenticator: CookieAuthenticator,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        match &self.repository {
            Some(repository) => {
                repository
                    .update(authenticator)
                    .await
                    .map_err(|e| AuthenticatorError::Update(e.to_string()))?;
                Ok(response)
            }
            None => {
                let value = self
                    .codec
                    .serialize(&authenticator)
                    .map_err(|e| AuthenticatorError::Update(e.to_string()))?;
                self.embed(self.cookie(value, &authenticator), response)
            }
        }
    }

    async fn renew(
        &self,
        authenticator: CookieAuthenticator,
        request: &AuthRequest,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        if let Some(repository) = &self.repository {
            repository
                .remove(&authenticator.id)
                .await
                .map_err(|e| AuthenticatorError::Renewal(e.to_string()))?;
        }

        let renewed = self
            .create(authenticator.login_info, request)
            .await
            .map_err(|e| AuthenticatorError::Renewal(e.to_string()))?;
        let value = self
            .init(renewed)
            .await
            .map_err(|e| AuthenticatorError::Renewal(e.to_string()))?;

        self.embed(value, response)
    }

    async fn discard(
        &self,
        authenticator: CookieAuthenticator,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        if let Some(repository) = &self.repository {
            repository
                .remove(&authenticator.id)
                .await
                .map_err(|e| AuthenticatorError::Discard(e.to_string()))?;
        }

        Ok(response.discarding_cookie(&self.settings.cookie.discarding())?)
    }
}
