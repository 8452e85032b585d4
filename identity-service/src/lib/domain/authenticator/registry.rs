use std::sync::Arc;

use async_trait::async_trait;
use auth::AuthenticatorEncoder;
use auth::Clock;
use auth::FingerprintGenerator;
use auth::IdGenerator;
use auth::JwtKey;
use auth::Signer;

use super::bearer::BearerTokenAuthenticatorService;
use super::bearer::BearerTokenAuthenticatorSettings;
use super::codec::AuthenticatorCodec;
use super::cookie::CookieAuthenticatorService;
use super::cookie::CookieAuthenticatorSettings;
use super::dummy::DummyAuthenticatorService;
use super::errors::AuthenticatorError;
use super::fingerprinting::Fingerprinting;
use super::jwt::JwtAuthenticatorService;
use super::jwt::JwtAuthenticatorSettings;
use super::models::AnyAuthenticator;
use super::models::BearerTokenAuthenticator;
use super::models::CookieAuthenticator;
use super::models::JwtAuthenticator;
use super::models::Touched;
use super::ports::AuthenticatorRepository;
use super::ports::AuthenticatorService;
use super::session::SessionAuthenticatorService;
use super::session::SessionAuthenticatorSettings;
use crate::domain::errors::ConfigurationError;
use crate::domain::http::AuthRequest;
use crate::domain::http::AuthResponse;
use crate::domain::http::Cookie;
use crate::domain::login::LoginInfo;

/// Transport value of whichever strategy is configured.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthenticatorValue {
    Session(String),
    Cookie(Cookie),
    Jwt(String),
    BearerToken(String),
    Dummy,
}

impl AuthenticatorValue {
    /// Token a client must echo back itself, for header-based strategies.
    pub fn token(&self) -> Option<&str> {
        match self {
            AuthenticatorValue::Jwt(token) | AuthenticatorValue::BearerToken(token) => Some(token),
            _ => None,
        }
    }

    fn strategy(&self) -> &'static str {
        match self {
            AuthenticatorValue::Session(_) => "session",
            AuthenticatorValue::Cookie(_) => "cookie",
            AuthenticatorValue::Jwt(_) => "jwt",
            AuthenticatorValue::BearerToken(_) => "bearer",
            AuthenticatorValue::Dummy => "dummy",
        }
    }
}

/// Shared collaborators every strategy draws from.
#[derive(Clone)]
pub struct AuthenticatorComponents {
    pub signer: Arc<dyn Signer>,
    pub encoder: Arc<dyn AuthenticatorEncoder>,
    pub fingerprint_generator: Arc<dyn FingerprintGenerator>,
    pub id_generator: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
    pub cookie_repository: Option<Arc<dyn AuthenticatorRepository<CookieAuthenticator>>>,
    pub jwt_repository: Option<Arc<dyn AuthenticatorRepository<JwtAuthenticator>>>,
    pub bearer_repository: Option<Arc<dyn AuthenticatorRepository<BearerTokenAuthenticator>>>,
}

/// Per-strategy settings. Only the entry for the selected strategy is used.
#[derive(Clone)]
pub struct StrategySettings {
    pub session: SessionAuthenticatorSettings,
    pub cookie: CookieAuthenticatorSettings,
    pub jwt: JwtAuthenticatorSettings,
    pub jwt_algorithm: String,
    pub jwt_key: JwtKey,
    pub bearer: BearerTokenAuthenticatorSettings,
}

/// Authenticator service selected at startup by strategy key.
pub enum AnyAuthenticatorService {
    Session(SessionAuthenticatorService),
    Cookie(CookieAuthenticatorService),
    Jwt(JwtAuthenticatorService),
    BearerToken(BearerTokenAuthenticatorService),
    Dummy(DummyAuthenticatorService),
}

impl AnyAuthenticatorService {
    pub const STRATEGIES: [&'static str; 5] = ["session", "cookie", "jwt", "bearer", "dummy"];

    /// Build the service registered under `strategy`.
    ///
    /// # Arguments
    /// * `strategy` - One of `session`, `cookie`, `jwt`, `bearer` or `dummy`
    /// * `settings` - Settings for every strategy
    /// * `components` - Shared crypto, clock, id generation and repositories
    ///
    /// # Errors
    /// * `UnknownStrategy` - No service is registered under the key
    /// * `MissingRepository` - Bearer strategy without a repository
    /// * `Jwt` - JWT algorithm or key is invalid
    pub fn from_strategy(
        strategy: &str,
        settings: StrategySettings,
        components: AuthenticatorComponents,
    ) -> Result<Self, ConfigurationError> {
        let codec = AuthenticatorCodec::new(components.signer.clone(), components.encoder.clone());

        let service = match strategy {
            "session" => {
                let fingerprinting = Fingerprinting::new(
                    settings.session.use_fingerprinting,
                    components.fingerprint_generator,
                );
                Self::Session(SessionAuthenticatorService::new(
                    settings.session,
                    codec,
                    fingerprinting,
                    components.clock,
                ))
            }
            "cookie" => {
                let fingerprinting = Fingerprinting::new(
                    settings.cookie.use_fingerprinting,
                    components.fingerprint_generator,
                );
                Self::Cookie(CookieAuthenticatorService::new(
                    settings.cookie,
                    components.cookie_repository,
                    codec,
                    fingerprinting,
                    components.id_generator,
                    components.clock,
                ))
            }
            "jwt" => Self::Jwt(JwtAuthenticatorService::new(
                settings.jwt,
                &settings.jwt_algorithm,
                &settings.jwt_key,
                components.encoder,
                components.jwt_repository,
                components.id_generator,
                components.clock,
            )?),
            "bearer" => {
                let repository = components
                    .bearer_repository
                    .ok_or_else(|| ConfigurationError::MissingRepository("bearer".to_string()))?;
                Self::BearerToken(BearerTokenAuthenticatorService::new(
                    settings.bearer,
                    repository,
                    components.id_generator,
                    components.clock,
                )?)
            }
            "dummy" => Self::Dummy(DummyAuthenticatorService),
            other => return Err(ConfigurationError::UnknownStrategy(other.to_string())),
        };

        tracing::info!(strategy = service.strategy(), "Authenticator service configured");

        Ok(service)
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Session(_) => "session",
            Self::Cookie(_) => "cookie",
            Self::Jwt(_) => "jwt",
            Self::BearerToken(_) => "bearer",
            Self::Dummy(_) => "dummy",
        }
    }

    fn mismatch(&self, found: &'static str) -> AuthenticatorError {
        AuthenticatorError::StrategyMismatch {
            expected: self.strategy(),
            found,
        }
    }
}

#[async_trait]
impl AuthenticatorService for AnyAuthenticatorService {
    type Authenticator = AnyAuthenticator;
    type Value = AuthenticatorValue;

    async fn create(
        &self,
        login_info: LoginInfo,
        request: &AuthRequest,
    ) -> Result<AnyAuthenticator, AuthenticatorError> {
        match self {
            Self::Session(s) => s.create(login_info, request).await.map(AnyAuthenticator::Session),
            Self::Cookie(s) => s.create(login_info, request).await.map(AnyAuthenticator::Cookie),
            Self::Jwt(s) => s.create(login_info, request).await.map(AnyAuthenticator::Jwt),
            Self::BearerToken(s) => s
                .create(login_info, request)
                .await
                .map(AnyAuthenticator::BearerToken),
            Self::Dummy(s) => s.create(login_info, request).await.map(AnyAuthenticator::Dummy),
        }
    }

    async fn retrieve(&self, request: &AuthRequest) -> Result<Option<AnyAuthenticator>, AuthenticatorError> {
        Ok(match self {
            Self::Session(s) => s.retrieve(request).await?.map(AnyAuthenticator::Session),
            Self::Cookie(s) => s.retrieve(request).await?.map(AnyAuthenticator::Cookie),
            Self::Jwt(s) => s.retrieve(request).await?.map(AnyAuthenticator::Jwt),
            Self::BearerToken(s) => s.retrieve(request).await?.map(AnyAuthenticator::BearerToken),
            Self::Dummy(s) => s.retrieve(request).await?.map(AnyAuthenticator::Dummy),
        })
    }

    async fn init(&self, authenticator: AnyAuthenticator) -> Result<AuthenticatorValue, AuthenticatorError> {
        match (self, authenticator) {
            (Self::Session(s), AnyAuthenticator::Session(a)) => {
                s.init(a).await.map(AuthenticatorValue::Session)
            }
            (Self::Cookie(s), AnyAuthenticator::Cookie(a)) => {
                s.init(a).await.map(AuthenticatorValue::Cookie)
            }
            (Self::Jwt(s), AnyAuthenticator::Jwt(a)) => s.init(a).await.map(AuthenticatorValue::Jwt),
            (Self::BearerToken(s), AnyAuthenticator::BearerToken(a)) => {
                s.init(a).await.map(AuthenticatorValue::BearerToken)
            }
            (Self::Dummy(s), AnyAuthenticator::Dummy(a)) => {
                s.init(a).await.map(|_| AuthenticatorValue::Dummy)
            }
            (_, other) => Err(self.mismatch(other.strategy())),
        }
    }

    fn embed(&self, value: AuthenticatorValue, response: AuthResponse) -> Result<AuthResponse, AuthenticatorError> {
        match (self, value) {
            (Self::Session(s), AuthenticatorValue::Session(v)) => s.embed(v, response),
            (Self::Cookie(s), AuthenticatorValue::Cookie(v)) => s.embed(v, response),
            (Self::Jwt(s), AuthenticatorValue::Jwt(v)) => s.embed(v, response),
            (Self::BearerToken(s), AuthenticatorValue::BearerToken(v)) => s.embed(v, response),
            (Self::Dummy(s), AuthenticatorValue::Dummy) => s.embed((), response),
            (_, other) => Err(self.mismatch(other.strategy())),
        }
    }

    fn embed_request(&self, value: AuthenticatorValue, request: AuthRequest) -> Result<AuthRequest, AuthenticatorError> {
        match (self, value) {
            (Self::Session(s), AuthenticatorValue::Session(v)) => s.embed_request(v, request),
            (Self::Cookie(s), AuthenticatorValue::Cookie(v)) => s.embed_request(v, request),
            (Self::Jwt(s), AuthenticatorValue::Jwt(v)) => s.embed_request(v, request),
            (Self::BearerToken(s), AuthenticatorValue::BearerToken(v)) => s.embed_request(v, request),
            (Self::Dummy(s), AuthenticatorValue::Dummy) => s.embed_request((), request),
            (_, other) => Err(self.mismatch(other.strategy())),
        }
    }

    fn touch(&self, authenticator: AnyAuthenticator) -> Touched<AnyAuthenticator> {
        match (self, authenticator) {
            (Self::Session(s), AnyAuthenticator::Session(a)) => s.touch(a).map(AnyAuthenticator::Session),
            (Self::Cookie(s), AnyAuthenticator::Cookie(a)) => s.touch(a).map(AnyAuthenticator::Cookie),
            (Self::Jwt(s), AnyAuthenticator::Jwt(a)) => s.touch(a).map(AnyAuthenticator::Jwt),
            (Self::BearerToken(s), AnyAuthenticator::BearerToken(a)) => {
                s.touch(a).map(AnyAuthenticator::BearerToken)
            }
            (Self::Dummy(s), AnyAuthenticator::Dummy(a)) => s.touch(a).map(AnyAuthenticator::Dummy),
            (_, other) => {
                tracing::error!(
                    expected = self.strategy(),
                    found = other.strategy(),
                    "Touch on authenticator of another strategy"
                );
                debug_assert!(false, "touch on authenticator of another strategy");
                Touched::Untouched(other)
            }
        }
    }

    async fn update(
        &self,
        authenticator: AnyAuthenticator,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        match (self, authenticator) {
            (Self::Session(s), AnyAuthenticator::Session(a)) => s.update(a, response).await,
            (Self::Cookie(s), AnyAuthenticator::Cookie(a)) => s.update(a, response).await,
            (Self::Jwt(s), AnyAuthenticator::Jwt(a)) => s.update(a, response).await,
            (Self::BearerToken(s), AnyAuthenticator::BearerToken(a)) => s.update(a, response).await,
            (Self::Dummy(s), AnyAuthenticator::Dummy(a)) => s.update(a, response).await,
            (_, other) => Err(self.mismatch(other.strategy())),
        }
    }

    async fn renew(
        &self,
        authenticator: AnyAuthenticator,
        request: &AuthRequest,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        match (self, authenticator) {
            (Self::Session(s), AnyAuthenticator::Session(a)) => s.renew(a, request, response).await,
            (Self::Cookie(s), AnyAuthenticator::Cookie(a)) => s.renew(a, request, response).await,
            (Self::Jwt(s), AnyAuthenticator::Jwt(a)) => s.renew(a, request, response).await,
            (Self::BearerToken(s), AnyAuthenticator::BearerToken(a)) => {
                s.renew(a, request, response).await
            }
            (Self::Dummy(s), AnyAuthenticator::Dummy(a)) => s.renew(a, request, response).await,
            (_, other) => Err(self.mismatch(other.strategy())),
        }
    }

    async fn discard(
        &self,
        authenticator: AnyAuthenticator,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        match (self, authenticator) {
            (Self::Session(s), AnyAuthenticator::Session(a)) => s.discard(a, response).await,
            (Self::Cookie(s), AnyAuthenticator::Cookie(a)) => s.discard(a, response).await,
            (Self::Jwt(s), AnyAuthenticator::Jwt(a)) => s.discard(a, response).await,
            (Self::BearerToken(s), AnyAuthenticator::BearerToken(a)) => s.discard(a, response).await,
            (Self::Dummy(s), AnyAuthenticator::Dummy(a)) => s.discard(a, response).await,
            (_, other) => Err(self.mismatch(other.strategy())),
        }
    }
}
