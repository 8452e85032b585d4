use std::sync::Arc;

use async_trait::async_trait;
use auth::AuthenticatorEncoder;
use auth::Claims;
use auth::Clock;
use auth::IdGenerator;
use auth::JwtHandler;
use auth::JwtKey;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use http::HeaderName;

use super::errors::AuthenticatorError;
use super::models::JwtAuthenticator;
use super::models::Touched;
use super::ports::AuthenticatorRepository;
use super::ports::AuthenticatorService;
use crate::domain::errors::ConfigurationError;
use crate::domain::http::AuthRequest;
use crate::domain::http::AuthResponse;
use crate::domain::http::RequestPart;
use crate::domain::login::LoginInfo;

#[derive(Debug, Clone)]
pub struct JwtAuthenticatorSettings {
    pub field_name: String,
    /// Scheme prefixing the token in the header, e.g. `Bearer`.
    pub scheme: Option<String>,
    pub request_parts: Vec<RequestPart>,
    pub issuer: String,
    pub idle_timeout: Option<Duration>,
    pub expiry: Duration,
}

impl Default for JwtAuthenticatorSettings {
    fn default() -> Self {
        Self {
            field_name: "Authorization".to_string(),
            scheme: Some("Bearer".to_string()),
            request_parts: vec![RequestPart::Headers],
            issuer: "identity-service".to_string(),
            idle_timeout: None,
            expiry: Duration::hours(12),
        }
    }
}

/// Transports the authenticator as a signed JWT.
///
/// The subject claim is the encoded login info. With a repository, a token
/// is only accepted while its id is still stored, which makes tokens
/// revocable.
pub struct JwtAuthenticatorService {
    settings: JwtAuthenticatorSettings,
    header_name: HeaderName,
    handler: JwtHandler,
    encoder: Arc<dyn AuthenticatorEncoder>,
    repository: Option<Arc<dyn AuthenticatorRepository<JwtAuthenticator>>>,
    id_generator: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl JwtAuthenticatorService {
    /// Build the service for a signing algorithm.
    ///
    /// # Arguments
    /// * `algorithm` - JWT algorithm identifier, e.g. `HS256`
    /// * `key` - Key material matching the algorithm
    ///
    /// # Errors
    /// * `Jwt` - Algorithm is unknown or the key does not fit it
    /// * `Invalid` - Field name is not a valid header name
    pub fn new(
        settings: JwtAuthenticatorSettings,
        algorithm: &str,
        key: &JwtKey,
        encoder: Arc<dyn AuthenticatorEncoder>,
        repository: Option<Arc<dyn AuthenticatorRepository<JwtAuthenticator>>>,
        id_generator: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigurationError> {
        let handler = JwtHandler::from_algorithm(algorithm, key)
            .map_err(|e| ConfigurationError::Jwt(e.to_string()))?
            .with_issuer(settings.issuer.clone())
            .without_expiration_check();
        let header_name = HeaderName::try_from(settings.field_name.as_str()).map_err(|e| {
            ConfigurationError::Invalid {
                name: "jwt.field_name".to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            settings,
            header_name,
            handler,
            encoder,
            repository,
            id_generator,
            clock,
        })
    }

    fn serialize(&self, authenticator: &JwtAuthenticator) -> Result<String, String> {
        let login_info = serde_json::to_string(&authenticator.login_info).map_err(|e| e.to_string())?;
        let subject = self.encoder.encode(&login_info).map_err(|e| e.to_string())?;

        let mut claims = Claims::new()
            .with_jwt_id(&authenticator.id)
            .with_issuer(&self.settings.issuer)
            .with_subject(subject)
            .with_issued_at(authenticator.last_used_at.timestamp())
            .with_expiration(authenticator.expires_at.timestamp());
        if let Some(custom) = &authenticator.custom_claims {
            claims = claims.with_custom_claims(custom).map_err(|e| e.to_string())?;
        }

        self.handler.encode(&claims).map_err(|e| e.to_string())
    }

    fn unserialize(&self, token: &str) -> Result<JwtAuthenticator, String> {
        let claims: Claims = self.handler.decode(token).map_err(|e| e.to_string())?;

        let subject = claims.sub.as_deref().ok_or("missing subject")?;
        let login_info = self.encoder.decode(subject).map_err(|e| e.to_string())?;
        let login_info: LoginInfo = serde_json::from_str(&login_info).map_err(|e| e.to_string())?;

        let id = claims.jti.clone().ok_or("missing token id")?;
        let issued_at = claims.iat.and_then(from_timestamp).ok_or("invalid issued at")?;
        let expires_at = claims.exp.and_then(from_timestamp).ok_or("invalid expiration")?;

        Ok(JwtAuthenticator {
            id,
            login_info,
            last_used_at: issued_at,
            expires_at,
            idle_timeout: self.settings.idle_timeout,
            custom_claims: claims.custom_claims(),
        })
    }

    fn token(&self, request: &AuthRequest) -> Option<String> {
        self.settings.request_parts.iter().find_map(|part| match part {
            RequestPart::Headers => {
                let value = request.header(&self.settings.field_name)?;
                match &self.settings.scheme {
                    Some(scheme) => strip_scheme(value, scheme).map(str::to_string),
                    None => Some(value.to_string()),
                }
            }
            other => request.extract_string(&self.settings.field_name, &[*other]),
        })
    }

    fn header_value(&self, token: &str) -> String {
        match &self.settings.scheme {
            Some(scheme) => format!("{} {}", scheme, token),
            None => token.to_string(),
        }
    }
}

fn from_timestamp(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}

fn strip_scheme<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let (prefix, token) = value.split_once(' ')?;
    prefix
        .eq_ignore_ascii_case(scheme)
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl AuthenticatorService for JwtAuthenticatorService {
    type Authenticator = JwtAuthenticator;
    type Value = String;

    async fn create(
        &self,
        login_info: LoginInfo,
        _request: &AuthRequest,
    ) -> Result<JwtAuthenticator, AuthenticatorError> {
        let id = self
            .id_generator
            .generate()
            .await
            .map_err(|e| AuthenticatorError::Creation(e.to_string()))?;
        let now = self.clock.now();

        Ok(JwtAuthenticator {
            id,
            login_info,
            last_used_at: now,
            expires_at: now + self.settings.expiry,
            idle_timeout: self.settings.idle_timeout,
            custom_claims: None,
        })
    }

    async fn retrieve(&self, request: &AuthRequest) -> Result<Option<JwtAuthenticator>, AuthenticatorError> {
        let Some(token) = self.token(request) else {
            return Ok(None);
        };

        let authenticator = match self.unserialize(&token) {
            Ok(authenticator) => authenticator,
            Err(e) => {
                tracing::info!(error = %e, "Rejected JWT authenticator");
                return Ok(None);
            }
        };

        match &self.repository {
            Some(repository) => repository
                .find(&authenticator.id)
                .await
                .map_err(|e| AuthenticatorError::Retrieval(e.to_string())),
            None => Ok(Some(authenticator)),
        }
    }

    async fn init(&self, authenticator: JwtAuthenticator) -> Result<String, AuthenticatorError> {
        let token = self
            .serialize(&authenticator)
            .map_err(AuthenticatorError::Initialization)?;

        if let Some(repository) = &self.repository {
            repository
                .add(authenticator)
                .await
                .map_err(|e| AuthenticatorError::Initialization(e.to_string()))?;
        }

        Ok(token)
    }

    fn embed(&self, value: String, response: AuthResponse) -> Result<AuthResponse, AuthenticatorError> {
        Ok(response.with_header(self.header_name.clone(), &self.header_value(&value))?)
    }

    fn embed_request(&self, value: String, request: AuthRequest) -> Result<AuthRequest, AuthenticatorError> {
        Ok(request.with_header(self.header_name.clone(), &self.header_value(&value))?)
    }

    fn touch(&self, authenticator: JwtAuthenticator) -> Touched<JwtAuthenticator> {
        if authenticator.idle_timeout.is_some() {
            Touched::Touched(JwtAuthenticator {
                last_used_at: self.clock.now(),
                ..authenticator
            })
        } else {
            Touched::Untouched(authenticator)
        }
    }

    async fn update(
        &self,
        authenticator: JwtAuthenticator,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        let token = self
            .serialize(&authenticator)
            .map_err(AuthenticatorError::Update)?;

        if let Some(repository) = &self.repository {
            repository
                .update(authenticator)
                .await
                .map_err(|e| AuthenticatorError::Update(e.to_string()))?;
        }

        self.embed(token, response)
    }

    async fn renew(
        &self,
        authenticator: JwtAuthenticator,
        request: &AuthRequest,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        if let Some(repository) = &self.repository {
            repository
                .remove(&authenticator.id)
                .await
                .map_err(|e| AuthenticatorError::Renewal(e.to_string()))?;
        }

        let renewed = JwtAuthenticator {
            custom_claims: authenticator.custom_claims,
            ..self
                .create(authenticator.login_info, request)
                .await
                .map_err(|e| AuthenticatorError::Renewal(e.to_string()))?
        };
        let token = self
            .init(renewed)
            .await
            .map_err(|e| AuthenticatorError::Renewal(e.to_string()))?;

        self.embed(token, response)
    }

    async fn discard(
        &self,
        authenticator: JwtAuthenticator,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        if let Some(repository) = &self.repository {
            repository
                .remove(&authenticator.id)
                .await
                .map_err(|e| AuthenticatorError::Discard(e.to_string()))?;
        }

        Ok(response)
    }
}
