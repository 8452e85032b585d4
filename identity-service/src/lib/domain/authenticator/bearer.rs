use std::sync::Arc;

use async_trait::async_trait;
use auth::Clock;
use auth::IdGenerator;
use chrono::Duration;
use http::HeaderName;

use super::errors::AuthenticatorError;
use super::models::BearerTokenAuthenticator;
use super::models::Touched;
use super::ports::AuthenticatorRepository;
use super::ports::AuthenticatorService;
use crate::domain::errors::ConfigurationError;
use crate::domain::http::AuthRequest;
use crate::domain::http::AuthResponse;
use crate::domain::http::RequestPart;
use crate::domain::login::LoginInfo;

#[derive(Debug, Clone)]
pub struct BearerTokenAuthenticatorSettings {
    pub field_name: String,
    pub request_parts: Vec<RequestPart>,
    pub idle_timeout: Option<Duration>,
    pub expiry: Duration,
}

impl Default for BearerTokenAuthenticatorSettings {
    fn default() -> Self {
        Self {
            field_name: "X-Auth-Token".to_string(),
            request_parts: vec![RequestPart::Headers],
            idle_timeout: None,
            expiry: Duration::hours(12),
        }
    }
}

/// Opaque token backed by a repository. The token is the authenticator id.
pub struct BearerTokenAuthenticatorService {
    settings: BearerTokenAuthenticatorSettings,
    header_name: HeaderName,
    repository: Arc<dyn AuthenticatorRepository<BearerTokenAuthenticator>>,
    id_generator: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl BearerTokenAuthenticatorService {
    /// # Errors
    /// * `Invalid` - Field name is not a valid header name
    pub fn new(
        settings: BearerTokenAuthenticatorSettings,
        repository: Arc<dyn AuthenticatorRepository<BearerTokenAuthenticator>>,
        id_generator: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigurationError> {
        let header_name = HeaderName::try_from(settings.field_name.as_str()).map_err(|e| {
            ConfigurationError::Invalid {
                name: "bearer.field_name".to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            settings,
            header_name,
            repository,
            id_generator,
            clock,
        })
    }
}

#[async_trait]
impl AuthenticatorService for BearerTokenAuthenticatorService {
    type Authenticator = BearerTokenAuthenticator;
    type Value = String;

    async fn create(
        &self,
        login_info: LoginInfo,
        _request: &AuthRequest,
    ) -> Result<BearerTokenAuthenticator, AuthenticatorError> {
        let id = self
            .id_generator
            .generate()
            .await
            .map_err(|e| AuthenticatorError::Creation(e.to_string()))?;
        let now = self.clock.now();

        Ok(BearerTokenAuthenticator {
            id,
            login_info,
            last_used_at: now,
            expires_at: now + self.settings.expiry,
            idle_timeout: self.settings.idle_timeout,
        })
    }

    async fn retrieve(
        &self,
        request: &AuthRequest,
    ) -> Result<Option<BearerTokenAuthenticator>, AuthenticatorError> {
        let Some(token) = request.extract_string(&self.settings.field_name, &self.settings.request_parts)
        else {
            return Ok(None);
        };

        self.repository
            .find(&token)
            .await
            .map_err(|e| AuthenticatorError::Retrieval(e.to_string()))
    }

    async fn init(&self, authenticator: BearerTokenAuthenticator) -> Result<String, AuthenticatorError> {
        self.repository
            .add(authenticator)
            .await
            .map(|stored| stored.id)
            .map_err(|e| AuthenticatorError::Initialization(e.to_string()))
    }

    fn embed(&self, value: String, response: AuthResponse) -> Result<AuthResponse, AuthenticatorError> {
        Ok(response.with_header(self.header_name.clone(), &value)?)
    }

    fn embed_request(&self, value: String, request: AuthRequest) -> Result<AuthRequest, AuthenticatorError> {
        Ok(request.with_header(self.header_name.clone(), &value)?)
    }

    fn touch(&self, authenticator: BearerTokenAuthenticator) -> Touched<BearerTokenAuthenticator> {
        if authenticator.idle_timeout.is_some() {
            Touched::Touched(BearerTokenAuthenticator {
                last_used_at: self.clock.now(),
                ..authenticator
            })
        } else {
            Touched::Untouched(authenticator)
        }
    }

    async fn update(
        &self,
        authenticator: BearerTokenAuthenticator,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        self.repository
            .update(authenticator)
            .await
            .map_err(|e| AuthenticatorError::Update(e.to_string()))?;

        Ok(response)
    }

    async fn renew(
        &self,
        authenticator: BearerTokenAuthenticator,
        request: &AuthRequest,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        self.repository
            .remove(&authenticator.id)
            .await
            .map_err(|e| AuthenticatorError::Renewal(e.to_string()))?;

        let renewed = self
            .create(authenticator.login_info, request)
            .await
            .map_err(|e| AuthenticatorError::Renewal(e.to_string()))?;
        let token = self
            .init(renewed)
            .await
            .map_err(|e| AuthenticatorError::Renewal(e.to_string()))?;

        self.embed(token, response)
    }

    async fn discard(
        &self,
        authenticator: BearerTokenAuthenticator,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        self.repository
            .remove(&authenticator.id)
            .await
            .map_err(|e| AuthenticatorError::Discard(e.to_string()))?;

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use auth::util::FixedClock;
    use auth::SecureRandomIdGenerator;
    use chrono::TimeZone;
    use chrono::Utc;
    use mockall::mock;

    use super::*;
    use crate::domain::authenticator::models::Authenticator;
    use crate::domain::errors::RepositoryError;
    use crate::outbound::repositories::InMemoryAuthenticatorRepository;

    mock! {
        pub TestBearerRepository {}

        #[async_trait]
        impl AuthenticatorRepository<BearerTokenAuthenticator> for TestBearerRepository {
            async fn find(&self, id: &str) -> Result<Option<BearerTokenAuthenticator>, RepositoryError>;
            async fn add(&self, authenticator: BearerTokenAuthenticator) -> Result<BearerTokenAuthenticator, RepositoryError>;
            async fn update(&self, authenticator: BearerTokenAuthenticator) -> Result<BearerTokenAuthenticator, RepositoryError>;
            async fn remove(&self, id: &str) -> Result<(), RepositoryError>;
        }
    }

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn service(
        repository: Arc<dyn AuthenticatorRepository<BearerTokenAuthenticator>>,
        settings: BearerTokenAuthenticatorSettings,
        clock: Arc<FixedClock>,
    ) -> BearerTokenAuthenticatorService {
        BearerTokenAuthenticatorService::new(
            settings,
            repository,
            Arc::new(SecureRandomIdGenerator::default()),
            clock,
        )
        .unwrap()
    }

    fn login_info() -> LoginInfo {
        LoginInfo::new("credentials", "user@example.com")
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let clock = clock();
        let repository = Arc::new(InMemoryAuthenticatorRepository::<BearerTokenAuthenticator>::in_memory(
            clock.clone(),
        ));
        let service = service(
            repository.clone(),
            BearerTokenAuthenticatorSettings::default(),
            clock.clone(),
        );

        let authenticator = service
            .create(login_info(), &AuthRequest::default())
            .await
            .unwrap();
        assert_eq!(authenticator.expires_at, clock.now() + Duration::hours(12));

        let token = service.init(authenticator.clone()).await.unwrap();
        assert_eq!(token, authenticator.id);
        assert_eq!(
            repository.find(&token).await.unwrap().map(|a| a.login_info),
            Some(login_info())
        );

        let response = service.embed(token.clone(), AuthResponse::new()).unwrap();
        assert_eq!(response.headers().get("x-auth-token").unwrap(), token.as_str());

        let request = service
            .embed_request(token.clone(), AuthRequest::default())
            .unwrap();
        let retrieved = service.retrieve(&request).await.unwrap().unwrap();
        assert_eq!(retrieved, authenticator);
        assert!(retrieved.is_valid(clock.now()));

        service.discard(retrieved, AuthResponse::new()).await.unwrap();
        assert!(repository.find(&token).await.unwrap().is_none());
        assert!(service.retrieve(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let service = service(
            Arc::new(InMemoryAuthenticatorRepository::<BearerTokenAuthenticator>::in_memory(clock())),
            BearerTokenAuthenticatorSettings::default(),
            clock(),
        );

        let request = AuthRequest::default()
            .with_header(HeaderName::from_static("x-auth-token"), "unknown")
            .unwrap();
        assert!(service.retrieve(&request).await.unwrap().is_none());
        assert!(service.retrieve(&AuthRequest::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_renew_replaces_token() {
        let clock = clock();
        let repository = Arc::new(InMemoryAuthenticatorRepository::<BearerTokenAuthenticator>::in_memory(
            clock.clone(),
        ));
        let service = service(
            repository.clone(),
            BearerTokenAuthenticatorSettings::default(),
            clock,
        );
        let authenticator = service
            .create(login_info(), &AuthRequest::default())
            .await
            .unwrap();
        let old_token = service.init(authenticator.clone()).await.unwrap();

        let response = service
            .renew(authenticator, &AuthRequest::default(), AuthResponse::new())
            .await
            .unwrap();
        let new_token = response
            .headers()
            .get("x-auth-token")
            .unwrap()
            .to_str()
            .unwrap();

        assert_ne!(new_token, old_token);
        assert!(repository.find(&old_token).await.unwrap().is_none());
        assert!(repository.find(new_token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_touch_updates_last_used() {
        let clock = clock();
        let repository = Arc::new(InMemoryAuthenticatorRepository::<BearerTokenAuthenticator>::in_memory(
            clock.clone(),
        ));
        let settings = BearerTokenAuthenticatorSettings {
            idle_timeout: Some(Duration::minutes(5)),
            ..BearerTokenAuthenticatorSettings::default()
        };
        let service = service(repository.clone(), settings, clock.clone());
        let authenticator = service
            .create(login_info(), &AuthRequest::default())
            .await
            .unwrap();
        let token = service.init(authenticator.clone()).await.unwrap();

        clock.advance(Duration::minutes(4));
        let touched = service.touch(authenticator);
        assert!(touched.is_touched());
        service
            .update(touched.into_inner(), AuthResponse::new())
            .await
            .unwrap();

        clock.advance(Duration::minutes(4));
        let stored = repository.find(&token).await.unwrap().unwrap();
        assert!(stored.is_valid(clock.now()));
    }

    #[tokio::test]
    async fn test_repository_failure_on_retrieve() {
        let mut repository = MockTestBearerRepository::new();
        repository
            .expect_find()
            .times(1)
            .returning(|_| Err(RepositoryError::DatabaseError("connection refused".to_string())));
        let service = service(
            Arc::new(repository),
            BearerTokenAuthenticatorSettings::default(),
            clock(),
        );

        let request = AuthRequest::default()
            .with_header(HeaderName::from_static("x-auth-token"), "token")
            .unwrap();
        assert!(matches!(
            service.retrieve(&request).await,
            Err(AuthenticatorError::Retrieval(_))
        ));
    }

    #[tokio::test]
    async fn test_init_failure() {
        let mut repository = MockTestBearerRepository::new();
        repository
            .expect_add()
            .times(1)
            .returning(|a| Err(RepositoryError::Duplicate(a.id)));
        let service = service(
            Arc::new(repository),
            BearerTokenAuthenticatorSettings::default(),
            clock(),
        );
        let authenticator = service
            .create(login_info(), &AuthRequest::default())
            .await
            .unwrap();

        assert!(matches!(
            service.init(authenticator).await,
            Err(AuthenticatorError::Initialization(_))
        ));
    }
}
