use std::time::Duration;

use async_trait::async_trait;

use super::errors::AuthenticatorError;
use super::models::Authenticator;
use super::models::StorableAuthenticator;
use super::models::Touched;
use crate::domain::errors::RepositoryError;
use crate::domain::http::AuthRequest;
use crate::domain::http::AuthResponse;
use crate::domain::login::LoginInfo;

/// Port for the authenticator lifecycle of one transport strategy.
#[async_trait]
pub trait AuthenticatorService: Send + Sync + 'static {
    type Authenticator: Authenticator;

    /// Transport representation produced by `init`.
    type Value: Send + 'static;

    /// Create a fresh authenticator for an identity.
    ///
    /// # Arguments
    /// * `login_info` - Identity the authenticator proves
    /// * `request` - Current request, used for fingerprinting
    ///
    /// # Errors
    /// * `Creation` - Identifier generation failed
    async fn create(
        &self,
        login_info: LoginInfo,
        request: &AuthRequest,
    ) -> Result<Self::Authenticator, AuthenticatorError>;

    /// Find the authenticator carried by a request.
    ///
    /// # Returns
    /// `None` when the request carries no value or the value does not verify
    ///
    /// # Errors
    /// * `Retrieval` - Backing repository failed
    async fn retrieve(
        &self,
        request: &AuthRequest,
    ) -> Result<Option<Self::Authenticator>, AuthenticatorError>;

    /// Turn an authenticator into its transport value, persisting it first
    /// when the strategy is backed by a repository.
    ///
    /// # Errors
    /// * `Initialization` - Serialization or persistence failed
    async fn init(&self, authenticator: Self::Authenticator) -> Result<Self::Value, AuthenticatorError>;

    /// Place a transport value on an outgoing response.
    fn embed(&self, value: Self::Value, response: AuthResponse) -> Result<AuthResponse, AuthenticatorError>;

    /// Place a transport value on a request, as if the client had sent it.
    fn embed_request(&self, value: Self::Value, request: AuthRequest) -> Result<AuthRequest, AuthenticatorError>;

    /// Slide the idle timeout forward when one is configured.
    fn touch(&self, authenticator: Self::Authenticator) -> Touched<Self::Authenticator>;

    /// Persist a touched authenticator and refresh its transport value.
    ///
    /// # Errors
    /// * `Update` - Serialization or persistence failed
    async fn update(
        &self,
        authenticator: Self::Authenticator,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError>;

    /// Revoke an authenticator and issue a fresh one for the same identity.
    ///
    /// # Errors
    /// * `Renewal` - Any step of the revoke, create, init and embed sequence failed
    async fn renew(
        &self,
        authenticator: Self::Authenticator,
        request: &AuthRequest,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError>;

    /// Revoke an authenticator and remove it from the client.
    ///
    /// # Errors
    /// * `Discard` - Removal from the repository failed
    async fn discard(
        &self,
        authenticator: Self::Authenticator,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError>;
}

/// Persistence port for storable authenticators.
#[async_trait]
pub trait AuthenticatorRepository<T: StorableAuthenticator>: Send + Sync + 'static {
    async fn find(&self, id: &str) -> Result<Option<T>, RepositoryError>;

    /// Store a new authenticator.
    ///
    /// # Errors
    /// * `Duplicate` - An authenticator with the same id exists
    async fn add(&self, authenticator: T) -> Result<T, RepositoryError>;

    /// Replace a stored authenticator.
    ///
    /// # Errors
    /// * `NotFound` - No authenticator with this id exists
    async fn update(&self, authenticator: T) -> Result<T, RepositoryError>;

    /// Remove an authenticator. Removing an unknown id succeeds.
    async fn remove(&self, id: &str) -> Result<(), RepositoryError>;
}

/// Key/value cache with per-entry expiry.
#[async_trait]
pub trait CacheLayer: Send + Sync + 'static {
    async fn save(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), RepositoryError>;

    async fn find(&self, key: &str) -> Result<Option<String>, RepositoryError>;

    async fn remove(&self, key: &str) -> Result<(), RepositoryError>;
}

/// Store that drops entries past their expiry in one pass.
#[async_trait]
pub trait ExpirySweeper: Send + Sync + 'static {
    /// # Returns
    /// Number of entries removed
    async fn sweep_expired(&self) -> Result<u64, RepositoryError>;
}
