use async_trait::async_trait;

use super::errors::AuthenticatorError;
use super::models::DummyAuthenticator;
use super::models::Touched;
use super::ports::AuthenticatorService;
use crate::domain::http::AuthRequest;
use crate::domain::http::AuthResponse;
use crate::domain::login::LoginInfo;

/// Service for endpoints that authenticate on every request, e.g. with
/// credentials in a header. Nothing is stored or transported, so nothing can
/// be retrieved.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyAuthenticatorService;

#[async_trait]
impl AuthenticatorService for DummyAuthenticatorService {
    type Authenticator = DummyAuthenticator;
    type Value = ();

    async fn create(
        &self,
        login_info: LoginInfo,
        _request: &AuthRequest,
    ) -> Result<DummyAuthenticator, AuthenticatorError> {
        Ok(DummyAuthenticator { login_info })
    }

    async fn retrieve(&self, _request: &AuthRequest) -> Result<Option<DummyAuthenticator>, AuthenticatorError> {
        Ok(None)
    }

    async fn init(&self, _authenticator: DummyAuthenticator) -> Result<(), AuthenticatorError> {
        Ok(())
    }

    fn embed(&self, _value: (), response: AuthResponse) -> Result<AuthResponse, AuthenticatorError> {
        Ok(response)
    }

    fn embed_request(&self, _value: (), request: AuthRequest) -> Result<AuthRequest, AuthenticatorError> {
        Ok(request)
    }

    fn touch(&self, authenticator: DummyAuthenticator) -> Touched<DummyAuthenticator> {
        Touched::Untouched(authenticator)
    }

    async fn update(
        &self,
        _authenticator: DummyAuthenticator,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        Ok(response)
    }

    async fn renew(
        &self,
        _authenticator: DummyAuthenticator,
        _request: &AuthRequest,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        Ok(response)
    }

    async fn discard(
        &self,
        _authenticator: DummyAuthenticator,
        response: AuthResponse,
    ) -> Result<AuthResponse, AuthenticatorError> {
        Ok(response)
    }
}
