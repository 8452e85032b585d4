use async_trait::async_trait;
use thiserror::Error;

use crate::domain::http::AuthRequest;
use crate::domain::login::LoginInfo;

/// Authenticated identity that is not permitted to perform the action.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Access forbidden for {0}")]
    Forbidden(String),
}

/// Decides whether an authenticated identity may access a resource.
#[async_trait]
pub trait Authorization: Send + Sync + 'static {
    async fn is_authorized(&self, login_info: &LoginInfo, request: &AuthRequest) -> bool;

    /// # Errors
    /// * `Forbidden` - Identity is authenticated but not authorized
    async fn authorize(&self, login_info: &LoginInfo, request: &AuthRequest) -> Result<(), AuthorizationError> {
        if self.is_authorized(login_info, request).await {
            Ok(())
        } else {
            Err(AuthorizationError::Forbidden(login_info.to_string()))
        }
    }
}

/// Grants access only to identities authenticated by the given provider.
#[derive(Debug, Clone)]
pub struct WithProvider {
    provider_id: String,
}

impl WithProvider {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
        }
    }
}

#[async_trait]
impl Authorization for WithProvider {
    async fn is_authorized(&self, login_info: &LoginInfo, _request: &AuthRequest) -> bool {
        login_info.provider_id == self.provider_id
    }
}
