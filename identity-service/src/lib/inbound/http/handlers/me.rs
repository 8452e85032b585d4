use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::ApiSuccess;
use crate::inbound::http::middleware::Identity;

pub async fn me(Extension(identity): Extension<Identity>) -> ApiSuccess<IdentityData> {
    ApiSuccess::new(StatusCode::OK, (&identity).into())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityData {
    pub provider_id: String,
    pub provider_key: String,
    pub strategy: String,
}

impl From<&Identity> for IdentityData {
    fn from(identity: &Identity) -> Self {
        Self {
            provider_id: identity.login_info.provider_id.clone(),
            provider_key: identity.login_info.provider_key.clone(),
            strategy: identity.authenticator.strategy().to_string(),
        }
    }
}
