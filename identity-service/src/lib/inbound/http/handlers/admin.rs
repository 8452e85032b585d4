use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::ApiSuccess;
use crate::inbound::http::middleware::Identity;

pub async fn admin(Extension(identity): Extension<Identity>) -> ApiSuccess<AdminData> {
    ApiSuccess::new(
        StatusCode::OK,
        AdminData {
            provider_key: identity.login_info.provider_key,
            granted: true,
        },
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminData {
    pub provider_key: String,
    pub granted: bool,
}
