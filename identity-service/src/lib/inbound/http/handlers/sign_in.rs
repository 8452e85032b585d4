use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::authenticator::AuthenticatorService;
use crate::domain::credentials::Credentials;
use crate::domain::events::AuthenticationEventKind;
use crate::domain::http::AuthRequest;
use crate::domain::http::AuthResponse;
use crate::inbound::http::middleware::publish;
use crate::inbound::http::router::AppState;

/// Verify credentials and issue an authenticator with the configured strategy.
///
/// Cookie based strategies set their cookie on the response. Token based
/// strategies also return the token in the body.
pub async fn sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(body): Json<SignInRequest>,
) -> Result<Response, ApiError> {
    let credentials = Credentials::new(body.identifier, body.password);
    let login_info = state.credentials_provider.authenticate(&credentials).await?;

    let mut auth_request = AuthRequest::new(headers);
    if let Some(ConnectInfo(address)) = connect_info {
        auth_request = auth_request.with_remote_addr(address.ip());
    }

    let service = &state.authenticator_service;
    let authenticator = service.create(login_info.clone(), &auth_request).await?;
    let value = service.init(authenticator).await?;
    let token = value.token().map(str::to_string);
    let auth_response = service.embed(value, AuthResponse::new())?;

    tracing::info!(login_info = %login_info, strategy = service.strategy(), "Signed in");
    publish(&state, AuthenticationEventKind::Login, Some(login_info.clone())).await;

    let mut response = ApiSuccess::new(
        StatusCode::OK,
        SignInResponseData {
            provider_id: login_info.provider_id,
            provider_key: login_info.provider_key,
            token,
        },
    )
    .into_response();
    auth_response.apply_to(&mut response);

    Ok(response)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignInRequest {
    identifier: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignInResponseData {
    pub provider_id: String,
    pub provider_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}
