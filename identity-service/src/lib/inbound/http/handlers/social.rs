use std::collections::HashMap;

use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::response::IntoResponse;
use axum::response::Redirect;
use axum::response::Response;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::http::AuthRequest;
use crate::domain::http::AuthResponse;
use crate::domain::social::OAuth2StateFlow;
use crate::inbound::http::router::AppState;

fn flow<'a>(state: &'a AppState, provider: &str) -> Result<&'a OAuth2StateFlow, ApiError> {
    state
        .oauth2_flows
        .get(provider)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown provider: {}", provider)))
}

/// Send the browser to the provider. Query parameters travel through the flow
/// as user state.
pub async fn oauth2_redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let flow = flow(&state, &provider)?;
    let user_state = (!params.is_empty()).then(|| {
        params
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect::<Map<String, Value>>()
    });

    let (url, auth_response) = flow.authorization_redirect(user_state).await?;

    let mut response = Redirect::to(url.as_str()).into_response();
    auth_response.apply_to(&mut response);
    Ok(response)
}

/// Validate the provider callback against the state cookie. The state
/// cookie is discarded whether or not the callback is accepted.
///
/// The authorization code is returned as is; exchanging it for an access
/// token is up to the caller.
pub async fn oauth2_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let flow = flow(&state, &provider)?;
    let request = match uri.query() {
        Some(query) => AuthRequest::new(headers).with_query(query),
        None => AuthRequest::new(headers),
    };
    let auth_response = flow.discard(AuthResponse::new())?;
    let callback = match flow.callback(&request) {
        Ok(callback) => callback,
        Err(e) => {
            let mut response = ApiError::from(e).into_response();
            auth_response.apply_to(&mut response);
            return Ok(response);
        }
    };

    tracing::info!(provider = %provider, "OAuth2 callback accepted");

    let mut response = ApiSuccess::new(
        StatusCode::OK,
        OAuth2CallbackData {
            provider,
            code: callback.code,
            user_state: callback
                .state
                .user_state()
                .map(|user_state| Value::Object(user_state.data.clone())),
        },
    )
    .into_response();
    auth_response.apply_to(&mut response);

    Ok(response)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OAuth2CallbackData {
    pub provider: String,
    pub code: String,
    pub user_state: Option<Value>,
}
