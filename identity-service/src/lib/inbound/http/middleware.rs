use std::net::SocketAddr;
use std::sync::Arc;

use auth::Clock;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use super::handlers::not_authenticated;
use super::handlers::not_authorized;
use super::handlers::ApiError;
use crate::domain::authenticator::AnyAuthenticator;
use crate::domain::authenticator::AnyAuthenticatorService;
use crate::domain::authenticator::Authenticator;
use crate::domain::authenticator::AuthenticatorService;
use crate::domain::authorization::Authorization;
use crate::domain::events::AuthenticationEvent;
use crate::domain::events::AuthenticationEventKind;
use crate::domain::events::EventPublisher;
use crate::domain::http::AuthRequest;
use crate::domain::http::AuthResponse;
use crate::domain::login::LoginInfo;
use crate::inbound::http::router::AppState;

const MAX_BUFFERED_BODY: usize = 64 * 1024;

/// Extension holding the authenticated identity for the request
#[derive(Debug, Clone)]
pub struct Identity {
    pub login_info: LoginInfo,
    pub authenticator: AnyAuthenticator,
}

/// Response extension asking the middleware to end or replace the
/// authenticator instead of writing it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticatorCommand {
    Discard,
    Renew,
}

pub(super) async fn publish(state: &AppState, kind: AuthenticationEventKind, login_info: Option<LoginInfo>) {
    let event = AuthenticationEvent::new(kind, login_info, state.clock.now());
    if let Err(e) = state.event_publisher.publish(&event).await {
        tracing::error!(
            event_id = %event.event_id,
            event_type = event.event_type(),
            error = %e,
            "Failed to publish authentication event"
        );
    }
}

/// Headers, query and peer address of a request.
fn auth_request_from_parts(parts: &Parts) -> AuthRequest {
    let auth_request = AuthRequest::from_parts(parts);
    match parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(address)) => auth_request.with_remote_addr(address.ip()),
        None => auth_request,
    }
}

/// Request view the authenticator services read from.
///
/// Form and JSON bodies are buffered so token strategies can read them; the
/// buffered body is handed on unchanged.
async fn auth_request(req: Request) -> Result<(AuthRequest, Request), Response> {
    let (parts, body) = req.into_parts();
    let mut auth_request = auth_request_from_parts(&parts);

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let is_form = content_type.starts_with("application/x-www-form-urlencoded");
    let is_json = content_type.starts_with("application/json");
    if !is_form && !is_json {
        return Ok((auth_request, Request::from_parts(parts, body)));
    }

    let bytes = axum::body::to_bytes(body, MAX_BUFFERED_BODY)
        .await
        .map_err(|_| ApiError::BadRequest("Request body too large".to_string()).into_response())?;
    if is_form {
        auth_request = auth_request.with_form_body(&bytes);
    } else if let Ok(json) = serde_json::from_slice(&bytes) {
        auth_request = auth_request.with_json_body(json);
    }

    Ok((auth_request, Request::from_parts(parts, Body::from(bytes))))
}

/// Middleware that retrieves the authenticator, rejects the request without a
/// valid one, and writes the touched, renewed or discarded authenticator back
/// to the response.
pub async fn authenticate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let (auth_request, mut req) = match auth_request(req).await {
        Ok(pair) => pair,
        Err(response) => return response,
    };
    let service = state.authenticator_service.clone();

    let authenticator = match service.retrieve(&auth_request).await {
        Ok(Some(authenticator)) => authenticator,
        Ok(None) => {
            publish(&state, AuthenticationEventKind::NotAuthenticated, None).await;
            return not_authenticated(auth_request.headers());
        }
        Err(e) => return ApiError::from(e).into_response(),
    };

    if !authenticator.is_valid(state.clock.now()) {
        tracing::info!(
            login_info = %authenticator.login_info(),
            strategy = authenticator.strategy(),
            "Authenticator expired"
        );
        publish(&state, AuthenticationEventKind::NotAuthenticated, None).await;

        let mut response = not_authenticated(auth_request.headers());
        match write_back(service, WriteBack::Discard(authenticator)).await {
            Ok(discarded) => discarded.apply_to(&mut response),
            Err(_) => tracing::warn!("Failed to discard expired authenticator"),
        }
        return response;
    }

    let touched = service.touch(authenticator);
    let login_info = touched.authenticator().login_info().clone();
    publish(&state, AuthenticationEventKind::Authenticated, Some(login_info.clone())).await;

    req.extensions_mut().insert(Identity {
        login_info,
        authenticator: touched.authenticator().clone(),
    });

    let mut response = next.run(req).await;
    let command = response.extensions_mut().remove::<AuthenticatorCommand>();

    let operation = match command {
        Some(AuthenticatorCommand::Discard) => WriteBack::Discard(touched.into_inner()),
        Some(AuthenticatorCommand::Renew) => WriteBack::Renew(touched.into_inner(), auth_request),
        None if touched.is_touched() => WriteBack::Update(touched.into_inner()),
        None => return response,
    };

    match write_back(service, operation).await {
        Ok(auth_response) => {
            auth_response.apply_to(&mut response);
            response
        }
        Err(e) => e.into_response(),
    }
}

/// Repository write that follows an authenticated request.
enum WriteBack {
    Discard(AnyAuthenticator),
    Renew(AnyAuthenticator, AuthRequest),
    Update(AnyAuthenticator),
}

/// Runs the write on its own task so a dropped connection does not cancel it
/// halfway.
async fn write_back(service: Arc<AnyAuthenticatorService>, operation: WriteBack) -> Result<AuthResponse, ApiError> {
    let task = tokio::spawn(async move {
        match operation {
            WriteBack::Discard(authenticator) => service.discard(authenticator, AuthResponse::new()).await,
            WriteBack::Renew(authenticator, request) => {
                service.renew(authenticator, &request, AuthResponse::new()).await
            }
            WriteBack::Update(authenticator) => service.update(authenticator, AuthResponse::new()).await,
        }
    });

    match task.await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            tracing::error!(error = %e, "Authenticator write-back task failed");
            Err(ApiError::InternalServerError("Internal server error".to_string()))
        }
    }
}

/// Middleware that checks the authenticated identity against the configured
/// authorization. Must run inside `authenticate`.
pub async fn authorize(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(identity) = req.extensions().get::<Identity>().cloned() else {
        return not_authenticated(req.headers());
    };

    let auth_request = AuthRequest::new(req.headers().clone());
    if let Err(e) = state
        .authorization
        .authorize(&identity.login_info, &auth_request)
        .await
    {
        tracing::info!(error = %e, "Request not authorized");
        publish(&state, AuthenticationEventKind::NotAuthorized, Some(identity.login_info)).await;
        return not_authorized(req.headers());
    }

    next.run(req).await
}
