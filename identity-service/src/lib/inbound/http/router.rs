use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use auth::Clock;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::admin::admin;
use super::handlers::me::me;
use super::handlers::renew::renew;
use super::handlers::sign_in::sign_in;
use super::handlers::sign_out::sign_out;
use super::handlers::sign_up::sign_up;
use super::handlers::social::oauth2_callback;
use super::handlers::social::oauth2_redirect;
use super::middleware::authenticate as auth_middleware;
use super::middleware::authorize as authz_middleware;
use crate::domain::authenticator::AnyAuthenticatorService;
use crate::domain::authorization::Authorization;
use crate::domain::credentials::AuthInfoRepository;
use crate::domain::credentials::CredentialsProvider;
use crate::domain::events::EventPublisher;
use crate::domain::social::OAuth2StateFlow;

#[derive(Clone)]
pub struct AppState {
    pub credentials_provider: Arc<CredentialsProvider<dyn AuthInfoRepository>>,
    pub authenticator_service: Arc<AnyAuthenticatorService>,
    pub oauth2_flows: Arc<HashMap<String, OAuth2StateFlow>>,
    pub authorization: Arc<dyn Authorization>,
    pub event_publisher: Arc<dyn EventPublisher>,
    pub clock: Arc<dyn Clock>,
}

/// Span for one request, keyed by the path without its query.
fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version(),
    )
}

fn log_request(request: &Request<Body>, _span: &Span) {
    tracing::info!(
        method = %request.method(),
        path = %request.uri().path(),
        "Request started"
    );
}

pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/sign-up", post(sign_up))
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/oauth2/:provider", get(oauth2_redirect))
        .route("/api/auth/oauth2/:provider/callback", get(oauth2_callback));

    let protected_routes = Router::new()
        .route("/api/auth/sign-out", post(sign_out))
        .route("/api/auth/renew", post(renew))
        .route("/api/me", get(me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/api/admin", get(admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authz_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(request_span)
        .on_request(log_request)
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
