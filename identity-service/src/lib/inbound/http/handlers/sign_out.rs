use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use crate::domain::events::AuthenticationEventKind;
use crate::inbound::http::middleware::publish;
use crate::inbound::http::middleware::AuthenticatorCommand;
use crate::inbound::http::middleware::Identity;
use crate::inbound::http::router::AppState;

pub async fn sign_out(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> (StatusCode, Extension<AuthenticatorCommand>) {
    tracing::info!(login_info = %identity.login_info, "Signed out");
    publish(&state, AuthenticationEventKind::Logout, Some(identity.login_info)).await;

    (StatusCode::NO_CONTENT, Extension(AuthenticatorCommand::Discard))
}
