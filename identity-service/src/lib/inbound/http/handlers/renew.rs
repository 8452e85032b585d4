use axum::http::StatusCode;
use axum::Extension;

use super::me::IdentityData;
use super::ApiSuccess;
use crate::inbound::http::middleware::AuthenticatorCommand;
use crate::inbound::http::middleware::Identity;

/// Replace the current authenticator with a fresh one for the same identity.
pub async fn renew(
    Extension(identity): Extension<Identity>,
) -> (Extension<AuthenticatorCommand>, ApiSuccess<IdentityData>) {
    (
        Extension(AuthenticatorCommand::Renew),
        ApiSuccess::new(StatusCode::OK, (&identity).into()),
    )
}
