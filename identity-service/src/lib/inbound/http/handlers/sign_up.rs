use std::str::FromStr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::credentials::Credentials;
use crate::domain::login::LoginInfo;
use crate::inbound::http::router::AppState;

const MIN_PASSWORD_LENGTH: usize = 8;

pub async fn sign_up(
    State(state): State<AppState>,
    Json(body): Json<SignUpRequest>,
) -> Result<ApiSuccess<SignUpResponseData>, ApiError> {
    state
        .credentials_provider
        .register(&body.try_into_credentials()?)
        .await
        .map_err(ApiError::from)
        .map(|ref login_info| ApiSuccess::new(StatusCode::CREATED, login_info.into()))
}

/// HTTP request body for registering credentials (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignUpRequest {
    identifier: String,
    password: String,
}

#[derive(Debug, Clone, Error)]
enum ParseSignUpRequestError {
    #[error("Invalid email: {0}")]
    Email(String),

    #[error("Password must be at least 8 characters")]
    PasswordTooShort,
}

impl SignUpRequest {
    fn try_into_credentials(self) -> Result<Credentials, ParseSignUpRequestError> {
        email_address::EmailAddress::from_str(&self.identifier)
            .map_err(|e| ParseSignUpRequestError::Email(e.to_string()))?;
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ParseSignUpRequestError::PasswordTooShort);
        }

        Ok(Credentials::new(self.identifier, self.password))
    }
}

impl From<ParseSignUpRequestError> for ApiError {
    fn from(err: ParseSignUpRequestError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignUpResponseData {
    pub provider_id: String,
    pub provider_key: String,
}

impl From<&LoginInfo> for SignUpResponseData {
    fn from(login_info: &LoginInfo) -> Self {
        Self {
            provider_id: login_info.provider_id.clone(),
            provider_key: login_info.provider_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(identifier: &str, password: &str) -> SignUpRequest {
        SignUpRequest {
            identifier: identifier.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_validation() {
        assert!(request("user@example.com", "pass_word!").try_into_credentials().is_ok());
        assert!(matches!(
            request("not-an-email", "pass_word!").try_into_credentials(),
            Err(ParseSignUpRequestError::Email(_))
        ));
        assert!(matches!(
            request("user@example.com", "short").try_into_credentials(),
            Err(ParseSignUpRequestError::PasswordTooShort)
        ));
    }
}
