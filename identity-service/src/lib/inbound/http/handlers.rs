use axum::http::header::ACCEPT;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::domain::authenticator::AuthenticatorError;
use crate::domain::authorization::AuthorizationError;
use crate::domain::credentials::CredentialsError;
use crate::domain::social::OAuthStateError;

pub mod admin;
pub mod me;
pub mod renew;
pub mod sign_in;
pub mod sign_out;
pub mod sign_up;
pub mod social;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    UnprocessableEntity(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Forbidden(String),
}

impl ApiError {
    fn internal() -> Self {
        ApiError::InternalServerError("Internal server error".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
        };

        (status, Json(ApiResponseBody::new_error(status, message))).into_response()
    }
}

impl From<CredentialsError> for ApiError {
    fn from(err: CredentialsError) -> Self {
        match err {
            CredentialsError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            CredentialsError::IdentifierTaken(_) => ApiError::Conflict(err.to_string()),
            CredentialsError::UnsupportedHasher(_)
            | CredentialsError::Password(_)
            | CredentialsError::Repository(_)
            | CredentialsError::Task(_) => {
                tracing::error!(error = %err, "Credentials operation failed");
                ApiError::internal()
            }
        }
    }
}

impl From<AuthenticatorError> for ApiError {
    fn from(err: AuthenticatorError) -> Self {
        tracing::error!(error = %err, "Authenticator operation failed");
        ApiError::internal()
    }
}

impl From<OAuthStateError> for ApiError {
    fn from(err: OAuthStateError) -> Self {
        match err {
            OAuthStateError::Generation(_) => {
                tracing::error!(error = %err, "Social state could not be generated");
                ApiError::internal()
            }
            _ => {
                tracing::info!(error = %err, "Social login rejected");
                ApiError::Unauthorized("Social authentication failed".to_string())
            }
        }
    }
}

impl From<AuthorizationError> for ApiError {
    fn from(err: AuthorizationError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData { message },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaType {
    Json,
    Html,
    Text,
}

/// First supported media type in the `Accept` header. JSON when nothing matches.
fn negotiate(headers: &HeaderMap) -> MediaType {
    let accept = headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    accept
        .split(',')
        .filter_map(|range| range.split(';').next())
        .map(str::trim)
        .find_map(|range| match range {
            "application/json" | "*/*" | "application/*" => Some(MediaType::Json),
            "text/html" => Some(MediaType::Html),
            "text/plain" | "text/*" => Some(MediaType::Text),
            _ => None,
        })
        .unwrap_or(MediaType::Json)
}

fn negotiated_error(headers: &HeaderMap, status: StatusCode, message: &str) -> Response {
    match negotiate(headers) {
        MediaType::Json => ApiError::into_response(match status {
            StatusCode::FORBIDDEN => ApiError::Forbidden(message.to_string()),
            _ => ApiError::Unauthorized(message.to_string()),
        }),
        MediaType::Html => (
            status,
            Html(format!(
                "<!DOCTYPE html><html><head><title>{}</title></head><body><h1>{}</h1></body></html>",
                status, message
            )),
        )
            .into_response(),
        MediaType::Text => (status, message.to_string()).into_response(),
    }
}

/// 401 response for requests without a valid authenticator.
pub fn not_authenticated(headers: &HeaderMap) -> Response {
    negotiated_error(headers, StatusCode::UNAUTHORIZED, "Authentication required")
}

/// 403 response for authenticated requests that are not authorized.
pub fn not_authorized(headers: &HeaderMap) -> Response {
    negotiated_error(headers, StatusCode::FORBIDDEN, "Access denied")
}

#[cfg(test)]
mod tests {
    use axum::http::header::CONTENT_TYPE;
    use axum::http::HeaderValue;

    use super::*;

    fn accept(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn content_type(response: &Response) -> &str {
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    #[test]
    fn test_negotiation() {
        assert_eq!(negotiate(&HeaderMap::new()), MediaType::Json);
        assert_eq!(negotiate(&accept("text/html,application/xhtml+xml;q=0.9")), MediaType::Html);
        assert_eq!(negotiate(&accept("text/plain")), MediaType::Text);
        assert_eq!(negotiate(&accept("image/png, application/json;q=0.5")), MediaType::Json);
        assert_eq!(negotiate(&accept("image/png")), MediaType::Json);
    }

    #[test]
    fn test_not_authenticated_status_and_type() {
        let json = not_authenticated(&HeaderMap::new());
        assert_eq!(json.status(), StatusCode::UNAUTHORIZED);
        assert!(content_type(&json).starts_with("application/json"));

        let html = not_authenticated(&accept("text/html"));
        assert_eq!(html.status(), StatusCode::UNAUTHORIZED);
        assert!(content_type(&html).starts_with("text/html"));

        let text = not_authorized(&accept("text/plain"));
        assert_eq!(text.status(), StatusCode::FORBIDDEN);
        assert!(content_type(&text).starts_with("text/plain"));
    }

    #[test]
    fn test_internal_errors_do_not_leak() {
        let err = ApiError::from(CredentialsError::UnsupportedHasher("md5".to_string()));
        assert_eq!(err, ApiError::InternalServerError("Internal server error".to_string()));

        let err = ApiError::from(OAuthStateError::Mismatch("state"));
        assert_eq!(err, ApiError::Unauthorized("Social authentication failed".to_string()));
    }
}
