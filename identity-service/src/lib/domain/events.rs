use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::login::LoginInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationEventKind {
    Login,
    Logout,
    Authenticated,
    NotAuthenticated,
    NotAuthorized,
}

/// Outcome of an authentication step, published for interested subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticationEvent {
    pub event_id: String,
    pub kind: AuthenticationEventKind,
    pub login_info: Option<LoginInfo>,
    pub occurred_at: DateTime<Utc>,
}

impl AuthenticationEvent {
    /// Create an event with a fresh event ID.
    ///
    /// # Arguments
    /// * `kind` - What happened
    /// * `login_info` - Identity involved, `None` for anonymous requests
    /// * `occurred_at` - Time read from the service clock
    pub fn new(kind: AuthenticationEventKind, login_info: Option<LoginInfo>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            kind,
            login_info,
            occurred_at,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self.kind {
            AuthenticationEventKind::Login => "login",
            AuthenticationEventKind::Logout => "logout",
            AuthenticationEventKind::Authenticated => "authenticated",
            AuthenticationEventKind::NotAuthenticated => "not_authenticated",
            AuthenticationEventKind::NotAuthorized => "not_authorized",
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum EventPublisherError {
    #[error("Failed to publish event: {0}")]
    PublishFailed(String),
}

/// Port for publishing authentication events.
#[async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    /// Publish an event. Delivery is fire-and-forget.
    ///
    /// # Errors
    /// * `PublishFailed` - Event could not be handed to the transport
    async fn publish(&self, event: &AuthenticationEvent) -> Result<(), EventPublisherError>;
}
