//! Social provider state: CSRF protection and request-scoped data carried
//! across the redirect to an OAuth provider and back.

pub mod errors;
pub mod flows;
pub mod handlers;
pub mod models;
pub mod service;

pub use errors::OAuthStateError;
pub use flows::OAuth1Callback;
pub use flows::OAuth1StateFlow;
pub use flows::OAuth2Callback;
pub use flows::OAuth2Settings;
pub use flows::OAuth2StateFlow;
pub use handlers::CsrfStateItemHandler;
pub use handlers::StateItemHandler;
pub use handlers::TokenSecretItemHandler;
pub use handlers::UserStateItemHandler;
pub use models::SocialState;
pub use models::StateItem;
pub use service::SocialStateHandler;
pub use service::SocialStateSettings;
