//! Authenticator lifecycle: create, retrieve, init, embed, touch, update,
//! renew and discard, with one service per transport strategy.

pub mod bearer;
pub mod codec;
pub mod cookie;
pub mod dummy;
pub mod errors;
pub mod fingerprinting;
pub mod jwt;
pub mod models;
pub mod ports;
pub mod registry;
pub mod session;

pub use bearer::BearerTokenAuthenticatorService;
pub use cookie::CookieAuthenticatorService;
pub use dummy::DummyAuthenticatorService;
pub use errors::AuthenticatorError;
pub use jwt::JwtAuthenticatorService;
pub use models::AnyAuthenticator;
pub use models::Authenticator;
pub use models::Touched;
pub use ports::AuthenticatorRepository;
pub use ports::AuthenticatorService;
pub use ports::ExpirySweeper;
pub use registry::AnyAuthenticatorService;
pub use registry::AuthenticatorValue;
pub use session::SessionAuthenticatorService;
