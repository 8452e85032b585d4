//! Framework-neutral request and response views used by the authenticator
//! services. The inbound adapter converts to and from these types.

pub mod cookie;
pub mod request;
pub mod response;

pub use cookie::Cookie;
pub use cookie::CookieSettings;
pub use cookie::DiscardingCookie;
pub use cookie::SameSite;
pub use request::AuthRequest;
pub use request::RequestPart;
pub use response::AuthResponse;
