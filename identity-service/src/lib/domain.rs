pub mod authenticator;
pub mod authorization;
pub mod credentials;
pub mod errors;
pub mod events;
pub mod http;
pub mod login;
pub mod social;
