pub mod app;
pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;

pub use domain::authenticator;
pub use domain::credentials;
pub use domain::social;
pub use outbound::repositories;
