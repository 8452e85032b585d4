//! Username/password authentication with online migration of password hashes.

pub mod errors;
pub mod models;
pub mod ports;
pub mod service;

pub use errors::CredentialsError;
pub use models::Credentials;
pub use ports::AuthInfoRepository;
pub use service::CredentialsProvider;
