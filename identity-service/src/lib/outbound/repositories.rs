pub mod auth_info;
pub mod authenticator;

pub use auth_info::InMemoryAuthInfoRepository;
pub use auth_info::PostgresAuthInfoRepository;
pub use authenticator::CacheAuthenticatorRepository;
pub use authenticator::InMemoryAuthenticatorRepository;
pub use authenticator::PostgresAuthenticatorRepository;
