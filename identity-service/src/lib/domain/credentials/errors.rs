use auth::PasswordError;
use thiserror::Error;

use crate::domain::errors::RepositoryError;

/// Error for credentials authentication and registration.
#[derive(Debug, Clone, Error)]
pub enum CredentialsError {
    /// Unknown identifier or wrong password. Deliberately indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Stored password uses unsupported hasher: {0}")]
    UnsupportedHasher(String),

    #[error("Identifier already registered: {0}")]
    IdentifierTaken(String),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Password hashing task failed: {0}")]
    Task(String),
}
