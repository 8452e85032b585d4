use thiserror::Error;

/// Invalid or inconsistent settings detected while assembling services.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Unknown authenticator strategy: {0}")]
    UnknownStrategy(String),

    #[error("Authenticator strategy {0} requires a repository")]
    MissingRepository(String),

    #[error("Invalid JWT settings: {0}")]
    Jwt(String),

    #[error("Invalid password hasher settings: {0}")]
    PasswordHasher(String),

    #[error("Invalid OAuth2 provider settings for {provider}: {message}")]
    OAuth2Provider { provider: String, message: String },

    #[error("Invalid setting {name}: {message}")]
    Invalid { name: String, message: String },
}

/// Error for persistence adapters.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    Duplicate(String),

    #[error("Failed to serialize record: {0}")]
    Serialization(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepositoryError::Duplicate(db_err.message().to_string())
            }
            _ => RepositoryError::DatabaseError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
