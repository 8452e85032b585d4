use std::sync::Arc;

use auth::PasswordHasher;
use auth::PasswordHasherRegistry;
use auth::PasswordInfo;

use super::errors::CredentialsError;
use super::models::Credentials;
use super::models::CREDENTIALS_PROVIDER_ID;
use super::ports::AuthInfoRepository;
use crate::domain::errors::RepositoryError;
use crate::domain::login::LoginInfo;

/// Authenticates identifier/password pairs against stored password info.
///
/// Hashes produced by a deprecated hasher, or by the current hasher with
/// weaker parameters, are replaced with a fresh hash after a successful match.
pub struct CredentialsProvider<AR>
where
    AR: AuthInfoRepository + ?Sized,
{
    repository: Arc<AR>,
    registry: PasswordHasherRegistry,
}

impl<AR> CredentialsProvider<AR>
where
    AR: AuthInfoRepository + ?Sized,
{
    /// Create a credentials provider.
    ///
    /// # Arguments
    /// * `repository` - Password info persistence
    /// * `registry` - Current hasher and deprecated hashers still accepted
    pub fn new(repository: Arc<AR>, registry: PasswordHasherRegistry) -> Self {
        Self {
            repository,
            registry,
        }
    }

    pub fn id(&self) -> &'static str {
        CREDENTIALS_PROVIDER_ID
    }

    /// Verify credentials.
    ///
    /// # Returns
    /// Login info of the authenticated identity
    ///
    /// # Errors
    /// * `InvalidCredentials` - Identifier unknown, password wrong or stored hash unreadable
    /// * `UnsupportedHasher` - Stored hash was produced by an unregistered hasher
    /// * `Repository` - Lookup or re-hash persistence failed
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<LoginInfo, CredentialsError> {
        let login_info = LoginInfo::new(CREDENTIALS_PROVIDER_ID, credentials.identifier.as_str());

        let Some(stored) = self.repository.find(&login_info).await? else {
            // Spend the same work as a real check so response time does not
            // reveal whether the identifier exists.
            let _ = hash(self.registry.current().clone(), credentials.password.clone()).await;
            return Err(CredentialsError::InvalidCredentials);
        };

        let Some(hasher) = self.registry.find(&stored).cloned() else {
            tracing::error!(
                login_info = %login_info,
                hasher = %stored.hasher,
                "Stored password uses an unsupported hasher"
            );
            return Err(CredentialsError::UnsupportedHasher(stored.hasher));
        };

        let matches = match verify(hasher, stored.clone(), credentials.password.clone()).await {
            Ok(matches) => matches,
            Err(CredentialsError::Password(e)) => {
                tracing::error!(
                    login_info = %login_info,
                    hasher = %stored.hasher,
                    error = %e,
                    "Stored password hash is unreadable"
                );
                false
            }
            Err(e) => return Err(e),
        };
        if !matches {
            return Err(CredentialsError::InvalidCredentials);
        }

        if self.registry.needs_rehash(&stored) {
            let rehashed = hash(self.registry.current().clone(), credentials.password.clone()).await?;
            self.repository.update(&login_info, rehashed).await?;
            tracing::info!(
                login_info = %login_info,
                from = %stored.hasher,
                to = %self.registry.current().id(),
                "Password re-hashed with current hasher"
            );
        }

        Ok(login_info)
    }

    /// Register a new identifier with a password hashed by the current hasher.
    ///
    /// # Errors
    /// * `IdentifierTaken` - Identifier already has password info
    /// * `Password` - Hashing failed
    /// * `Repository` - Persistence failed
    pub async fn register(&self, credentials: &Credentials) -> Result<LoginInfo, CredentialsError> {
        let login_info = LoginInfo::new(CREDENTIALS_PROVIDER_ID, credentials.identifier.as_str());

        if self.repository.find(&login_info).await?.is_some() {
            return Err(CredentialsError::IdentifierTaken(credentials.identifier.clone()));
        }

        let info = hash(self.registry.current().clone(), credentials.password.clone()).await?;
        self.repository
            .add(&login_info, info)
            .await
            .map_err(|e| match e {
                RepositoryError::Duplicate(_) => {
                    CredentialsError::IdentifierTaken(credentials.identifier.clone())
                }
                other => CredentialsError::Repository(other),
            })?;

        Ok(login_info)
    }
}

async fn hash(hasher: Arc<dyn PasswordHasher>, password: String) -> Result<PasswordInfo, CredentialsError> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| CredentialsError::Task(e.to_string()))?
        .map_err(CredentialsError::from)
}

async fn verify(
    hasher: Arc<dyn PasswordHasher>,
    info: PasswordInfo,
    password: String,
) -> Result<bool, CredentialsError> {
    tokio::task::spawn_blocking(move || hasher.matches(&info, &password))
        .await
        .map_err(|e| CredentialsError::Task(e.to_string()))?
        .map_err(CredentialsError::from)
}
