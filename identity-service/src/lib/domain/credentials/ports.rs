use async_trait::async_trait;
use auth::PasswordInfo;

use crate::domain::errors::RepositoryError;
use crate::domain::login::LoginInfo;

/// Persistence port for password info, keyed by login info.
#[async_trait]
pub trait AuthInfoRepository: Send + Sync + 'static {
    async fn find(&self, login_info: &LoginInfo) -> Result<Option<PasswordInfo>, RepositoryError>;

    /// Store password info for a new login.
    ///
    /// # Errors
    /// * `Duplicate` - Password info already exists for this login
    async fn add(&self, login_info: &LoginInfo, info: PasswordInfo) -> Result<PasswordInfo, RepositoryError>;

    /// Replace password info for an existing login.
    ///
    /// # Errors
    /// * `NotFound` - No password info exists for this login
    async fn update(&self, login_info: &LoginInfo, info: PasswordInfo) -> Result<PasswordInfo, RepositoryError>;

    async fn remove(&self, login_info: &LoginInfo) -> Result<(), RepositoryError>;
}
