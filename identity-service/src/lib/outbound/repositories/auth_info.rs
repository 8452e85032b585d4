use async_trait::async_trait;
use auth::PasswordInfo;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sqlx::PgPool;

use crate::domain::credentials::ports::AuthInfoRepository;
use crate::domain::errors::RepositoryError;
use crate::domain::login::LoginInfo;

#[derive(Default)]
pub struct InMemoryAuthInfoRepository {
    entries: DashMap<LoginInfo, PasswordInfo>,
}

impl InMemoryAuthInfoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthInfoRepository for InMemoryAuthInfoRepository {
    async fn find(&self, login_info: &LoginInfo) -> Result<Option<PasswordInfo>, RepositoryError> {
        Ok(self.entries.get(login_info).map(|entry| entry.value().clone()))
    }

    async fn add(&self, login_info: &LoginInfo, info: PasswordInfo) -> Result<PasswordInfo, RepositoryError> {
        match self.entries.entry(login_info.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::Duplicate(login_info.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(info.clone());
                Ok(info)
            }
        }
    }

    async fn update(&self, login_info: &LoginInfo, info: PasswordInfo) -> Result<PasswordInfo, RepositoryError> {
        match self.entries.get_mut(login_info) {
            Some(mut entry) => {
                *entry = info.clone();
                Ok(info)
            }
            None => Err(RepositoryError::NotFound(login_info.to_string())),
        }
    }

    async fn remove(&self, login_info: &LoginInfo) -> Result<(), RepositoryError> {
        self.entries.remove(login_info);
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct PasswordInfoRow {
    hasher: String,
    password: String,
    salt: Option<String>,
}

impl From<PasswordInfoRow> for PasswordInfo {
    fn from(row: PasswordInfoRow) -> Self {
        PasswordInfo {
            hasher: row.hasher,
            password: row.password,
            salt: row.salt,
        }
    }
}

pub struct PostgresAuthInfoRepository {
    pool: PgPool,
}

impl PostgresAuthInfoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthInfoRepository for PostgresAuthInfoRepository {
    async fn find(&self, login_info: &LoginInfo) -> Result<Option<PasswordInfo>, RepositoryError> {
        let row = sqlx::query_as::<_, PasswordInfoRow>(
            r#"
            SELECT hasher, password, salt
            FROM password_info
            WHERE provider_id = $1 AND provider_key = $2
            "#,
        )
        .bind(&login_info.provider_id)
        .bind(&login_info.provider_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PasswordInfo::from))
    }

    async fn add(&self, login_info: &LoginInfo, info: PasswordInfo) -> Result<PasswordInfo, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO password_info (provider_id, provider_key, hasher, password, salt)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&login_info.provider_id)
        .bind(&login_info.provider_key)
        .bind(&info.hasher)
        .bind(&info.password)
        .bind(&info.salt)
        .execute(&self.pool)
        .await?;

        Ok(info)
    }

    async fn update(&self, login_info: &LoginInfo, info: PasswordInfo) -> Result<PasswordInfo, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE password_info
            SET hasher = $3, password = $4, salt = $5, updated_at = NOW()
            WHERE provider_id = $1 AND provider_key = $2
            "#,
        )
        .bind(&login_info.provider_id)
        .bind(&login_info.provider_key)
        .bind(&info.hasher)
        .bind(&info.password)
        .bind(&info.salt)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(login_info.to_string()));
        }

        Ok(info)
    }

    async fn remove(&self, login_info: &LoginInfo) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM password_info WHERE provider_id = $1 AND provider_key = $2")
            .bind(&login_info.provider_id)
            .bind(&login_info.provider_key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
