use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use auth::Clock;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::authenticator::models::ExpirableAuthenticator;
use crate::domain::authenticator::models::StorableAuthenticator;
use crate::domain::authenticator::ports::AuthenticatorRepository;
use crate::domain::authenticator::ports::CacheLayer;
use crate::domain::authenticator::ports::ExpirySweeper;
use crate::domain::errors::RepositoryError;
use crate::outbound::cache::InMemoryCache;

/// Authenticator store on top of a cache layer.
///
/// Entries are stored as JSON and expire together with the authenticator.
pub struct CacheAuthenticatorRepository<T, C: ?Sized> {
    cache: Arc<C>,
    clock: Arc<dyn Clock>,
    prefix: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C> CacheAuthenticatorRepository<T, C>
where
    C: CacheLayer + ?Sized,
{
    /// # Arguments
    /// * `cache` - Backing key/value cache
    /// * `clock` - Time source for entry TTLs
    /// * `prefix` - Key namespace, one per authenticator kind
    pub fn new(cache: Arc<C>, clock: Arc<dyn Clock>, prefix: impl Into<String>) -> Self {
        Self {
            cache,
            clock,
            prefix: prefix.into(),
            _marker: PhantomData,
        }
    }

    fn key(&self, id: &str) -> String {
        format!("{}:{}", self.prefix, id)
    }
}

/// Authenticator store on a process-local cache.
pub type InMemoryAuthenticatorRepository<T> = CacheAuthenticatorRepository<T, InMemoryCache>;

impl<T> CacheAuthenticatorRepository<T, InMemoryCache> {
    /// Store backed by its own `InMemoryCache`.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(InMemoryCache::new(clock.clone())),
            clock,
            "authenticator",
        )
    }
}

impl<T, C> CacheAuthenticatorRepository<T, C>
where
    T: StorableAuthenticator + ExpirableAuthenticator,
    C: CacheLayer + ?Sized,
{
    async fn save(&self, authenticator: &T) -> Result<(), RepositoryError> {
        let value = serde_json::to_string(authenticator)?;
        let ttl = (authenticator.expires_at() - self.clock.now())
            .to_std()
            .unwrap_or_default();

        self.cache
            .save(&self.key(authenticator.id()), value, Some(ttl))
            .await
    }
}

#[async_trait]
impl<T, C> AuthenticatorRepository<T> for CacheAuthenticatorRepository<T, C>
where
    T: StorableAuthenticator + ExpirableAuthenticator,
    C: CacheLayer + ?Sized,
{
    async fn find(&self, id: &str) -> Result<Option<T>, RepositoryError> {
        match self.cache.find(&self.key(id)).await? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    async fn add(&self, authenticator: T) -> Result<T, RepositoryError> {
        if self.cache.find(&self.key(authenticator.id())).await?.is_some() {
            return Err(RepositoryError::Duplicate(authenticator.id().to_string()));
        }
        self.save(&authenticator).await?;

        Ok(authenticator)
    }

    async fn update(&self, authenticator: T) -> Result<T, RepositoryError> {
        if self.cache.find(&self.key(authenticator.id())).await?.is_none() {
            return Err(RepositoryError::NotFound(authenticator.id().to_string()));
        }
        self.save(&authenticator).await?;

        Ok(authenticator)
    }

    async fn remove(&self, id: &str) -> Result<(), RepositoryError> {
        self.cache.remove(&self.key(id)).await
    }
}

/// PostgreSQL authenticator store.
///
/// All strategies share the `authenticators` table and are told apart by the
/// `strategy` column. The authenticator itself is kept as a JSON payload.
pub struct PostgresAuthenticatorRepository<T> {
    pool: PgPool,
    strategy: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PostgresAuthenticatorRepository<T> {
    pub fn new(pool: PgPool, strategy: &'static str) -> Self {
        Self {
            pool,
            strategy,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T> AuthenticatorRepository<T> for PostgresAuthenticatorRepository<T>
where
    T: StorableAuthenticator + ExpirableAuthenticator,
{
    async fn find(&self, id: &str) -> Result<Option<T>, RepositoryError> {
        let payload = sqlx::query_scalar::<_, Json<T>>(
            r#"
            SELECT payload
            FROM authenticators
            WHERE id = $1 AND strategy = $2
            "#,
        )
        .bind(id)
        .bind(self.strategy)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payload.map(|Json(authenticator)| authenticator))
    }

    async fn add(&self, authenticator: T) -> Result<T, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO authenticators (id, strategy, provider_id, provider_key, payload, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(authenticator.id())
        .bind(self.strategy)
        .bind(&authenticator.login_info().provider_id)
        .bind(&authenticator.login_info().provider_key)
        .bind(Json(&authenticator))
        .bind(authenticator.expires_at())
        .execute(&self.pool)
        .await?;

        Ok(authenticator)
    }

    async fn update(&self, authenticator: T) -> Result<T, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE authenticators
            SET payload = $3, expires_at = $4
            WHERE id = $1 AND strategy = $2
            "#,
        )
        .bind(authenticator.id())
        .bind(self.strategy)
        .bind(Json(&authenticator))
        .bind(authenticator.expires_at())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(authenticator.id().to_string()));
        }

        Ok(authenticator)
    }

    async fn remove(&self, id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM authenticators WHERE id = $1 AND strategy = $2")
            .bind(id)
            .bind(self.strategy)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl<T: 'static> ExpirySweeper for PostgresAuthenticatorRepository<T> {
    async fn sweep_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM authenticators WHERE strategy = $1 AND expires_at <= now()")
            .bind(self.strategy)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
