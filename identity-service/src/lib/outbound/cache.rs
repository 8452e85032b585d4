use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth::Clock;
use chrono::DateTime;
use chrono::Utc;
use dashmap::DashMap;

use crate::domain::authenticator::ports::CacheLayer;
use crate::domain::authenticator::ports::ExpirySweeper;
use crate::domain::errors::RepositoryError;

struct CacheEntry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Process-local cache. Expired entries are dropped when next read or by
/// `sweep_expired`.
pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[async_trait]
impl CacheLayer for InMemoryCache {
    async fn save(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), RepositoryError> {
        let expires_at = match ttl {
            Some(ttl) => {
                let ttl = chrono::Duration::from_std(ttl)
                    .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
                Some(self.clock.now() + ttl)
            }
            None => None,
        };
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });

        Ok(())
    }

    async fn find(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let now = self.clock.now();
        let expired = match self.entries.get(key) {
            Some(entry) => match entry.expires_at {
                Some(expires_at) if expires_at <= now => true,
                _ => return Ok(Some(entry.value.clone())),
            },
            None => return Ok(None),
        };

        if expired {
            self.entries
                .remove_if(key, |_, entry| entry.is_expired(now));
        }

        Ok(None)
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[async_trait]
impl ExpirySweeper for InMemoryCache {
    async fn sweep_expired(&self) -> Result<u64, RepositoryError> {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));

        Ok(before.saturating_sub(self.entries.len()) as u64)
    }
}
