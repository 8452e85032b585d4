use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::PoisonError;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::RngCore;
use rand::SeedableRng;
use thiserror::Error;

/// Error for ID generation.
#[derive(Debug, Clone, Error)]
pub enum IdGeneratorError {
    #[error("Random generation task failed: {0}")]
    TaskFailed(String),
}

/// Generates unguessable identifiers.
#[async_trait]
pub trait IdGenerator: Send + Sync + 'static {
    async fn generate(&self) -> Result<String, IdGeneratorError>;
}

/// Process-wide cryptographically secure generator.
///
/// Seeded from the OS entropy source on first use and shared by every
/// generator in the process. Safe to call concurrently.
pub struct SecureRandom {
    rng: Mutex<StdRng>,
}

static SHARED: OnceLock<SecureRandom> = OnceLock::new();

impl SecureRandom {
    /// Shared handle, initialised lazily.
    pub fn shared() -> &'static SecureRandom {
        SHARED.get_or_init(|| SecureRandom {
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    pub fn fill_bytes(&self, dest: &mut [u8]) {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill_bytes(dest);
    }
}

/// Hex encoded random identifiers.
///
/// Generation runs on the blocking pool because seeding may wait on OS
/// entropy.
#[derive(Debug, Clone, Copy)]
pub struct SecureRandomIdGenerator {
    size_in_bytes: usize,
}

impl SecureRandomIdGenerator {
    pub const DEFAULT_SIZE_IN_BYTES: usize = 128;

    pub fn new(size_in_bytes: usize) -> Self {
        Self { size_in_bytes }
    }
}

impl Default for SecureRandomIdGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE_IN_BYTES)
    }
}

#[async_trait]
impl IdGenerator for SecureRandomIdGenerator {
    async fn generate(&self) -> Result<String, IdGeneratorError> {
        let size = self.size_in_bytes;
        tokio::task::spawn_blocking(move || {
            let mut bytes = vec![0u8; size];
            SecureRandom::shared().fill_bytes(&mut bytes);
            hex::encode(bytes)
        })
        .await
        .map_err(|e| IdGeneratorError::TaskFailed(e.to_string()))
    }
}
