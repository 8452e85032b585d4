use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher as PhcPasswordHasher;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Argon2;
use argon2::Params;
use pbkdf2::Pbkdf2;

use super::errors::PasswordError;
use super::models::PasswordInfo;

/// A password hashing algorithm identified by a stable id.
pub trait PasswordHasher: Send + Sync + 'static {
    /// Identifier stored alongside every hash this hasher produces.
    fn id(&self) -> &str;

    /// Hash a plaintext password.
    ///
    /// # Errors
    /// * `HashingFailed` - Hashing operation failed
    fn hash(&self, plain: &str) -> Result<PasswordInfo, PasswordError>;

    /// Check a plaintext password against stored info.
    ///
    /// # Returns
    /// True if the password matches
    ///
    /// # Errors
    /// * `VerificationFailed` - Stored hash is malformed
    fn matches(&self, info: &PasswordInfo, plain: &str) -> Result<bool, PasswordError>;

    /// Whether stored info was produced with parameters weaker than the
    /// current configuration. `None` if the info was not produced by this hasher.
    fn is_deprecated(&self, info: &PasswordInfo) -> Option<bool>;

    fn is_suitable(&self, info: &PasswordInfo) -> bool {
        info.hasher == self.id()
    }
}

fn parse(info: &PasswordInfo) -> Result<PasswordHash<'_>, PasswordError> {
    PasswordHash::new(&info.password)
        .map_err(|e| PasswordError::VerificationFailed(format!("Invalid password hash: {}", e)))
}

/// Argon2id hasher with configurable cost parameters.
pub struct Argon2PasswordHasher {
    params: Params,
}

impl Argon2PasswordHasher {
    pub const ID: &'static str = "argon2";

    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// Hasher with explicit memory (KiB), iteration and parallelism costs.
    ///
    /// # Errors
    /// * `HashingFailed` - Costs are outside the ranges Argon2 accepts
    pub fn with_costs(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, PasswordError> {
        Params::new(memory_kib, iterations, parallelism, None)
            .map(Self::new)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            self.params.clone(),
        )
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn id(&self) -> &str {
        Self::ID
    }

    fn hash(&self, plain: &str) -> Result<PasswordInfo, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| PasswordInfo::new(Self::ID, hash.to_string()))
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    fn matches(&self, info: &PasswordInfo, plain: &str) -> Result<bool, PasswordError> {
        let parsed_hash = parse(info)?;

        Ok(self
            .argon2()
            .verify_password(plain.as_bytes(), &parsed_hash)
            .is_ok())
    }

    fn is_deprecated(&self, info: &PasswordInfo) -> Option<bool> {
        if !self.is_suitable(info) {
            return None;
        }
        let stored = parse(info).ok().and_then(|hash| Params::try_from(&hash).ok());

        Some(match stored {
            Some(stored) => {
                stored.m_cost() < self.params.m_cost()
                    || stored.t_cost() < self.params.t_cost()
                    || stored.p_cost() < self.params.p_cost()
            }
            None => true,
        })
    }
}

/// PBKDF2-HMAC-SHA256 hasher, kept to verify and migrate older hashes.
pub struct Pbkdf2PasswordHasher {
    rounds: u32,
}

impl Pbkdf2PasswordHasher {
    pub const ID: &'static str = "pbkdf2-sha256";
    pub const DEFAULT_ROUNDS: u32 = 10_000;

    pub fn new(rounds: u32) -> Self {
        Self { rounds }
    }
}

impl Default for Pbkdf2PasswordHasher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ROUNDS)
    }
}

impl PasswordHasher for Pbkdf2PasswordHasher {
    fn id(&self) -> &str {
        Self::ID
    }

    fn hash(&self, plain: &str) -> Result<PasswordInfo, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let params = pbkdf2::Params {
            rounds: self.rounds,
            output_length: 32,
        };

        Pbkdf2
            .hash_password_customized(
                plain.as_bytes(),
                Some(pbkdf2::Algorithm::Pbkdf2Sha256.ident()),
                None,
                params,
                &salt,
            )
            .map(|hash| PasswordInfo::new(Self::ID, hash.to_string()))
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    fn matches(&self, info: &PasswordInfo, plain: &str) -> Result<bool, PasswordError> {
        let parsed_hash = parse(info)?;

        Ok(Pbkdf2
            .verify_password(plain.as_bytes(), &parsed_hash)
            .is_ok())
    }

    fn is_deprecated(&self, info: &PasswordInfo) -> Option<bool> {
        if !self.is_suitable(info) {
            return None;
        }
        let rounds = parse(info)
            .ok()
            .and_then(|hash| hash.params.get_decimal("i"));

        Some(rounds.map_or(true, |rounds| rounds < self.rounds))
    }
}
