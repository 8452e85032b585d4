use std::sync::Arc;

use super::errors::PasswordError;
use super::hasher::Argon2PasswordHasher;
use super::hasher::PasswordHasher;
use super::hasher::Pbkdf2PasswordHasher;
use super::models::PasswordInfo;

/// Current hasher plus the deprecated hashers still accepted for verification.
///
/// Lookup is always by the hasher id stored with the password. There is no
/// fallback: info whose id is not registered has no verifier.
#[derive(Clone)]
pub struct PasswordHasherRegistry {
    current: Arc<dyn PasswordHasher>,
    deprecated: Vec<Arc<dyn PasswordHasher>>,
}

impl PasswordHasherRegistry {
    pub fn new(current: Arc<dyn PasswordHasher>, deprecated: Vec<Arc<dyn PasswordHasher>>) -> Self {
        Self {
            current,
            deprecated,
        }
    }

    /// Build a registry from hasher identifiers.
    ///
    /// # Errors
    /// * `UnknownHasher` - An identifier names no built-in hasher
    pub fn from_ids(current: &str, deprecated: &[String]) -> Result<Self, PasswordError> {
        let current = builtin(current)?;
        let deprecated = deprecated
            .iter()
            .map(|id| builtin(id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(current, deprecated))
    }

    pub fn current(&self) -> &Arc<dyn PasswordHasher> {
        &self.current
    }

    pub fn deprecated(&self) -> &[Arc<dyn PasswordHasher>] {
        &self.deprecated
    }

    /// Hasher able to verify `info`.
    pub fn find(&self, info: &PasswordInfo) -> Option<&Arc<dyn PasswordHasher>> {
        std::iter::once(&self.current)
            .chain(self.deprecated.iter())
            .find(|hasher| hasher.is_suitable(info))
    }

    /// Whether `info` should be re-hashed with the current hasher after a
    /// successful match.
    pub fn needs_rehash(&self, info: &PasswordInfo) -> bool {
        !self.current.is_suitable(info) || self.current.is_deprecated(info).unwrap_or(true)
    }
}

impl Default for PasswordHasherRegistry {
    fn default() -> Self {
        Self::new(
            Arc::new(Argon2PasswordHasher::default()),
            vec![Arc::new(Pbkdf2PasswordHasher::default())],
        )
    }
}

fn builtin(id: &str) -> Result<Arc<dyn PasswordHasher>, PasswordError> {
    match id {
        Argon2PasswordHasher::ID => Ok(Arc::new(Argon2PasswordHasher::default())),
        Pbkdf2PasswordHasher::ID => Ok(Arc::new(Pbkdf2PasswordHasher::default())),
        other => Err(PasswordError::UnknownHasher(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_stored_id() {
        let registry = PasswordHasherRegistry::default();

        let current = PasswordInfo::new("argon2", "x");
        let legacy = PasswordInfo::new("pbkdf2-sha256", "x");
        let unknown = PasswordInfo::new("md5", "x");

        assert_eq!(registry.find(&current).map(|h| h.id()), Some("argon2"));
        assert_eq!(registry.find(&legacy).map(|h| h.id()), Some("pbkdf2-sha256"));
        assert!(registry.find(&unknown).is_none());
    }

    #[test]
    fn test_needs_rehash() {
        let registry = PasswordHasherRegistry::default();

        let current = registry.current().hash("password").unwrap();
        let legacy = Pbkdf2PasswordHasher::new(1_000).hash("password").unwrap();

        assert!(!registry.needs_rehash(&current));
        assert!(registry.needs_rehash(&legacy));
    }

    #[test]
    fn test_from_ids() {
        let registry =
            PasswordHasherRegistry::from_ids("argon2", &["pbkdf2-sha256".to_string()]).unwrap();
        assert_eq!(registry.current().id(), "argon2");
        assert_eq!(registry.deprecated().len(), 1);

        assert!(matches!(
            PasswordHasherRegistry::from_ids("bcrypt", &[]),
            Err(PasswordError::UnknownHasher(id)) if id == "bcrypt"
        ));
    }
}
