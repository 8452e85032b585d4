//! Authentication primitives library
//!
//! Leaf building blocks for issuing and validating authenticators:
//! - Crypto envelope: HMAC signer, AES-CTR crypter, authenticator encoders
//! - JWT encoding and validation with an algorithm factory
//! - Password hashing with a hasher registry for online migration
//! - Clock, secure ID generation and request fingerprinting
//!
//! # Examples
//!
//! ## Signing
//! ```
//! use auth::{HmacSigner, Signer};
//!
//! let signer = HmacSigner::new("secret-key");
//! let signed = signer.sign("value").unwrap();
//! assert_eq!(signer.extract(&signed).unwrap(), "value");
//! ```
//!
//! ## Encryption
//! ```
//! use auth::{AesCtrCrypter, Crypter};
//!
//! let crypter = AesCtrCrypter::new("secret-key");
//! let encrypted = crypter.encrypt("value").unwrap();
//! assert_eq!(crypter.decrypt(&encrypted).unwrap(), "value");
//! ```
//!
//! ## Password Hashing
//! ```
//! use auth::{PasswordHasher, PasswordHasherRegistry};
//!
//! let registry = PasswordHasherRegistry::default();
//! let info = registry.current().hash("my_password").unwrap();
//! let hasher = registry.find(&info).unwrap();
//! assert!(hasher.matches(&info, "my_password").unwrap());
//! ```

pub mod crypto;
pub mod jwt;
pub mod password;
pub mod util;

// Re-export commonly used items
pub use crypto::AesCtrCrypter;
pub use crypto::AuthenticatorEncoder;
pub use crypto::Base64AuthenticatorEncoder;
pub use crypto::Crypter;
pub use crypto::CrypterAuthenticatorEncoder;
pub use crypto::CryptoError;
pub use crypto::HmacSigner;
pub use crypto::Signer;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use jwt::JwtKey;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use password::PasswordHasherRegistry;
pub use password::PasswordInfo;
pub use util::Clock;
pub use util::FingerprintGenerator;
pub use util::IdGenerator;
pub use util::SecureRandomIdGenerator;
pub use util::SystemClock;
