pub mod errors;
pub mod hasher;
pub mod models;
pub mod registry;

pub use errors::PasswordError;
pub use hasher::Argon2PasswordHasher;
pub use hasher::PasswordHasher;
pub use hasher::Pbkdf2PasswordHasher;
pub use models::PasswordInfo;
pub use registry::PasswordHasherRegistry;
