pub mod clock;
pub mod fingerprint;
pub mod id;

pub use clock::Clock;
pub use clock::FixedClock;
pub use clock::SystemClock;
pub use fingerprint::DefaultFingerprintGenerator;
pub use fingerprint::FingerprintGenerator;
pub use id::IdGenerator;
pub use id::IdGeneratorError;
pub use id::SecureRandom;
pub use id::SecureRandomIdGenerator;
