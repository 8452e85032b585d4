pub mod crypter;
pub mod encoder;
pub mod errors;
pub mod signer;

pub use crypter::AesCtrCrypter;
pub use crypter::Crypter;
pub use encoder::AuthenticatorEncoder;
pub use encoder::Base64AuthenticatorEncoder;
pub use encoder::CrypterAuthenticatorEncoder;
pub use errors::CryptoError;
pub use signer::HmacSigner;
pub use signer::Signer;

/// Version tag prefixed to every envelope this crate produces.
pub const ENVELOPE_VERSION: &str = "1";
