pub mod claims;
pub mod errors;
pub mod handler;

pub use claims::Claims;
pub use claims::RESERVED_CLAIMS;
pub use errors::JwtError;
pub use handler::JwtHandler;
pub use handler::JwtKey;
