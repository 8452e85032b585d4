use std::fmt;

use serde::Deserialize;

/// Provider id of logins established with an identifier and password.
pub const CREDENTIALS_PROVIDER_ID: &str = "credentials";

/// Identifier and plaintext password submitted by a client.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("password", &"***")
            .finish()
    }
}
