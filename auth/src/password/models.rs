use serde::Deserialize;
use serde::Serialize;

/// Stored password for a login.
///
/// `password` holds the PHC string produced by the hasher named in `hasher`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordInfo {
    pub hasher: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl PasswordInfo {
    pub fn new(hasher: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            hasher: hasher.into(),
            password: password.into(),
            salt: None,
        }
    }
}
