use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Identity of a user at a given provider.
///
/// `provider_id` names the provider ("credentials", "github", ...) and
/// `provider_key` is the identifier the provider uses for the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoginInfo {
    pub provider_id: String,
    pub provider_key: String,
}

impl LoginInfo {
    pub fn new(provider_id: impl Into<String>, provider_key: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            provider_key: provider_key.into(),
        }
    }
}

impl fmt::Display for LoginInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider_id, self.provider_key)
    }
}
