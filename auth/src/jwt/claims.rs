use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use super::errors::JwtError;

/// Claim names owned by the token format. Custom claims may not use them.
pub const RESERVED_CLAIMS: [&str; 5] = ["jti", "iss", "sub", "iat", "exp"];

/// Generic JWT claims structure.
///
/// Supports the registered claims used for authenticators plus custom fields
/// via the `extra` map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (encoded login info)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiration time (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued at (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// JWT ID (unique token identifier)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Additional custom fields (flattened into token)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Create new empty claims.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set subject.
    pub fn with_subject(mut self, sub: impl ToString) -> Self {
        self.sub = Some(sub.to_string());
        self
    }

    /// Set expiration (Unix timestamp).
    pub fn with_expiration(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Set issued at (Unix timestamp).
    pub fn with_issued_at(mut self, iat: i64) -> Self {
        self.iat = Some(iat);
        self
    }

    /// Set issuer.
    pub fn with_issuer(mut self, iss: impl ToString) -> Self {
        self.iss = Some(iss.to_string());
        self
    }

    /// Set token identifier.
    pub fn with_jwt_id(mut self, jti: impl ToString) -> Self {
        self.jti = Some(jti.to_string());
        self
    }

    /// Merge custom claims into the token.
    ///
    /// # Errors
    /// * `ReservedClaim` - A custom claim uses a registered claim name
    pub fn with_custom_claims(mut self, custom: &Map<String, Value>) -> Result<Self, JwtError> {
        if let Some(name) = custom.keys().find(|k| RESERVED_CLAIMS.contains(&k.as_str())) {
            return Err(JwtError::ReservedClaim(name.clone()));
        }
        self.extra
            .extend(custom.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(self)
    }

    /// Custom claims, `None` when the token carries none.
    pub fn custom_claims(&self) -> Option<Map<String, Value>> {
        if self.extra.is_empty() {
            None
        } else {
            Some(self.extra.clone())
        }
    }
}
