use std::sync::Arc;

use async_trait::async_trait;
use auth::Crypter;
use auth::IdGenerator;
use serde_json::json;
use serde_json::Value;
use subtle::ConstantTimeEq;

use super::errors::OAuthStateError;
use super::models::CsrfState;
use super::models::StateItem;
use super::models::TokenSecret;
use super::models::UserState;
use crate::domain::http::AuthRequest;

/// Handles one kind of item in the social state.
#[async_trait]
pub trait StateItemHandler: Send + Sync + 'static {
    /// Key under which the item is serialized.
    fn key(&self) -> &'static str;

    /// Whether a state without this item is rejected.
    fn is_required(&self) -> bool;

    /// Item generated for every new state. `None` for items the caller supplies.
    async fn item(&self) -> Result<Option<StateItem>, OAuthStateError>;

    fn can_handle(&self, item: &StateItem) -> bool;

    fn serialize(&self, item: &StateItem) -> Result<Value, OAuthStateError>;

    /// Restore the item and check it against the callback request.
    ///
    /// # Errors
    /// * `MissingEcho` - Callback does not carry the value the item expects
    /// * `Mismatch` - Echoed value differs from the stored one
    /// * `Malformed` - Stored value has the wrong shape
    fn unserialize(&self, value: &Value, request: &AuthRequest) -> Result<StateItem, OAuthStateError>;
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn malformed(key: &str) -> OAuthStateError {
    OAuthStateError::Malformed(format!("invalid {} item", key))
}

/// Binds the OAuth2 `state` parameter to the browser that started the flow.
pub struct CsrfStateItemHandler {
    id_generator: Arc<dyn IdGenerator>,
}

impl CsrfStateItemHandler {
    pub const KEY: &'static str = "csrf-state";
    pub const ECHO_PARAMETER: &'static str = "state";

    pub fn new(id_generator: Arc<dyn IdGenerator>) -> Self {
        Self { id_generator }
    }
}

#[async_trait]
impl StateItemHandler for CsrfStateItemHandler {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn is_required(&self) -> bool {
        true
    }

    async fn item(&self) -> Result<Option<StateItem>, OAuthStateError> {
        let token = self
            .id_generator
            .generate()
            .await
            .map_err(|e| OAuthStateError::Generation(e.to_string()))?;

        Ok(Some(StateItem::Csrf(CsrfState { token })))
    }

    fn can_handle(&self, item: &StateItem) -> bool {
        matches!(item, StateItem::Csrf(_))
    }

    fn serialize(&self, item: &StateItem) -> Result<Value, OAuthStateError> {
        match item {
            StateItem::Csrf(csrf) => Ok(Value::String(csrf.token.clone())),
            _ => Err(malformed(Self::KEY)),
        }
    }

    fn unserialize(&self, value: &Value, request: &AuthRequest) -> Result<StateItem, OAuthStateError> {
        let token = value.as_str().ok_or_else(|| malformed(Self::KEY))?;
        let echo = request
            .query_param(Self::ECHO_PARAMETER)
            .ok_or(OAuthStateError::MissingEcho(Self::ECHO_PARAMETER))?;

        if !constant_time_eq(token, echo) {
            return Err(OAuthStateError::Mismatch(Self::ECHO_PARAMETER));
        }

        Ok(StateItem::Csrf(CsrfState {
            token: token.to_string(),
        }))
    }
}

/// Carries application data, e.g. the page to return to, through the flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserStateItemHandler;

impl UserStateItemHandler {
    pub const KEY: &'static str = "user-state";
}

#[async_trait]
impl StateItemHandler for UserStateItemHandler {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn is_required(&self) -> bool {
        false
    }

    async fn item(&self) -> Result<Option<StateItem>, OAuthStateError> {
        Ok(None)
    }

    fn can_handle(&self, item: &StateItem) -> bool {
        matches!(item, StateItem::User(_))
    }

    fn serialize(&self, item: &StateItem) -> Result<Value, OAuthStateError> {
        match item {
            StateItem::User(user) => Ok(Value::Object(user.data.clone())),
            _ => Err(malformed(Self::KEY)),
        }
    }

    fn unserialize(&self, value: &Value, _request: &AuthRequest) -> Result<StateItem, OAuthStateError> {
        let data = value.as_object().ok_or_else(|| malformed(Self::KEY))?;

        Ok(StateItem::User(UserState { data: data.clone() }))
    }
}

/// Keeps the OAuth1 request token secret between the request-token call and
/// the callback. The secret is encrypted inside the state.
pub struct TokenSecretItemHandler {
    crypter: Arc<dyn Crypter>,
}

impl TokenSecretItemHandler {
    pub const KEY: &'static str = "oauth1-token-secret";
    pub const ECHO_PARAMETER: &'static str = "oauth_token";

    pub fn new(crypter: Arc<dyn Crypter>) -> Self {
        Self { crypter }
    }
}

#[async_trait]
impl StateItemHandler for TokenSecretItemHandler {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn is_required(&self) -> bool {
        true
    }

    async fn item(&self) -> Result<Option<StateItem>, OAuthStateError> {
        Ok(None)
    }

    fn can_handle(&self, item: &StateItem) -> bool {
        matches!(item, StateItem::TokenSecret(_))
    }

    fn serialize(&self, item: &StateItem) -> Result<Value, OAuthStateError> {
        match item {
            StateItem::TokenSecret(secret) => Ok(json!({
                "token": secret.token,
                "secret": self.crypter.encrypt(&secret.secret)?,
            })),
            _ => Err(malformed(Self::KEY)),
        }
    }

    fn unserialize(&self, value: &Value, request: &AuthRequest) -> Result<StateItem, OAuthStateError> {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .ok_or_else(|| malformed(Self::KEY))
        };
        let token = field("token")?;
        let secret = self.crypter.decrypt(field("secret")?)?;

        let echo = request
            .query_param(Self::ECHO_PARAMETER)
            .ok_or(OAuthStateError::MissingEcho(Self::ECHO_PARAMETER))?;
        if !constant_time_eq(token, echo) {
            return Err(OAuthStateError::Mismatch(Self::ECHO_PARAMETER));
        }

        Ok(StateItem::TokenSecret(TokenSecret {
            token: token.to_string(),
            secret,
        }))
    }
}

#[cfg(test)]
mod tests {
    use auth::AesCtrCrypter;
    use auth::SecureRandomIdGenerator;

    use super::*;

    #[tokio::test]
    async fn test_csrf_item_is_fresh() {
        let handler = CsrfStateItemHandler::new(Arc::new(SecureRandomIdGenerator::new(16)));

        let first = handler.item().await.unwrap().unwrap();
        let second = handler.item().await.unwrap().unwrap();

        assert!(handler.can_handle(&first));
        assert_ne!(first, second);
    }

    #[test]
    fn test_csrf_echo() {
        let handler = CsrfStateItemHandler::new(Arc::new(SecureRandomIdGenerator::new(16)));
        let value = Value::String("abc".to_string());

        let echoed = AuthRequest::default().with_query("state=abc");
        assert!(handler.unserialize(&value, &echoed).is_ok());

        let missing = AuthRequest::default();
        assert_eq!(
            handler.unserialize(&value, &missing),
            Err(OAuthStateError::MissingEcho("state"))
        );

        for forged in ["state=abd", "state=ab", "state=abcd"] {
            let request = AuthRequest::default().with_query(forged);
            assert_eq!(
                handler.unserialize(&value, &request),
                Err(OAuthStateError::Mismatch("state"))
            );
        }
    }

    #[test]
    fn test_token_secret_is_encrypted() {
        let handler = TokenSecretItemHandler::new(Arc::new(AesCtrCrypter::new("crypter-key")));
        let item = StateItem::TokenSecret(TokenSecret {
            token: "request-token".to_string(),
            secret: "very-secret".to_string(),
        });

        let value = handler.serialize(&item).unwrap();
        assert_eq!(value["token"], "request-token");
        assert!(!value.to_string().contains("very-secret"));

        let request = AuthRequest::default().with_query("oauth_token=request-token&oauth_verifier=v");
        assert_eq!(handler.unserialize(&value, &request).unwrap(), item);

        let other = AuthRequest::default().with_query("oauth_token=other-token");
        assert_eq!(
            handler.unserialize(&value, &other),
            Err(OAuthStateError::Mismatch("oauth_token"))
        );
    }

    #[test]
    fn test_user_state_shape() {
        let handler = UserStateItemHandler;

        assert!(handler
            .unserialize(&json!({ "redirect": "/home" }), &AuthRequest::default())
            .is_ok());
        assert!(matches!(
            handler.unserialize(&json!("not-an-object"), &AuthRequest::default()),
            Err(OAuthStateError::Malformed(_))
        ));
    }
}
