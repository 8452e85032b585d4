use std::sync::Arc;

use auth::Clock;
use auth::Signer;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use serde::Deserialize;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;

use super::errors::OAuthStateError;
use super::handlers::StateItemHandler;
use super::models::SocialState;
use super::models::StateItem;
use crate::domain::http::AuthRequest;
use crate::domain::http::AuthResponse;
use crate::domain::http::CookieSettings;

#[derive(Debug, Clone)]
pub struct SocialStateSettings {
    pub cookie: CookieSettings,
    pub expiry: Duration,
}

impl Default for SocialStateSettings {
    fn default() -> Self {
        let expiry = Duration::minutes(5);
        Self {
            cookie: CookieSettings::named("OAuthState").with_max_age(Some(expiry.num_seconds())),
            expiry,
        }
    }
}

#[derive(Deserialize)]
struct StatePayload {
    expires_at: i64,
    items: Map<String, Value>,
}

/// Builds, publishes and validates the state cookie of a social login.
///
/// The cookie holds `{"expires_at": .., "items": {key: value}}` as base64url,
/// signed with the signer. On the callback every registered handler restores
/// and checks its own item. Any deviation fails the whole state.
pub struct SocialStateHandler {
    settings: SocialStateSettings,
    handlers: Vec<Arc<dyn StateItemHandler>>,
    signer: Arc<dyn Signer>,
    clock: Arc<dyn Clock>,
}

impl SocialStateHandler {
    pub fn new(settings: SocialStateSettings, signer: Arc<dyn Signer>, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            handlers: Vec::new(),
            signer,
            clock,
        }
    }

    pub fn with_handler(mut self, handler: impl StateItemHandler) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn settings(&self) -> &SocialStateSettings {
        &self.settings
    }

    fn handler_for(&self, item: &StateItem) -> Result<&Arc<dyn StateItemHandler>, OAuthStateError> {
        self.handlers
            .iter()
            .find(|handler| handler.can_handle(item))
            .ok_or_else(|| OAuthStateError::UnknownItem(format!("{:?}", item)))
    }

    /// New state with a fresh item from every generating handler plus `extra`.
    ///
    /// # Errors
    /// * `UnknownItem` - An extra item has no registered handler
    /// * `Generation` - A handler failed to generate its item
    pub async fn state(&self, extra: Vec<StateItem>) -> Result<SocialState, OAuthStateError> {
        let mut items = Vec::with_capacity(self.handlers.len() + extra.len());
        for handler in &self.handlers {
            if let Some(item) = handler.item().await? {
                items.push(item);
            }
        }
        for item in extra {
            self.handler_for(&item)?;
            items.push(item);
        }

        Ok(SocialState::new(items))
    }

    /// Signed cookie value for a state.
    pub fn serialize(&self, state: &SocialState) -> Result<String, OAuthStateError> {
        let mut items = Map::new();
        for item in state.items() {
            let handler = self.handler_for(item)?;
            items.insert(handler.key().to_string(), handler.serialize(item)?);
        }

        let payload = json!({
            "expires_at": (self.clock.now() + self.settings.expiry).timestamp(),
            "items": items,
        });
        let encoded = URL_SAFE_NO_PAD.encode(payload.to_string());

        Ok(self.signer.sign(&encoded)?)
    }

    /// Set the state cookie on a response.
    pub fn publish(&self, state: &SocialState, response: AuthResponse) -> Result<AuthResponse, OAuthStateError> {
        let value = self.serialize(state)?;

        response
            .with_cookie(&self.settings.cookie.cookie(value))
            .map_err(|e| OAuthStateError::Malformed(e.to_string()))
    }

    /// Restore and validate the state carried by a callback request.
    ///
    /// # Errors
    /// * `MissingState` - No state cookie
    /// * `Crypto` - Signature does not verify
    /// * `Malformed` - Payload cannot be decoded
    /// * `Expired` - State is older than the configured expiry
    /// * `UnknownItem` - Payload holds an item no handler owns
    /// * `MissingItem` - A required item is absent
    /// * `MissingEcho` / `Mismatch` - A handler rejected the callback
    pub fn unserialize(&self, request: &AuthRequest) -> Result<SocialState, OAuthStateError> {
        let value = request
            .cookie(&self.settings.cookie.name)
            .ok_or(OAuthStateError::MissingState)?;
        let encoded = self.signer.extract(&value)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| OAuthStateError::Malformed(e.to_string()))?;
        let payload: StatePayload =
            serde_json::from_slice(&bytes).map_err(|e| OAuthStateError::Malformed(e.to_string()))?;

        if self.clock.now().timestamp() >= payload.expires_at {
            return Err(OAuthStateError::Expired);
        }

        if let Some(unknown) = payload
            .items
            .keys()
            .find(|key| !self.handlers.iter().any(|handler| handler.key() == key.as_str()))
        {
            return Err(OAuthStateError::UnknownItem(unknown.clone()));
        }

        let mut items = Vec::with_capacity(payload.items.len());
        for handler in &self.handlers {
            match payload.items.get(handler.key()) {
                Some(value) => items.push(handler.unserialize(value, request)?),
                None if handler.is_required() => {
                    return Err(OAuthStateError::MissingItem(handler.key().to_string()))
                }
                None => {}
            }
        }

        Ok(SocialState::new(items))
    }

    /// Remove the state cookie once the callback has been handled.
    pub fn discard(&self, response: AuthResponse) -> Result<AuthResponse, OAuthStateError> {
        response
            .discarding_cookie(&self.settings.cookie.discarding())
            .map_err(|e| OAuthStateError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use auth::util::FixedClock;
    use auth::CryptoError;
    use auth::HmacSigner;
    use auth::SecureRandomIdGenerator;
    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;
    use crate::domain::social::handlers::CsrfStateItemHandler;
    use crate::domain::social::handlers::UserStateItemHandler;
    use crate::domain::social::models::UserState;

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn handler(clock: Arc<FixedClock>) -> SocialStateHandler {
        SocialStateHandler::new(
            SocialStateSettings::default(),
            Arc::new(HmacSigner::new("signer-key")),
            clock,
        )
        .with_handler(CsrfStateItemHandler::new(Arc::new(SecureRandomIdGenerator::new(16))))
        .with_handler(UserStateItemHandler)
    }

    fn user_state() -> StateItem {
        let mut data = Map::new();
        data.insert("redirect".to_string(), json!("/dashboard"));
        StateItem::User(UserState { data })
    }

    /// Callback request carrying the published cookie and the given query.
    fn callback(response: &AuthResponse, query: &str) -> AuthRequest {
        let value = response.cookie_value("OAuthState").unwrap();
        AuthRequest::default()
            .with_query(query)
            .with_cookie("OAuthState", &value)
            .unwrap()
    }

    fn signed(payload: Value) -> String {
        HmacSigner::new("signer-key")
            .sign(&URL_SAFE_NO_PAD.encode(payload.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_roundtrip() {
        let handler = handler(clock());
        let state = handler.state(vec![user_state()]).await.unwrap();
        let token = state.csrf_token().unwrap().to_string();

        let response = handler.publish(&state, AuthResponse::new()).unwrap();
        let header = response.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(header.contains("Max-Age=300"));
        assert!(header.contains("SameSite=Lax"));

        let restored = handler
            .unserialize(&callback(&response, &format!("code=abc&state={}", token)))
            .unwrap();
        assert_eq!(restored, state);
        assert_eq!(
            restored.user_state().unwrap().data["redirect"],
            json!("/dashboard")
        );
    }

    #[tokio::test]
    async fn test_missing_cookie() {
        let handler = handler(clock());
        assert_eq!(
            handler.unserialize(&AuthRequest::default().with_query("state=x")),
            Err(OAuthStateError::MissingState)
        );
    }

    #[tokio::test]
    async fn test_missing_and_mismatched_echo() {
        let handler = handler(clock());
        let state = handler.state(Vec::new()).await.unwrap();
        let response = handler.publish(&state, AuthResponse::new()).unwrap();

        assert_eq!(
            handler.unserialize(&callback(&response, "code=abc")),
            Err(OAuthStateError::MissingEcho("state"))
        );
        assert_eq!(
            handler.unserialize(&callback(&response, "code=abc&state=forged")),
            Err(OAuthStateError::Mismatch("state"))
        );
    }

    #[tokio::test]
    async fn test_expired() {
        let clock = clock();
        let handler = handler(clock.clone());
        let state = handler.state(Vec::new()).await.unwrap();
        let token = state.csrf_token().unwrap().to_string();
        let response = handler.publish(&state, AuthResponse::new()).unwrap();

        clock.advance(Duration::minutes(5));
        assert_eq!(
            handler.unserialize(&callback(&response, &format!("state={}", token))),
            Err(OAuthStateError::Expired)
        );
    }

    #[tokio::test]
    async fn test_tampered_signature() {
        let handler = handler(clock());
        let state = handler.state(Vec::new()).await.unwrap();
        let token = state.csrf_token().unwrap().to_string();
        let response = handler.publish(&state, AuthResponse::new()).unwrap();

        let value = response.cookie_value("OAuthState").unwrap();
        let forged = format!("{}A", value);
        let request = AuthRequest::default()
            .with_query(&format!("state={}", token))
            .with_cookie("OAuthState", &forged)
            .unwrap();

        assert!(matches!(
            handler.unserialize(&request),
            Err(OAuthStateError::Crypto(CryptoError::BadSignature))
        ));
    }

    #[tokio::test]
    async fn test_unknown_item() {
        let handler = handler(clock());
        let value = signed(json!({
            "expires_at": Utc::now().timestamp() + 3600,
            "items": { "csrf-state": "abc", "admin": true },
        }));
        let request = AuthRequest::default()
            .with_query("state=abc")
            .with_cookie("OAuthState", &value)
            .unwrap();

        assert_eq!(
            handler.unserialize(&request),
            Err(OAuthStateError::UnknownItem("admin".to_string()))
        );
    }

    #[tokio::test]
    async fn test_missing_required_item() {
        let handler = handler(clock());
        let value = signed(json!({
            "expires_at": Utc.with_ymd_and_hms(2024, 1, 1, 13, 0, 0).unwrap().timestamp(),
            "items": { "user-state": {} },
        }));
        let request = AuthRequest::default()
            .with_query("state=abc")
            .with_cookie("OAuthState", &value)
            .unwrap();

        assert_eq!(
            handler.unserialize(&request),
            Err(OAuthStateError::MissingItem("csrf-state".to_string()))
        );
    }

    #[tokio::test]
    async fn test_extra_item_without_handler() {
        let handler = SocialStateHandler::new(
            SocialStateSettings::default(),
            Arc::new(HmacSigner::new("signer-key")),
            clock(),
        );

        assert!(matches!(
            handler.state(vec![user_state()]).await,
            Err(OAuthStateError::UnknownItem(_))
        ));
    }

    #[tokio::test]
    async fn test_discard() {
        let handler = handler(clock());
        let response = handler.discard(AuthResponse::new()).unwrap();
        assert_eq!(response.cookie_value("OAuthState"), Some(String::new()));
    }
}
