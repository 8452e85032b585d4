use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use url::Url;

use super::errors::OAuthStateError;
use super::models::SocialState;
use super::models::StateItem;
use super::models::TokenSecret;
use super::models::UserState;
use super::service::SocialStateHandler;
use crate::domain::errors::ConfigurationError;
use crate::domain::http::AuthRequest;
use crate::domain::http::AuthResponse;

/// Settings of one OAuth2 provider.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuth2Settings {
    pub authorization_url: String,
    pub redirect_url: String,
    pub client_id: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub authorization_params: BTreeMap<String, String>,
}

/// Validated OAuth2 callback.
#[derive(Debug, Clone)]
pub struct OAuth2Callback {
    pub code: String,
    pub state: SocialState,
}

/// Validated OAuth1 callback with the token secret restored from the state.
#[derive(Debug, Clone)]
pub struct OAuth1Callback {
    pub token: String,
    pub verifier: String,
    pub secret: String,
    pub state: SocialState,
}

fn user_item(user_state: Option<Map<String, Value>>) -> Vec<StateItem> {
    user_state
        .map(|data| StateItem::User(UserState { data }))
        .into_iter()
        .collect()
}

/// Redirect and callback half of the OAuth2 authorization code flow.
///
/// The access token exchange with the provider is left to the caller.
pub struct OAuth2StateFlow {
    provider_id: String,
    settings: OAuth2Settings,
    authorization_url: Url,
    state_handler: SocialStateHandler,
}

impl OAuth2StateFlow {
    /// Create a flow for one provider.
    ///
    /// # Errors
    /// * `OAuth2Provider` - Authorization or redirect URL does not parse
    pub fn new(
        provider_id: impl Into<String>,
        settings: OAuth2Settings,
        state_handler: SocialStateHandler,
    ) -> Result<Self, ConfigurationError> {
        let provider_id = provider_id.into();
        let invalid = |message: String| ConfigurationError::OAuth2Provider {
            provider: provider_id.clone(),
            message,
        };

        let authorization_url = Url::parse(&settings.authorization_url)
            .map_err(|e| invalid(format!("authorization_url: {}", e)))?;
        Url::parse(&settings.redirect_url).map_err(|e| invalid(format!("redirect_url: {}", e)))?;

        Ok(Self {
            provider_id,
            settings,
            authorization_url,
            state_handler,
        })
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// URL the browser is sent to, plus the response carrying the state cookie.
    pub async fn authorization_redirect(
        &self,
        user_state: Option<Map<String, Value>>,
    ) -> Result<(Url, AuthResponse), OAuthStateError> {
        let state = self.state_handler.state(user_item(user_state)).await?;
        let token = state
            .csrf_token()
            .ok_or_else(|| OAuthStateError::MissingItem("csrf-state".to_string()))?;

        let mut url = self.authorization_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.settings.client_id)
                .append_pair("redirect_uri", &self.settings.redirect_url)
                .append_pair("response_type", "code");
            if let Some(scope) = &self.settings.scope {
                query.append_pair("scope", scope);
            }
            for (name, value) in &self.settings.authorization_params {
                query.append_pair(name, value);
            }
            query.append_pair("state", token);
        }

        let response = self.state_handler.publish(&state, AuthResponse::new())?;
        tracing::debug!(provider = %self.provider_id, "OAuth2 authorization redirect prepared");

        Ok((url, response))
    }

    /// Validate the provider callback.
    ///
    /// # Errors
    /// * `AccessDenied` - User declined the authorization
    /// * `ProviderError` - Provider reported any other error
    /// * `MissingCode` - No authorization code in the callback
    /// * Any state validation error
    pub fn callback(&self, request: &AuthRequest) -> Result<OAuth2Callback, OAuthStateError> {
        if let Some(error) = request.query_param("error") {
            return Err(match error {
                "access_denied" => OAuthStateError::AccessDenied(self.provider_id.clone()),
                other => OAuthStateError::ProviderError {
                    provider: self.provider_id.clone(),
                    error: other.to_string(),
                },
            });
        }

        let code = request
            .query_param("code")
            .filter(|code| !code.is_empty())
            .ok_or_else(|| OAuthStateError::MissingCode(self.provider_id.clone()))?
            .to_string();
        let state = self.state_handler.unserialize(request)?;

        Ok(OAuth2Callback { code, state })
    }

    /// Clear the state cookie after the callback.
    pub fn discard(&self, response: AuthResponse) -> Result<AuthResponse, OAuthStateError> {
        self.state_handler.discard(response)
    }
}

/// Token secret half of the OAuth1 flow.
///
/// The request token itself is obtained from the provider by the caller.
pub struct OAuth1StateFlow {
    provider_id: String,
    state_handler: SocialStateHandler,
}

impl OAuth1StateFlow {
    pub fn new(provider_id: impl Into<String>, state_handler: SocialStateHandler) -> Self {
        Self {
            provider_id: provider_id.into(),
            state_handler,
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Publish the request token secret before redirecting to the provider.
    pub async fn begin(
        &self,
        secret: TokenSecret,
        user_state: Option<Map<String, Value>>,
        response: AuthResponse,
    ) -> Result<AuthResponse, OAuthStateError> {
        let mut extra = vec![StateItem::TokenSecret(secret)];
        extra.extend(user_item(user_state));

        let state = self.state_handler.state(extra).await?;
        self.state_handler.publish(&state, response)
    }

    /// Validate the provider callback.
    ///
    /// # Errors
    /// * `AccessDenied` - User declined the authorization
    /// * `MissingVerifier` - No `oauth_verifier` in the callback
    /// * Any state validation error
    pub fn callback(&self, request: &AuthRequest) -> Result<OAuth1Callback, OAuthStateError> {
        if request.query_param("denied").is_some() {
            return Err(OAuthStateError::AccessDenied(self.provider_id.clone()));
        }

        let verifier = request
            .query_param("oauth_verifier")
            .filter(|verifier| !verifier.is_empty())
            .ok_or_else(|| OAuthStateError::MissingVerifier(self.provider_id.clone()))?
            .to_string();
        let state = self.state_handler.unserialize(request)?;
        let secret = state
            .token_secret()
            .cloned()
            .ok_or_else(|| OAuthStateError::MissingItem("oauth1-token-secret".to_string()))?;

        Ok(OAuth1Callback {
            token: secret.token,
            verifier,
            secret: secret.secret,
            state,
        })
    }

    pub fn discard(&self, response: AuthResponse) -> Result<AuthResponse, OAuthStateError> {
        self.state_handler.discard(response)
    }
}
