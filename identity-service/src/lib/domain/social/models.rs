use serde_json::Map;
use serde_json::Value;

/// CSRF token echoed back by the provider in the `state` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfState {
    pub token: String,
}

/// Arbitrary application data restored after the provider redirects back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserState {
    pub data: Map<String, Value>,
}

/// OAuth1 request token and its secret, needed to exchange the verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSecret {
    pub token: String,
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateItem {
    Csrf(CsrfState),
    User(UserState),
    TokenSecret(TokenSecret),
}

/// Items carried in one state cookie.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocialState {
    items: Vec<StateItem>,
}

impl SocialState {
    pub fn new(items: Vec<StateItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[StateItem] {
        &self.items
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            StateItem::Csrf(csrf) => Some(csrf.token.as_str()),
            _ => None,
        })
    }

    pub fn user_state(&self) -> Option<&UserState> {
        self.items.iter().find_map(|item| match item {
            StateItem::User(user) => Some(user),
            _ => None,
        })
    }

    pub fn token_secret(&self) -> Option<&TokenSecret> {
        self.items.iter().find_map(|item| match item {
            StateItem::TokenSecret(secret) => Some(secret),
            _ => None,
        })
    }
}
