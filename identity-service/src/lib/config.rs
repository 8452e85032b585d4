use std::collections::HashMap;
use std::env;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::domain::http::CookieSettings;
use crate::domain::http::RequestPart;
use crate::domain::http::SameSite;
use crate::domain::social::OAuth2Settings;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// In-memory stores are used when no database is configured.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    pub crypto: CryptoConfig,
    #[serde(default)]
    pub authenticator: AuthenticatorConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    #[serde(default)]
    pub social: SocialConfig,
    #[serde(default)]
    pub authorization: AuthorizationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { http_port: 8080 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct CryptoConfig {
    pub signer_key: String,
    #[serde(default)]
    pub signer_pepper: Option<String>,
    pub crypter_key: String,
    /// Encrypt client-side authenticators instead of only base64 encoding them.
    #[serde(default = "default_true")]
    pub encrypt_authenticators: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthenticatorConfig {
    /// One of `session`, `cookie`, `jwt`, `bearer` or `dummy`.
    pub strategy: String,
    /// Keep cookie authenticators in a repository instead of in the cookie.
    pub stateful: bool,
    pub use_fingerprinting: bool,
    pub include_remote_address: bool,
    pub id_length_bytes: usize,
    pub expiry_seconds: i64,
    pub idle_timeout_seconds: Option<i64>,
    /// Period of the background pass that drops expired authenticators.
    pub sweep_interval_seconds: u64,
    pub session: CookieConfig,
    pub cookie: CookieConfig,
    pub jwt: JwtConfig,
    pub bearer: BearerConfig,
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            strategy: "cookie".to_string(),
            stateful: true,
            use_fingerprinting: true,
            include_remote_address: false,
            id_length_bytes: 32,
            expiry_seconds: 12 * 60 * 60,
            idle_timeout_seconds: None,
            sweep_interval_seconds: 300,
            session: CookieConfig::default(),
            cookie: CookieConfig::default(),
            jwt: JwtConfig::default(),
            bearer: BearerConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CookieConfig {
    /// Falls back to the strategy's own cookie name.
    pub name: Option<String>,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
    pub max_age_seconds: Option<i64>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: None,
            path: "/".to_string(),
            domain: None,
            secure: true,
            http_only: true,
            same_site: Some(SameSite::Lax),
            max_age_seconds: None,
        }
    }
}

impl CookieConfig {
    pub fn settings(&self, default_name: &str) -> CookieSettings {
        CookieSettings {
            name: self.name.clone().unwrap_or_else(|| default_name.to_string()),
            path: self.path.clone(),
            domain: self.domain.clone(),
            secure: self.secure,
            http_only: self.http_only,
            same_site: self.same_site,
            max_age: self.max_age_seconds,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct JwtConfig {
    pub field_name: String,
    pub scheme: Option<String>,
    pub request_parts: Vec<RequestPart>,
    pub issuer: String,
    pub algorithm: String,
    /// Shared secret for the HMAC algorithms.
    pub secret: Option<String>,
    /// PEM files for the asymmetric algorithms.
    pub private_key_path: Option<String>,
    pub public_key_path: Option<String>,
    /// Keep issued tokens in a repository so they can be revoked.
    pub stateful: bool,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            field_name: "Authorization".to_string(),
            scheme: Some("Bearer".to_string()),
            request_parts: vec![RequestPart::Headers],
            issuer: "identity-service".to_string(),
            algorithm: "HS256".to_string(),
            secret: None,
            private_key_path: None,
            public_key_path: None,
            stateful: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BearerConfig {
    pub field_name: String,
    pub request_parts: Vec<RequestPart>,
}

impl Default for BearerConfig {
    fn default() -> Self {
        Self {
            field_name: "X-Auth-Token".to_string(),
            request_parts: vec![RequestPart::Headers],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PasswordConfig {
    pub current: String,
    /// Hashers still accepted at sign-in. Matching passwords are re-hashed.
    pub deprecated: Vec<String>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            current: "argon2".to_string(),
            deprecated: vec!["pbkdf2-sha256".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SocialConfig {
    pub state_expiry_seconds: i64,
    pub state_cookie: CookieConfig,
    pub oauth2: HashMap<String, OAuth2Settings>,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            state_expiry_seconds: 5 * 60,
            state_cookie: CookieConfig::default(),
            oauth2: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Provider whose identities may access the admin routes.
    pub admin_provider: String,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            admin_provider: "credentials".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (CRYPTO__SIGNER_KEY, AUTHENTICATOR__STRATEGY, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // DATABASE__URL=postgres://... overrides database.url
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        configuration.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(toml: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(
            r#"
            [crypto]
            signer_key = "signer"
            crypter_key = "crypter"
            "#,
        );

        assert_eq!(config.server.http_port, 8080);
        assert!(config.database.is_none());
        assert!(config.crypto.encrypt_authenticators);
        assert_eq!(config.authenticator.strategy, "cookie");
        assert_eq!(config.authenticator.jwt.request_parts, vec![RequestPart::Headers]);
        assert_eq!(config.password.deprecated, vec!["pbkdf2-sha256".to_string()]);
        assert_eq!(config.social.state_expiry_seconds, 300);
    }

    #[test]
    fn test_sections() {
        let config = parse(
            r#"
            [crypto]
            signer_key = "signer"
            crypter_key = "crypter"

            [authenticator]
            strategy = "jwt"
            idle_timeout_seconds = 600
            sweep_interval_seconds = 60

            [authenticator.cookie]
            name = "sid"
            same_site = "strict"

            [authenticator.jwt]
            request_parts = ["headers", "query_string"]
            secret = "jwt-secret"

            [social.oauth2.example]
            authorization_url = "https://provider.example.com/authorize"
            redirect_url = "https://app.example.com/callback"
            client_id = "client"
            "#,
        );

        assert_eq!(config.authenticator.idle_timeout_seconds, Some(600));
        assert_eq!(config.authenticator.sweep_interval_seconds, 60);
        let cookie = config.authenticator.cookie.settings("id");
        assert_eq!(cookie.name, "sid");
        assert_eq!(cookie.same_site, Some(SameSite::Strict));
        assert_eq!(config.authenticator.session.settings("authenticator").name, "authenticator");
        assert_eq!(
            config.authenticator.jwt.request_parts,
            vec![RequestPart::Headers, RequestPart::QueryString]
        );
        assert_eq!(config.social.oauth2["example"].client_id, "client");
    }
}
