use std::net::SocketAddr;
use std::sync::Arc;

use auth::util::FixedClock;
use chrono::Utc;
use config::Config as ConfigBuilder;
use config::File;
use config::FileFormat;
use identity_service::app::build_state;
use identity_service::app::Stores;
use identity_service::config::Config;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::cache::InMemoryCache;
use identity_service::outbound::events::BroadcastEventBus;
use serde_json::json;
use serde_json::Value;

const BASE_CONFIG: &str = r#"
[crypto]
signer_key = "test-signer-key"
crypter_key = "test-crypter-key"

[authenticator.session]
secure = false

[authenticator.cookie]
secure = false

[authenticator.jwt]
secret = "test-secret-key-for-jwt-signing-at-least-32-bytes"

[social.state_cookie]
secure = false

[social.oauth2.example]
authorization_url = "https://provider.example.com/authorize"
redirect_url = "http://127.0.0.1/api/auth/oauth2/example/callback"
client_id = "test-client"
scope = "profile email"
"#;

/// Test application that spawns a real server backed by in-memory stores
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub event_bus: Arc<BroadcastEventBus>,
    /// Server clock, starts at the wall-clock time of the spawn
    pub clock: Arc<FixedClock>,
    /// Cache holding every stored authenticator
    pub cache: Arc<InMemoryCache>,
}

impl TestApp {
    /// Spawn the application with the default cookie strategy
    pub async fn spawn() -> Self {
        Self::spawn_with("").await
    }

    /// Spawn the application with extra TOML layered over the test config
    pub async fn spawn_with(overrides: &str) -> Self {
        let config: Config = ConfigBuilder::builder()
            .add_source(File::from_str(BASE_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(overrides, FileFormat::Toml))
            .build()
            .expect("Failed to build test config")
            .try_deserialize()
            .expect("Failed to deserialize test config");

        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let event_bus = Arc::new(BroadcastEventBus::default());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let cache = Arc::new(InMemoryCache::new(clock.clone()));
        let stores = Stores::with_cache(cache.clone(), clock.clone());
        let state = build_state(&config, stores, event_bus.clone(), clock.clone())
            .expect("Failed to build application state");
        let router = create_router(state);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server error");
        });

        Self {
            address,
            port,
            api_client: reqwest::Client::builder()
                .cookie_store(true)
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("Failed to create reqwest client"),
            event_bus,
            clock,
            cache,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(&format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(&format!("{}{}", self.address, path))
    }

    /// Register credentials and return the response
    pub async fn sign_up(&self, identifier: &str, password: &str) -> reqwest::Response {
        self.post("/api/auth/sign-up")
            .json(&json!({ "identifier": identifier, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Sign in and return the response
    pub async fn sign_in(&self, identifier: &str, password: &str) -> reqwest::Response {
        self.post("/api/auth/sign-in")
            .json(&json!({ "identifier": identifier, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register and sign in, returning the sign-in response body
    pub async fn signed_in(&self, identifier: &str) -> Value {
        self.sign_up(identifier, "pass_word!").await;
        self.sign_in(identifier, "pass_word!")
            .await
            .json()
            .await
            .expect("Failed to parse response")
    }
}
