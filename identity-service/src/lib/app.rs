use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use auth::util::DefaultFingerprintGenerator;
use auth::AesCtrCrypter;
use auth::AuthenticatorEncoder;
use auth::Base64AuthenticatorEncoder;
use auth::Clock;
use auth::CrypterAuthenticatorEncoder;
use auth::HmacSigner;
use auth::IdGenerator;
use auth::JwtKey;
use auth::PasswordHasherRegistry;
use auth::SecureRandomIdGenerator;
use chrono::Duration;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::config::JwtConfig;
use crate::domain::authenticator::bearer::BearerTokenAuthenticatorSettings;
use crate::domain::authenticator::cookie::CookieAuthenticatorSettings;
use crate::domain::authenticator::jwt::JwtAuthenticatorSettings;
use crate::domain::authenticator::models::BearerTokenAuthenticator;
use crate::domain::authenticator::models::CookieAuthenticator;
use crate::domain::authenticator::models::JwtAuthenticator;
use crate::domain::authenticator::ports::AuthenticatorRepository;
use crate::domain::authenticator::ports::ExpirySweeper;
use crate::domain::authenticator::registry::AuthenticatorComponents;
use crate::domain::authenticator::registry::StrategySettings;
use crate::domain::authenticator::session::SessionAuthenticatorSettings;
use crate::domain::authenticator::AnyAuthenticatorService;
use crate::domain::authorization::WithProvider;
use crate::domain::credentials::ports::AuthInfoRepository;
use crate::domain::credentials::CredentialsProvider;
use crate::domain::errors::ConfigurationError;
use crate::domain::events::EventPublisher;
use crate::domain::social::CsrfStateItemHandler;
use crate::domain::social::OAuth2StateFlow;
use crate::domain::social::SocialStateHandler;
use crate::domain::social::SocialStateSettings;
use crate::domain::social::UserStateItemHandler;
use crate::inbound::http::router::AppState;
use crate::outbound::cache::InMemoryCache;
use crate::outbound::repositories::CacheAuthenticatorRepository;
use crate::outbound::repositories::InMemoryAuthInfoRepository;
use crate::outbound::repositories::PostgresAuthInfoRepository;
use crate::outbound::repositories::PostgresAuthenticatorRepository;

/// Persistence backing the service.
pub struct Stores {
    pub auth_info: Arc<dyn AuthInfoRepository>,
    pub cookie_authenticators: Arc<dyn AuthenticatorRepository<CookieAuthenticator>>,
    pub jwt_authenticators: Arc<dyn AuthenticatorRepository<JwtAuthenticator>>,
    pub bearer_authenticators: Arc<dyn AuthenticatorRepository<BearerTokenAuthenticator>>,
    /// Stores whose expired authenticators are dropped periodically.
    pub sweepers: Vec<Arc<dyn ExpirySweeper>>,
}

impl Stores {
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::with_cache(Arc::new(InMemoryCache::new(clock.clone())), clock)
    }

    /// In-memory stores with every authenticator kind in one shared cache,
    /// keyed by strategy. Entries expire together with their authenticator.
    pub fn with_cache(cache: Arc<InMemoryCache>, clock: Arc<dyn Clock>) -> Self {
        Self {
            auth_info: Arc::new(InMemoryAuthInfoRepository::new()),
            cookie_authenticators: Arc::new(CacheAuthenticatorRepository::<CookieAuthenticator, _>::new(
                cache.clone(),
                clock.clone(),
                "cookie",
            )),
            jwt_authenticators: Arc::new(CacheAuthenticatorRepository::<JwtAuthenticator, _>::new(
                cache.clone(),
                clock.clone(),
                "jwt",
            )),
            bearer_authenticators: Arc::new(CacheAuthenticatorRepository::<BearerTokenAuthenticator, _>::new(
                cache.clone(),
                clock,
                "bearer",
            )),
            sweepers: vec![cache as Arc<dyn ExpirySweeper>],
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        let cookie = Arc::new(PostgresAuthenticatorRepository::<CookieAuthenticator>::new(
            pool.clone(),
            "cookie",
        ));
        let jwt = Arc::new(PostgresAuthenticatorRepository::<JwtAuthenticator>::new(
            pool.clone(),
            "jwt",
        ));
        let bearer = Arc::new(PostgresAuthenticatorRepository::<BearerTokenAuthenticator>::new(
            pool.clone(),
            "bearer",
        ));

        Self {
            auth_info: Arc::new(PostgresAuthInfoRepository::new(pool)),
            cookie_authenticators: cookie.clone(),
            jwt_authenticators: jwt.clone(),
            bearer_authenticators: bearer.clone(),
            sweepers: vec![
                cookie as Arc<dyn ExpirySweeper>,
                jwt as Arc<dyn ExpirySweeper>,
                bearer as Arc<dyn ExpirySweeper>,
            ],
        }
    }
}

/// Drop expired authenticators from every store.
///
/// # Returns
/// Number of authenticators removed. Failing stores are logged and skipped.
pub async fn sweep_expired(sweepers: &[Arc<dyn ExpirySweeper>]) -> u64 {
    let mut removed = 0;
    for sweeper in sweepers {
        match sweeper.sweep_expired().await {
            Ok(count) => removed += count,
            Err(e) => tracing::error!(error = %e, "Failed to sweep expired authenticators"),
        }
    }

    if removed > 0 {
        tracing::debug!(removed, "Expired authenticators swept");
    }
    removed
}

/// Run `sweep_expired` every `period` on a background task.
pub fn spawn_expiry_sweeper(sweepers: Vec<Arc<dyn ExpirySweeper>>, period: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            sweep_expired(&sweepers).await;
        }
    })
}

fn invalid(name: &str, message: impl Into<String>) -> ConfigurationError {
    ConfigurationError::Invalid {
        name: name.to_string(),
        message: message.into(),
    }
}

fn positive_seconds(name: &str, seconds: i64) -> Result<Duration, ConfigurationError> {
    if seconds <= 0 {
        return Err(invalid(name, "must be positive"));
    }
    Ok(Duration::seconds(seconds))
}

fn jwt_key(jwt: &JwtConfig) -> Result<JwtKey, ConfigurationError> {
    let read = |path: &str| fs::read(path).map_err(|e| ConfigurationError::Jwt(format!("{}: {}", path, e)));

    match (&jwt.secret, &jwt.private_key_path, &jwt.public_key_path) {
        (_, Some(private), Some(public)) => Ok(JwtKey::Pem {
            private: read(private)?,
            public: read(public)?,
        }),
        (Some(secret), _, _) if !secret.is_empty() => Ok(JwtKey::Secret(secret.as_bytes().to_vec())),
        _ => Err(ConfigurationError::Jwt(
            "a secret or a private/public key pair is required".to_string(),
        )),
    }
}

/// Assemble the application state from configuration.
///
/// # Arguments
/// * `config` - Loaded configuration
/// * `stores` - Repositories, in-memory or PostgreSQL
/// * `event_publisher` - Sink for authentication events
/// * `clock` - Time source for every expiry decision
///
/// # Errors
/// Any invalid setting is reported as a `ConfigurationError`; nothing is
/// checked lazily per request.
pub fn build_state(
    config: &Config,
    stores: Stores,
    event_publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
) -> Result<AppState, ConfigurationError> {
    if config.crypto.signer_key.is_empty() {
        return Err(invalid("crypto.signer_key", "must not be empty"));
    }
    if config.crypto.crypter_key.is_empty() {
        return Err(invalid("crypto.crypter_key", "must not be empty"));
    }

    let signer = match &config.crypto.signer_pepper {
        Some(pepper) => HmacSigner::new(config.crypto.signer_key.as_bytes()).with_pepper(pepper.as_str()),
        None => HmacSigner::new(config.crypto.signer_key.as_bytes()),
    };
    let signer = Arc::new(signer);
    let crypter = Arc::new(AesCtrCrypter::new(config.crypto.crypter_key.as_bytes()));
    let encoder: Arc<dyn AuthenticatorEncoder> = if config.crypto.encrypt_authenticators {
        Arc::new(CrypterAuthenticatorEncoder::new(crypter.clone()))
    } else {
        Arc::new(Base64AuthenticatorEncoder)
    };

    let settings = &config.authenticator;
    if settings.id_length_bytes < 16 {
        return Err(invalid("authenticator.id_length_bytes", "must be at least 16"));
    }
    let id_generator: Arc<dyn IdGenerator> = Arc::new(SecureRandomIdGenerator::new(settings.id_length_bytes));
    let expiry = positive_seconds("authenticator.expiry_seconds", settings.expiry_seconds)?;
    let idle_timeout = settings
        .idle_timeout_seconds
        .map(|seconds| positive_seconds("authenticator.idle_timeout_seconds", seconds))
        .transpose()?;

    let jwt_key = if settings.strategy == "jwt" {
        jwt_key(&settings.jwt)?
    } else {
        JwtKey::Secret(Vec::new())
    };

    let strategy_settings = StrategySettings {
        session: SessionAuthenticatorSettings {
            cookie: settings.session.settings("authenticator"),
            use_fingerprinting: settings.use_fingerprinting,
            idle_timeout,
            expiry,
        },
        cookie: CookieAuthenticatorSettings {
            cookie: settings.cookie.settings("id"),
            use_fingerprinting: settings.use_fingerprinting,
            idle_timeout,
            expiry,
        },
        jwt: JwtAuthenticatorSettings {
            field_name: settings.jwt.field_name.clone(),
            scheme: settings.jwt.scheme.clone(),
            request_parts: settings.jwt.request_parts.clone(),
            issuer: settings.jwt.issuer.clone(),
            idle_timeout,
            expiry,
        },
        jwt_algorithm: settings.jwt.algorithm.clone(),
        jwt_key,
        bearer: BearerTokenAuthenticatorSettings {
            field_name: settings.bearer.field_name.clone(),
            request_parts: settings.bearer.request_parts.clone(),
            idle_timeout,
            expiry,
        },
    };

    let components = AuthenticatorComponents {
        signer: signer.clone(),
        encoder,
        fingerprint_generator: Arc::new(DefaultFingerprintGenerator::new(settings.include_remote_address)),
        id_generator: id_generator.clone(),
        clock: clock.clone(),
        cookie_repository: settings.stateful.then(|| stores.cookie_authenticators.clone()),
        jwt_repository: settings.jwt.stateful.then(|| stores.jwt_authenticators.clone()),
        bearer_repository: Some(stores.bearer_authenticators.clone()),
    };
    let authenticator_service =
        AnyAuthenticatorService::from_strategy(&settings.strategy, strategy_settings, components)?;

    let registry = PasswordHasherRegistry::from_ids(&config.password.current, &config.password.deprecated)
        .map_err(|e| ConfigurationError::PasswordHasher(e.to_string()))?;
    let credentials_provider = CredentialsProvider::new(stores.auth_info, registry);

    let state_expiry = positive_seconds("social.state_expiry_seconds", config.social.state_expiry_seconds)?;
    let mut state_cookie = config.social.state_cookie.settings("OAuthState");
    state_cookie.max_age = state_cookie.max_age.or(Some(state_expiry.num_seconds()));

    let mut oauth2_flows = HashMap::new();
    for (provider_id, provider_settings) in &config.social.oauth2 {
        let state_handler = SocialStateHandler::new(
            SocialStateSettings {
                cookie: state_cookie.clone(),
                expiry: state_expiry,
            },
            signer.clone(),
            clock.clone(),
        )
        .with_handler(CsrfStateItemHandler::new(id_generator.clone()))
        .with_handler(UserStateItemHandler);

        let flow = OAuth2StateFlow::new(provider_id.as_str(), provider_settings.clone(), state_handler)?;
        tracing::info!(provider = %provider_id, "OAuth2 provider configured");
        oauth2_flows.insert(provider_id.clone(), flow);
    }

    Ok(AppState {
        credentials_provider: Arc::new(credentials_provider),
        authenticator_service: Arc::new(authenticator_service),
        oauth2_flows: Arc::new(oauth2_flows),
        authorization: Arc::new(WithProvider::new(config.authorization.admin_provider.as_str())),
        event_publisher,
        clock,
    })
}

#[cfg(test)]
mod tests {
    use config::Config as ConfigBuilder;
    use config::File;
    use config::FileFormat;

    use auth::util::FixedClock;
    use auth::SystemClock;
    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;
    use crate::outbound::events::BroadcastEventBus;

    fn config(toml: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(File::from_str(
                r#"
                [crypto]
                signer_key = "signer"
                crypter_key = "crypter"
                "#,
                FileFormat::Toml,
            ))
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    fn build(toml: &str) -> Result<AppState, ConfigurationError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        build_state(
            &config(toml),
            Stores::in_memory(clock.clone()),
            Arc::new(BroadcastEventBus::default()),
            clock,
        )
    }

    #[test]
    fn test_default_strategy() {
        let state = build("").unwrap();
        assert_eq!(state.authenticator_service.strategy(), "cookie");
    }

    #[test]
    fn test_unknown_strategy() {
        assert!(matches!(
            build("[authenticator]\nstrategy = \"ldap\""),
            Err(ConfigurationError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_jwt_requires_key() {
        assert!(matches!(
            build("[authenticator]\nstrategy = \"jwt\""),
            Err(ConfigurationError::Jwt(_))
        ));
        assert!(build("[authenticator]\nstrategy = \"jwt\"\n[authenticator.jwt]\nsecret = \"jwt-secret\"").is_ok());
    }

    #[test]
    fn test_unknown_hasher() {
        assert!(matches!(
            build("[password]\ncurrent = \"md5\""),
            Err(ConfigurationError::PasswordHasher(_))
        ));
    }

    #[test]
    fn test_invalid_expiry() {
        assert!(matches!(
            build("[authenticator]\nexpiry_seconds = 0"),
            Err(ConfigurationError::Invalid { .. })
        ));
    }

    #[test]
    fn test_oauth2_providers() {
        let state = build(
            r#"
            [social.oauth2.example]
            authorization_url = "https://provider.example.com/authorize"
            redirect_url = "https://app.example.com/callback"
            client_id = "client"
            "#,
        )
        .unwrap();
        assert!(state.oauth2_flows.contains_key("example"));

        assert!(matches!(
            build(
                r#"
                [social.oauth2.broken]
                authorization_url = "nope"
                redirect_url = "https://app.example.com/callback"
                client_id = "client"
                "#,
            ),
            Err(ConfigurationError::OAuth2Provider { .. })
        ));
    }

    fn cookie(id: &str, expires_at: chrono::DateTime<Utc>) -> CookieAuthenticator {
        CookieAuthenticator {
            id: id.to_string(),
            login_info: crate::domain::login::LoginInfo::new("credentials", "user@example.com"),
            last_used_at: expires_at - Duration::hours(1),
            expires_at,
            idle_timeout: None,
            cookie_max_age: None,
            fingerprint: None,
        }
    }

    #[tokio::test]
    async fn test_sweep_expired_across_strategies() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(now));
        let cache = Arc::new(InMemoryCache::new(clock.clone()));
        let stores = Stores::with_cache(cache.clone(), clock.clone());

        stores
            .cookie_authenticators
            .add(cookie("short", now + Duration::minutes(10)))
            .await
            .unwrap();
        stores
            .cookie_authenticators
            .add(cookie("long", now + Duration::hours(2)))
            .await
            .unwrap();
        assert_eq!(cache.len(), 2);

        assert_eq!(sweep_expired(&stores.sweepers).await, 0);

        clock.advance(Duration::minutes(30));
        assert_eq!(sweep_expired(&stores.sweepers).await, 1);
        assert_eq!(cache.len(), 1);
        assert!(stores.cookie_authenticators.find("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_spawned_sweeper_runs_on_interval() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(now));
        let cache = Arc::new(InMemoryCache::new(clock.clone()));
        let stores = Stores::with_cache(cache.clone(), clock.clone());
        stores
            .cookie_authenticators
            .add(cookie("short", now + Duration::minutes(10)))
            .await
            .unwrap();
        clock.advance(Duration::minutes(30));

        let handle = spawn_expiry_sweeper(stores.sweepers.clone(), std::time::Duration::from_millis(10));
        for _ in 0..50 {
            if cache.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        handle.abort();

        assert!(cache.is_empty());
    }
}
