use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use auth::Clock;
use auth::SystemClock;
use identity_service::app::build_state;
use identity_service::app::spawn_expiry_sweeper;
use identity_service::app::Stores;
use identity_service::config::Config;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::events::BroadcastEventBus;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        strategy = %config.authenticator.strategy,
        database = config.database.is_some(),
        oauth2_providers = config.social.oauth2.len(),
        "Configuration loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let stores = match &config.database {
        Some(database) => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(database.max_connections)
                .connect(&database.url)
                .await?;
            tracing::info!(
                max_connections = database.max_connections,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            Stores::postgres(pg_pool)
        }
        None => {
            tracing::warn!("No database configured, using in-memory stores");
            Stores::in_memory(clock.clone())
        }
    };

    let sweep_interval = Duration::from_secs(config.authenticator.sweep_interval_seconds.max(1));
    spawn_expiry_sweeper(stores.sweepers.clone(), sweep_interval);
    tracing::info!(
        interval_seconds = sweep_interval.as_secs(),
        "Expired authenticator sweeper started"
    );

    let event_bus = Arc::new(BroadcastEventBus::default());
    let mut events = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::info!(
                    event_id = %event.event_id,
                    event_type = event.event_type(),
                    login_info = ?event.login_info.as_ref().map(ToString::to_string),
                    occurred_at = %event.occurred_at,
                    "Authentication event"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Authentication event subscriber lagged")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let state = build_state(&config, stores, event_bus, clock)?;
    let http_application = create_router(state);

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    axum::serve(
        http_listener,
        http_application.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    tracing::info!("Server exited successfully");

    Ok(())
}
