use std::net::SocketAddr;

use konak_api::{
    app,
    state::{AppState, AuthConfig, ListingConfig},
};
use konak_store::DbClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "konak_api=debug,konak_ledger=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = konak_store::app_config::Config::load()?;
    tracing::info!("Starting Konak API on port {}", config.server.port);

    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
        expiration: config.auth.jwt_expiration_seconds,
    };
    let listing = ListingConfig {
        page_sizes: config.listing.page_sizes.clone(),
        default_page_size: config.listing.default_page_size,
    };

    let app_state = match DbClient::from_config(&config.database).await? {
        Some(db) => {
            db.migrate().await?;
            tracing::info!("Using Postgres storage");
            AppState::postgres(&db, auth, listing)
        }
        None => {
            tracing::warn!("No database url configured, records live in memory only");
            AppState::in_memory(auth, listing)
        }
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
