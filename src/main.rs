use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use roomrelay::{
    auth::{BcryptHasher, FirebaseIdentity},
    config::Config,
    db::SqliteStore,
    hub::ConnectionRegistry,
    media::CloudMediaStore,
    rooms::{self, Collaborators},
    AppState, Relay,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = Config::from_env()?;

    let connect_options = config
        .database_url
        .parse::<SqliteConnectOptions>()
        .context("parsing DATABASE_URL")?
        .create_if_missing(true);
    let db_pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect_with(connect_options)
        .await
        .context("opening database")?;

    let store = SqliteStore::new(db_pool.clone());
    store.migrate().await?;
    let store = Arc::new(store);

    let http = reqwest::Client::new();
    let relay = Relay::new(
        Collaborators {
            rooms: store.clone(),
            profiles: store,
            media: Arc::new(CloudMediaStore::new(http.clone(), config.media.clone())),
            identity: Arc::new(FirebaseIdentity::new(http, &config.identity)),
            hasher: Arc::new(BcryptHasher::new(config.bcrypt_cost)),
        },
        Arc::new(ConnectionRegistry::new(config.outbound_queue)),
    );

    let app = Router::new()
        .merge(rooms::router())
        .with_state(AppState { db_pool, relay })
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!("relay listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
