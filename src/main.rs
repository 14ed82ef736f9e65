//! OpenSASE Storefront - public catalog reads and wishlists

use std::sync::Arc;

use anyhow::Result;
use opensase_storefront::http::{router, AppState};
use opensase_storefront::repository::{postgres, PgCatalogStore};
use opensase_storefront::{AppConfig, CatalogService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = postgres::connect(&config.database_url, config.database_max_connections).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    tracing::info!(max_connections = config.database_max_connections, "database ready");

    let mut catalog = CatalogService::new(Arc::new(PgCatalogStore::new(db)));
    if let Some(url) = &config.nats_url {
        match async_nats::connect(url.as_str()).await {
            Ok(client) => catalog = catalog.with_events(client),
            Err(err) => tracing::warn!(error = %err, "NATS unavailable, domain events disabled"),
        }
    }

    let app = router(AppState { catalog });
    let addr = config.bind_address();
    tracing::info!("🚀 OpenSASE Storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
