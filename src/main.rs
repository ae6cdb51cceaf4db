use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studyboard::api::router;
use studyboard::config::ServerConfig;
use studyboard::db;
use studyboard::generator::NoopTaskGenerator;
use studyboard::remote::LocalStore;
use studyboard::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "studyboard=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    let pool = db::connect(&config.database_url).await?;

    let store = Arc::new(LocalStore::new(pool, Arc::new(NoopTaskGenerator)));
    let app = router(AppState { store });

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
