use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hn_edge::api::ApiService;
use hn_edge::config;
use hn_edge::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hn_edge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api = ApiService::new();
    api.cache().start_janitor(config::JANITOR_INTERVAL);

    let app = server::router(AppState::new(api));

    let addr = format!("0.0.0.0:{}", config::port());
    tracing::info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
