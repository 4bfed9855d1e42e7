mod clock;
mod config;
mod db;
mod error;
mod routes;
mod services;
mod state;
mod tls;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::services::erp::{ErpApi, HttpErpClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,floorboard=debug")))
        .init();

    let config = ServerConfig::from_env();
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;

    let erp: Option<Arc<dyn ErpApi>> = match config.erp.as_ref().map(HttpErpClient::new) {
        Some(Ok(client)) => {
            tracing::info!("ERP proxy enabled");
            Some(Arc::new(client))
        }
        Some(Err(e)) => {
            tracing::warn!(error = %e, "ERP client failed to initialize; proxy disabled");
            None
        }
        None => {
            tracing::info!("ERP_API_KEY not set; proxy disabled");
            None
        }
    };

    let http_port = config.http_port;
    let https_port = config.https_port;
    let certs_dir = config.certs_dir.clone();
    let state = state::AppState::new(pool, config, erp);
    state.pdfs.ensure_dir().await?;

    let _retention = services::retention::spawn_retention_sweeper(state.clone());

    let app = routes::app(state);

    if let Some(tls_config) = tls::load_or_generate(&certs_dir).await {
        let addr = SocketAddr::from(([0, 0, 0, 0], https_port));
        let app = app.clone();
        tokio::spawn(async move {
            tracing::info!(%https_port, "floorboard listening (https)");
            if let Err(e) = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await {
                tracing::error!(error = %e, "https listener failed");
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], http_port))).await?;
    tracing::info!(%http_port, "floorboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}
