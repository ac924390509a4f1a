mod routes;
mod state;

use std::env;

use dotenv::dotenv;
use m2m::config::{load_config, Config};
use m2m::logging::init_tracing;
use tracing::info;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let config = match env::var("M2M_CONFIG") {
        Ok(path) => load_config(&path)?,
        Err(_) => Config::default(),
    };

    init_tracing(&config.logging)?;
    info!("Starting m2m-server v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState::from_config(&config)?;
    let app = routes::router(state);

    let addr = format!("{}:{}", config.server.addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening at {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
