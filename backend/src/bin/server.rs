//! Assessment access HTTP server.
//!
//! Initializes the repository and the polling gateway, sets up the HTTP
//! router and starts serving requests.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin access-server
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `RUST_LOG`: Log filter (default: info)
//! - `ACCESS_*`: Engine settings, see `EngineConfig::load`

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use assessment_access::clock::SystemClock;
use assessment_access::config::EngineConfig;
use assessment_access::db;
use assessment_access::http::{create_router, AppState};
use assessment_access::services::PollingGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting assessment access server");

    let config = EngineConfig::load()?;
    info!(
        "Engine config: window={}min, grace={}min, reason={}..={} chars",
        config.fixed_duration.num_minutes(),
        config.grace_duration.num_minutes(),
        config.min_reason_len,
        config.max_reason_len
    );

    let repository = db::create_repository();
    let gateway = PollingGateway::new(repository, config, Arc::new(SystemClock));
    let app = create_router(AppState::new(gateway));

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
