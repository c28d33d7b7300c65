mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};

use notiflow_core::NotiflowConfig;
use notiflow_core::logging::{LogFormat, init_tracing};

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(tracing::Level::INFO, LogFormat::Full)?;

    let state = AppState::new(NotiflowConfig::load()?)?;
    let port = state.config().server.port;
    let calendar_path = state.config().calendar_path();

    // The browser extension calls in from its own origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router().with_state(state).layer(cors);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!(%addr, calendar = %calendar_path.display(), "notiflow-server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
