/// HTTP server: spawns axum on a background tokio task.
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::api_router;
use crate::error::RelayError;
use crate::state::AppState;
use crate::watch_ws::watch_router;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api_router()
        .merge(watch_router())
        .layer(cors)
        .with_state(state)
}

/// Bind and start serving. Returns the bound port (useful when configured with port 0).
pub async fn spawn_server(state: AppState) -> Result<u16, RelayError> {
    let addr = format!("{}:{}", state.bind_address, state.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| RelayError::Bind {
            addr: addr.clone(),
            source,
        })?;
    let actual_port = listener.local_addr()?.port();

    if let Ok(mut live) = state.live_port.lock() {
        *live = actual_port;
    }

    log::info!(
        "[retro.relay.server] Listening on http://{}:{}",
        state.bind_address,
        actual_port
    );

    let app = build_router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            log::error!("[retro.relay.server] HTTP server exited with error: {}", e);
        }
    });

    Ok(actual_port)
}
