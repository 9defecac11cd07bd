/// WebSocket watch handler.
///
/// Protocol:
///   Client opens `/watch/{path}`.
///   Server sends `WatchMessage::Value` with the current document, then one
///   per write or removal of that path, until either side closes.
///   Client frames other than Close are ignored.
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use retro_core::sync::WatchMessage;

use crate::api::validate_path;
use crate::state::AppState;

pub fn watch_router() -> Router<AppState> {
    Router::new().route("/watch/{*path}", get(ws_handler))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(path): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_watch_session(socket, path, state))
}

fn encode(msg: &WatchMessage) -> Message {
    Message::Text(serde_json::to_string(msg).unwrap_or_default().into())
}

async fn handle_watch_session(socket: WebSocket, raw_path: String, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let path = match validate_path(&raw_path) {
        Ok(path) => path,
        Err(message) => {
            log::warn!("[retro.relay.watch] Refusing watch: {}", message);
            let _ = ws_tx.send(encode(&WatchMessage::Error { message })).await;
            let _ = ws_tx.send(Message::Close(None)).await;
            return;
        }
    };

    let mut updates = state.db.subscribe(&path);
    log::info!("[retro.relay.watch] Watcher connected to {}", path);

    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(value) = update else { break };
                if ws_tx.send(encode(&WatchMessage::Value { value })).await.is_err() {
                    break;
                }
            }
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        log::warn!("[retro.relay.watch] Read error on {}: {}", path, e);
                        break;
                    }
                }
            }
        }
    }

    log::info!("[retro.relay.watch] Watcher disconnected from {}", path);
}
