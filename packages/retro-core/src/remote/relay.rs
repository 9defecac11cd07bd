/// Client for the retro relay server.
///
/// One-shot reads and writes go over HTTP (`/db/{path}`); watches open a
/// WebSocket on `/watch/{path}` and forward each `WatchMessage::Value` to the
/// returned receiver. The socket is closed once the receiver is dropped.
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use super::{RealtimeDatabase, WatchReceiver};
use crate::storage::StoreError;
use crate::sync::WatchMessage;

pub struct RelayDatabase {
    base_url: String,
    client: reqwest::Client,
}

impl RelayDatabase {
    /// `base_url` is the relay's HTTP origin, e.g. `http://127.0.0.1:8787`.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn document_url(&self, path: &str) -> String {
        format!("{}/db/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn watch_url(&self, path: &str) -> String {
        format!(
            "{}/watch/{}",
            self.base_url
                .replacen("http://", "ws://", 1)
                .replacen("https://", "wss://", 1),
            path.trim_start_matches('/')
        )
    }

    fn check_status(path: &str, status: reqwest::StatusCode) -> Result<(), StoreError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(StoreError::Rejected {
                path: path.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl RealtimeDatabase for RelayDatabase {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let resp = self
            .client
            .get(self.document_url(path))
            .send()
            .await
            .map_err(StoreError::remote)?;
        Self::check_status(path, resp.status())?;
        let value: Value = resp.json().await.map_err(StoreError::remote)?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let resp = self
            .client
            .put(self.document_url(path))
            .json(&value)
            .send()
            .await
            .map_err(StoreError::remote)?;
        Self::check_status(path, resp.status())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let resp = self
            .client
            .delete(self.document_url(path))
            .send()
            .await
            .map_err(StoreError::remote)?;
        Self::check_status(path, resp.status())
    }

    async fn watch(&self, path: &str) -> Result<WatchReceiver, StoreError> {
        let url = self.watch_url(path);
        let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| StoreError::Remote(format!("WS connect failed: {}", e)))?;

        log::info!("[retro.remote.relay] Watching {}", url);

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let (mut ws_tx, mut ws_rx) = ws_stream.split();
            loop {
                let msg = tokio::select! {
                    _ = tx.closed() => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                    msg = ws_rx.next() => msg,
                };
                let text = match msg {
                    Some(Ok(Message::Text(t))) => t.to_string(),
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_tx.send(Message::Pong(data)).await;
                        continue;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        log::info!("[retro.remote.relay] Watch closed: {}", url);
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        log::warn!("[retro.remote.relay] WS read error on {}: {}", url, e);
                        break;
                    }
                };

                match serde_json::from_str::<WatchMessage>(&text) {
                    Ok(WatchMessage::Value { value }) => {
                        if tx.send(value).is_err() {
                            break;
                        }
                    }
                    Ok(WatchMessage::Error { message }) => {
                        log::error!("[retro.remote.relay] Relay error on {}: {}", url, message);
                        break;
                    }
                    Err(e) => {
                        log::warn!("[retro.remote.relay] Unparseable frame on {}: {}", url, e);
                    }
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let db = RelayDatabase::new("http://localhost:8787/");
        assert_eq!(db.base_url(), "http://localhost:8787");
        assert_eq!(
            db.document_url("sessions/ABC123"),
            "http://localhost:8787/db/sessions/ABC123"
        );
        assert_eq!(
            db.watch_url("/sessions/ABC123"),
            "ws://localhost:8787/watch/sessions/ABC123"
        );
    }

    #[test]
    fn test_tls_watch_url() {
        let db = RelayDatabase::new("https://relay.example.com");
        assert_eq!(
            db.watch_url("sessions/X"),
            "wss://relay.example.com/watch/sessions/X"
        );
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_an_error() {
        let db = RelayDatabase::new("http://127.0.0.1:1");
        assert!(db.get("sessions/A").await.is_err());
        assert!(db.watch("sessions/A").await.is_err());
    }
}
