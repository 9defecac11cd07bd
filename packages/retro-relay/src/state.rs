/// Shared application state passed to axum handlers.
use std::sync::{Arc, Mutex};

use retro_core::remote::memory::MemoryDatabase;

use crate::config::RelayConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<MemoryDatabase>,
    pub port: u16,
    pub bind_address: String,
    /// Port actually bound, known once the server is listening.
    pub live_port: Arc<Mutex<u16>>,
}

impl AppState {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            db: Arc::new(MemoryDatabase::new()),
            port: config.port,
            bind_address: config.bind_address.clone(),
            live_port: Arc::new(Mutex::new(config.port)),
        }
    }
}
