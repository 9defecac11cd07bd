pub mod actions;
pub mod config;
pub mod export;
pub mod listeners;
pub mod remote;
pub mod session;
pub mod storage;
pub mod sync;
pub mod timer;
pub mod types;
pub mod watcher;
