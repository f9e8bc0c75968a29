//! Curio library — object registry engine.
//!
//! This crate provides the core components for running the object
//! registry service: the repository orchestrating blob + metadata
//! stores, the change notifier fanning out lifecycle events, pluggable
//! store backends, and the HTTP/WebSocket boundary.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod metadata;
pub mod metrics;
pub mod notify;
pub mod repository;
pub mod server;
pub mod storage;

use crate::config::Config;
use crate::notify::ChangeNotifier;
use crate::repository::ObjectRepository;

/// Shared application state passed to all handlers via `axum::extract::State`.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Writer-of-record for object lifecycles.
    pub repository: ObjectRepository,
    /// Fan-out of created/deleted events to live subscribers.
    pub notifier: ChangeNotifier,
}
