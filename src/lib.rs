pub mod blockchain;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use error::types::*;

use std::sync::Arc;

use services::{ActionRunner, EventFilter};

/// Shared state of the webhook host.
#[derive(Clone)]
pub struct AppState {
    pub filter: Arc<EventFilter>,
    pub action: Arc<ActionRunner>,
}
