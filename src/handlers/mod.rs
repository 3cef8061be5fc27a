pub mod health;
pub mod webhooks;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub use health::health_check;
pub use webhooks::{action_webhook, filter_webhook};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/filter", post(filter_webhook))
        .route("/action", post(action_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
