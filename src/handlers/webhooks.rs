use axum::{extract::State, http::StatusCode, response::Json};
use tracing::info;

use crate::error::AppError;
use crate::models::{ActionPayload, FilterPayload, FilterResponse};
use crate::AppState;

/// Runs the filter over the delivered events.
/// POST /filter
pub async fn filter_webhook(
    State(state): State<AppState>,
    Json(payload): Json<FilterPayload>,
) -> Result<Json<FilterResponse>, AppError> {
    let request = payload.into_body();
    info!("Filter invoked with {} event(s)", request.events.len());

    let response = state.filter.handle(request).await?;
    Ok(Json(response))
}

/// Performs the side effects of one match.
/// POST /action
pub async fn action_webhook(
    State(state): State<AppState>,
    Json(payload): Json<ActionPayload>,
) -> Result<StatusCode, AppError> {
    let body = payload.into_body();

    state.action.handle(body.metadata).await?;
    Ok(StatusCode::NO_CONTENT)
}
