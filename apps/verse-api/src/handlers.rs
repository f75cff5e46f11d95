//! HTTP request handlers for the Verse Finder API

use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::info;
use verse_core::Match;

use crate::error::ApiError;
use crate::models::{PromptRequest, PromptResponse, ReceivedData, StatusResponse};
use crate::state::AppState;

/// Health check endpoint
pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        message: "Verse Finder API is running".to_string(),
    })
}

/// Find the closest quote for a user prompt
pub async fn search_verses(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<PromptResponse>, ApiError> {
    info!("Search: prompt='{}'", request.main_prompt);

    let outcome = state.service.find_quote(&request.main_prompt)?;
    match &outcome {
        Match::Quote { index, score, .. } => {
            info!("Best match: index={}, score={:.3}", index, score)
        }
        Match::NoMatch { best_score } => {
            info!("No match above threshold, best score {:.3}", best_score)
        }
    }

    Ok(Json(PromptResponse {
        success: true,
        message: "Data received successfully".to_string(),
        received_data: ReceivedData {
            main_prompt: request.main_prompt,
            quote: outcome.into_text(),
        },
    }))
}
