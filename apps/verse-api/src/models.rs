//! Request/response models for the Verse Finder API
//!
//! The wire names are fixed by the existing frontend: the prompt travels as
//! `mainPrompt`, both on the request and inside `received_data`.

use serde::{Deserialize, Serialize};

/// Body of POST /api/verses/search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRequest {
    #[serde(rename = "mainPrompt")]
    pub main_prompt: String,
}

/// Envelope returned by the search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptResponse {
    pub success: bool,
    pub message: String,
    pub received_data: ReceivedData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivedData {
    #[serde(rename = "mainPrompt")]
    pub main_prompt: String,
    /// The matched quote, or the fallback message when nothing clears the
    /// threshold. A fallback is a designed response, not an error.
    pub quote: String,
}

/// Body of the liveness check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}
