//! Chat assistant handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::{ApiJson, AppError, AppState};
use finesight_core::{assistant, ChatReply, ChatTurn};

/// Request body for a chat message
#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub message: String,
    /// Prior turns, oldest first
    #[serde(default)]
    pub context: Vec<ChatTurn>,
    #[serde(default, alias = "userId")]
    pub user_id: String,
}

/// POST /api/chat - Let the model add records from free text
pub async fn chat(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<ChatBody>,
) -> Result<Json<ChatReply>, AppError> {
    let ai = state.ai()?;

    if body.user_id.trim().is_empty() {
        return Err(AppError::bad_request("user_id required"));
    }
    if body.message.trim().is_empty() {
        return Err(AppError::bad_request("message required"));
    }

    let reply = assistant::handle_chat(
        ai,
        state.store.as_ref(),
        &body.user_id,
        &body.message,
        &body.context,
    )
    .await
    .map_err(|e| AppError::internal_with("Failed to get response from AI", e))?;

    Ok(Json(reply))
}
