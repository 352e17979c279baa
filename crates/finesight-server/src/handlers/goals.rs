//! Goal handlers
//!
//! Goals are the one type whose PUT takes a partial body: progress updates
//! from the client only send `current_amount`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use super::records::{OwnerQuery, SavedResponse};
use crate::{ApiJson, ApiQuery, AppError, AppState};
use finesight_core::{Goal, GoalPatch, OwnedRecord, RecordStore};

/// PUT /api/goals/:id?user_id= - Apply a partial update to a goal
pub async fn patch_goal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<OwnerQuery>,
    ApiJson(patch): ApiJson<GoalPatch>,
) -> Result<Json<SavedResponse<Goal>>, AppError> {
    let user_id = query.owner()?;
    let store = state.store.as_ref();

    let mut goal = RecordStore::<Goal>::get(store, user_id, &id)?
        .ok_or_else(|| AppError::not_found("Goal not found"))?;
    patch.apply(&mut goal);
    goal.validate()?;

    if !RecordStore::<Goal>::update(store, &goal)? {
        return Err(AppError::not_found("Goal not found"));
    }

    info!(id = %goal.id, user_id = %user_id, "Updated goal");

    Ok(Json(SavedResponse::success(goal)))
}
