//! Analytics handler

use std::sync::Arc;

use axum::{extract::State, Json};

use super::records::{DataResponse, OwnerQuery};
use crate::{ApiQuery, AppError, AppState};
use finesight_core::{analytics, Expense, RecordStore, SpendingSummary};

/// GET /api/analytics?user_id= - Category totals and monthly trends
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<OwnerQuery>,
) -> Result<Json<DataResponse<SpendingSummary>>, AppError> {
    let user_id = query.owner()?;
    let expenses: Vec<Expense> = RecordStore::list(state.store.as_ref(), user_id)?;

    Ok(Json(DataResponse {
        data: analytics::summarize(&expenses),
    }))
}
