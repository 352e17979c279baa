//! Budget handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;

use super::records::{DataResponse, OwnerQuery};
use crate::{ApiQuery, AppError, AppState};
use finesight_core::{Budget, FinanceStore, RecordStore};

/// Query parameters for listing budgets
#[derive(Debug, Deserialize)]
pub struct BudgetQuery {
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

/// GET /api/budgets?user_id=&month=&year= - List budgets, optionally for one month
pub async fn list_budgets(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<BudgetQuery>,
) -> Result<Json<DataResponse<Vec<Budget>>>, AppError> {
    let owner = OwnerQuery {
        user_id: query.user_id,
    };
    let user_id = owner.owner()?;

    let budgets = match (query.month, query.year) {
        (Some(month), Some(year)) => state.store.list_budgets_for_month(user_id, month, year)?,
        (month, year) => {
            let mut budgets: Vec<Budget> = RecordStore::list(state.store.as_ref(), user_id)?;
            budgets.retain(|b| {
                month.map_or(true, |m| b.month == m) && year.map_or(true, |y| b.year == y)
            });
            budgets
        }
    };

    Ok(Json(DataResponse { data: budgets }))
}
