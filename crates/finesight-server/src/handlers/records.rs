//! Owner-scoped CRUD handlers shared by every record type
//!
//! Routes instantiate these per type, e.g. `get(list_records::<Expense>)`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::info;

use crate::{ApiJson, ApiQuery, AppError, AppState};
use finesight_core::{FinanceStore, OwnedRecord, RecordStore};

/// `?user_id=` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct OwnerQuery {
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
}

impl OwnerQuery {
    /// The owner id, or 400 when absent or blank
    pub fn owner(&self) -> Result<&str, AppError> {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::bad_request("user_id required"))
    }
}

/// `{data: ...}`
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// `{message: "success", data: ...}`
#[derive(Debug, Serialize)]
pub struct SavedResponse<T> {
    pub message: &'static str,
    pub data: T,
}

impl<T> SavedResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            message: "success",
            data,
        }
    }
}

/// `{message: "deleted"}`
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: &'static str,
}

fn not_found<T: OwnedRecord>() -> AppError {
    let kind = T::KIND;
    let mut name = kind[..1].to_uppercase();
    name.push_str(&kind[1..]);
    AppError::not_found(&format!("{} not found", name))
}

/// GET /api/{entity}?user_id= - List the owner's records
pub async fn list_records<T>(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<OwnerQuery>,
) -> Result<Json<DataResponse<Vec<T>>>, AppError>
where
    T: OwnedRecord + Serialize,
    dyn FinanceStore: RecordStore<T>,
{
    let user_id = query.owner()?;
    let records = <dyn FinanceStore as RecordStore<T>>::list(state.store.as_ref(), user_id)?;
    Ok(Json(DataResponse { data: records }))
}

/// POST /api/{entity} - Create a record
///
/// The owner comes from the body; `?user_id=` fills it in when the body has
/// none. A missing id is generated.
pub async fn create_record<T>(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<OwnerQuery>,
    ApiJson(mut record): ApiJson<T>,
) -> Result<Json<SavedResponse<T>>, AppError>
where
    T: OwnedRecord + Serialize + DeserializeOwned,
    dyn FinanceStore: RecordStore<T>,
{
    if record.user_id().trim().is_empty() {
        if let Ok(owner) = query.owner() {
            record.set_user_id(owner.to_string());
        }
    }
    record.ensure_id();
    record.validate()?;

    let stored = <dyn FinanceStore as RecordStore<T>>::insert(state.store.as_ref(), &record)?;

    info!(kind = T::KIND, id = %stored.id(), user_id = %stored.user_id(), "Created record");

    Ok(Json(SavedResponse::success(stored)))
}

/// PUT /api/{entity}/:id?user_id= - Replace the owner's record
///
/// The path id and query owner win over whatever the body carries.
pub async fn update_record<T>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<OwnerQuery>,
    ApiJson(mut record): ApiJson<T>,
) -> Result<Json<SavedResponse<T>>, AppError>
where
    T: OwnedRecord + Serialize + DeserializeOwned,
    dyn FinanceStore: RecordStore<T>,
{
    if let Ok(owner) = query.owner() {
        record.set_user_id(owner.to_string());
    }
    record.set_id(id);
    record.validate()?;

    if !<dyn FinanceStore as RecordStore<T>>::update(state.store.as_ref(), &record)? {
        return Err(not_found::<T>());
    }

    info!(kind = T::KIND, id = %record.id(), user_id = %record.user_id(), "Updated record");

    Ok(Json(SavedResponse::success(record)))
}

/// DELETE /api/{entity}/:id?user_id= - Delete the owner's record
pub async fn delete_record<T>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<OwnerQuery>,
) -> Result<Json<DeletedResponse>, AppError>
where
    T: OwnedRecord,
    dyn FinanceStore: RecordStore<T>,
{
    let user_id = query.owner()?;

    if !<dyn FinanceStore as RecordStore<T>>::delete(state.store.as_ref(), user_id, &id)? {
        return Err(not_found::<T>());
    }

    info!(kind = T::KIND, id = %id, user_id = %user_id, "Deleted record");

    Ok(Json(DeletedResponse { message: "deleted" }))
}
