//! Storage abstraction
//!
//! The route layer and the recurring advancer only see `dyn FinanceStore`.
//! Two implementations exist: the SQLite [`Database`](crate::db::Database)
//! and [`MemoryStore`] for development and tests. The backend is picked once
//! at process start.
//!
//! Every operation is scoped by owner id. Updates and deletes report `false`
//! when no record with that id belongs to the owner, so callers cannot tell
//! another owner's record apart from a missing one.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{
    Budget, Debt, Expense, Goal, Income, OwnedRecord, Payment, RecurringTransaction, SplitExpense,
};

mod memory;

pub use memory::MemoryStore;

/// Owner-scoped CRUD over one record type
pub trait RecordStore<T: OwnedRecord>: Send + Sync {
    /// All records of the owner, in the type's listing order
    fn list(&self, user_id: &str) -> Result<Vec<T>>;

    /// Fetch one record of the owner
    fn get(&self, user_id: &str, id: &str) -> Result<Option<T>>;

    /// Persist a new record and return it as stored
    ///
    /// Fails with `Error::Conflict` when the id is already taken. Budgets
    /// and goals upsert instead (see their natural keys), so the returned
    /// record may carry an existing id.
    fn insert(&self, record: &T) -> Result<T>;

    /// Replace the owner's record with the same id
    fn update(&self, record: &T) -> Result<bool>;

    /// Delete the owner's record with this id
    fn delete(&self, user_id: &str, id: &str) -> Result<bool>;
}

/// Everything the API and the recurring job need from storage
pub trait FinanceStore:
    RecordStore<Expense>
    + RecordStore<Income>
    + RecordStore<Payment>
    + RecordStore<Budget>
    + RecordStore<RecurringTransaction>
    + RecordStore<SplitExpense>
    + RecordStore<Goal>
    + RecordStore<Debt>
{
    /// Short backend label ("SQLite", "in-memory")
    fn backend_name(&self) -> &'static str;

    /// Budgets of the owner for one month
    fn list_budgets_for_month(&self, user_id: &str, month: u32, year: i32) -> Result<Vec<Budget>>;

    /// Active recurring templates across all owners
    fn list_active_recurring(&self) -> Result<Vec<RecurringTransaction>>;

    /// Record that `template_id` has been processed for `run_date`
    ///
    /// Returns `false` when the claim already existed.
    fn claim_occurrence(&self, template_id: &str, run_date: NaiveDate) -> Result<bool>;
}

/// Shared handle used by the server and the scheduler
pub type SharedStore = Arc<dyn FinanceStore>;
