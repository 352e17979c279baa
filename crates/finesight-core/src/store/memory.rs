//! In-memory store
//!
//! Keeps each collection as a `Vec` in insertion order behind one `RwLock`.
//! Nothing is persisted; used with `--storage memory` and in tests.

use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;

use super::{FinanceStore, RecordStore};
use crate::error::{Error, Result};
use crate::models::{
    Budget, Debt, Expense, Goal, Income, OwnedRecord, Payment, RecurringTransaction, SplitExpense,
};

#[derive(Default)]
pub struct Tables {
    expenses: Vec<Expense>,
    incomes: Vec<Income>,
    payments: Vec<Payment>,
    budgets: Vec<Budget>,
    recurring: Vec<RecurringTransaction>,
    splits: Vec<SplitExpense>,
    goals: Vec<Goal>,
    debts: Vec<Debt>,
    claims: HashSet<(String, NaiveDate)>,
}

/// Maps a record type to its collection
pub trait MemoryTable: OwnedRecord {
    fn rows(tables: &Tables) -> &Vec<Self>;
    fn rows_mut(tables: &mut Tables) -> &mut Vec<Self>;

    /// Position of the row a create should overwrite, if any
    fn upsert_target(_rows: &[Self], _record: &Self) -> Option<usize> {
        None
    }

    /// Error an update would violate a uniqueness rule with
    fn update_conflict(_rows: &[Self], _record: &Self) -> Option<Error> {
        None
    }
}

macro_rules! memory_table {
    ($ty:ty, $field:ident) => {
        impl MemoryTable for $ty {
            fn rows(tables: &Tables) -> &Vec<Self> {
                &tables.$field
            }

            fn rows_mut(tables: &mut Tables) -> &mut Vec<Self> {
                &mut tables.$field
            }
        }
    };
}

memory_table!(Expense, expenses);
memory_table!(Income, incomes);
memory_table!(Payment, payments);
memory_table!(RecurringTransaction, recurring);
memory_table!(SplitExpense, splits);
memory_table!(Debt, debts);

impl MemoryTable for Budget {
    fn rows(tables: &Tables) -> &Vec<Self> {
        &tables.budgets
    }

    fn rows_mut(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.budgets
    }

    fn upsert_target(rows: &[Self], record: &Self) -> Option<usize> {
        rows.iter().position(|b| same_budget_key(b, record))
    }

    fn update_conflict(rows: &[Self], record: &Self) -> Option<Error> {
        rows.iter()
            .any(|b| b.id != record.id && same_budget_key(b, record))
            .then(|| {
                Error::Conflict(format!(
                    "budget for {} in {}/{} already exists",
                    record.category, record.month, record.year
                ))
            })
    }
}

fn same_budget_key(a: &Budget, b: &Budget) -> bool {
    a.user_id == b.user_id && a.category == b.category && a.month == b.month && a.year == b.year
}

impl MemoryTable for Goal {
    fn rows(tables: &Tables) -> &Vec<Self> {
        &tables.goals
    }

    fn rows_mut(tables: &mut Tables) -> &mut Vec<Self> {
        &mut tables.goals
    }

    fn upsert_target(rows: &[Self], record: &Self) -> Option<usize> {
        rows.iter()
            .position(|g| g.id == record.id && g.user_id == record.user_id)
    }
}

/// Volatile `FinanceStore` implementation
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }
}

impl<T: MemoryTable> RecordStore<T> for MemoryStore {
    fn list(&self, user_id: &str) -> Result<Vec<T>> {
        let tables = self.read()?;
        let mut rows: Vec<T> = T::rows(&tables)
            .iter()
            .filter(|r| r.user_id() == user_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for ties, matching SQLite's rowid tiebreak
        rows.sort_by(T::listing_order);
        Ok(rows)
    }

    fn get(&self, user_id: &str, id: &str) -> Result<Option<T>> {
        let tables = self.read()?;
        Ok(T::rows(&tables)
            .iter()
            .find(|r| r.id() == id && r.user_id() == user_id)
            .cloned())
    }

    fn insert(&self, record: &T) -> Result<T> {
        let mut tables = self.write()?;
        let rows = T::rows_mut(&mut tables);

        if let Some(pos) = T::upsert_target(rows, record) {
            let mut stored = record.clone();
            stored.set_id(rows[pos].id().to_string());
            rows[pos] = stored.clone();
            return Ok(stored);
        }

        if rows.iter().any(|r| r.id() == record.id()) {
            return Err(Error::Conflict(format!(
                "{} with id {} already exists",
                T::KIND,
                record.id()
            )));
        }

        rows.push(record.clone());
        Ok(record.clone())
    }

    fn update(&self, record: &T) -> Result<bool> {
        let mut tables = self.write()?;
        let rows = T::rows_mut(&mut tables);
        let Some(pos) = rows
            .iter()
            .position(|r| r.id() == record.id() && r.user_id() == record.user_id())
        else {
            return Ok(false);
        };
        if let Some(err) = T::update_conflict(rows, record) {
            return Err(err);
        }
        rows[pos] = record.clone();
        Ok(true)
    }

    fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        let mut tables = self.write()?;
        let rows = T::rows_mut(&mut tables);
        let before = rows.len();
        rows.retain(|r| !(r.id() == id && r.user_id() == user_id));
        Ok(rows.len() < before)
    }
}

impl FinanceStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "in-memory"
    }

    fn list_budgets_for_month(&self, user_id: &str, month: u32, year: i32) -> Result<Vec<Budget>> {
        let mut budgets: Vec<Budget> = RecordStore::<Budget>::list(self, user_id)?;
        budgets.retain(|b| b.month == month && b.year == year);
        Ok(budgets)
    }

    fn list_active_recurring(&self) -> Result<Vec<RecurringTransaction>> {
        let tables = self.read()?;
        let mut active: Vec<RecurringTransaction> = tables
            .recurring
            .iter()
            .filter(|r| r.is_active)
            .cloned()
            .collect();
        active.sort_by(RecurringTransaction::listing_order);
        Ok(active)
    }

    fn claim_occurrence(&self, template_id: &str, run_date: NaiveDate) -> Result<bool> {
        let mut tables = self.write()?;
        Ok(tables.claims.insert((template_id.to_string(), run_date)))
    }
}
