//! Budget operations
//!
//! Budgets are unique per (user_id, category, month, year). Creating one for
//! an existing key overwrites the limit and keeps the original id.

use rusqlite::{params, OptionalExtension, Row};

use super::{insert_error, Database};
use crate::error::{Error, Result};
use crate::models::{Budget, OwnedRecord};
use crate::store::RecordStore;

const BUDGET_COLUMNS: &str = r#"id, user_id, category, "limit", month, year"#;

fn row_to_budget(row: &Row<'_>) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category: row.get(2)?,
        limit: row.get(3)?,
        month: row.get(4)?,
        year: row.get(5)?,
    })
}

fn duplicate_key_error(err: rusqlite::Error, budget: &Budget) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::Conflict(format!(
                "budget for {} in {}/{} already exists",
                budget.category, budget.month, budget.year
            ))
        }
        other => Error::Database(other),
    }
}

impl Database {
    /// List an owner's budgets ordered by category
    pub fn list_budgets(&self, user_id: &str) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM budgets WHERE user_id = ? ORDER BY category ASC, rowid ASC",
            BUDGET_COLUMNS
        ))?;

        let budgets = stmt
            .query_map(params![user_id], row_to_budget)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(budgets)
    }

    /// List an owner's budgets for one month
    pub fn list_budgets_in_month(&self, user_id: &str, month: u32, year: i32) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM budgets
            WHERE user_id = ? AND month = ? AND year = ?
            ORDER BY category ASC, rowid ASC
            "#,
            BUDGET_COLUMNS
        ))?;

        let budgets = stmt
            .query_map(params![user_id, month, year], row_to_budget)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(budgets)
    }

    pub fn get_budget(&self, user_id: &str, id: &str) -> Result<Option<Budget>> {
        let conn = self.conn()?;
        let budget = conn
            .query_row(
                &format!(
                    "SELECT {} FROM budgets WHERE id = ? AND user_id = ?",
                    BUDGET_COLUMNS
                ),
                params![id, user_id],
                row_to_budget,
            )
            .optional()?;
        Ok(budget)
    }

    /// Create a budget, or overwrite the limit of the existing one for the
    /// same owner, category and month
    pub fn upsert_budget(&self, budget: &Budget) -> Result<Budget> {
        let conn = self.conn()?;

        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM budgets WHERE user_id = ? AND category = ? AND month = ? AND year = ?",
                params![budget.user_id, budget.category, budget.month, budget.year],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            conn.execute(
                r#"UPDATE budgets SET "limit" = ? WHERE id = ?"#,
                params![budget.limit, id],
            )?;
            let mut stored = budget.clone();
            stored.id = id;
            return Ok(stored);
        }

        conn.execute(
            r#"
            INSERT INTO budgets (id, user_id, category, "limit", month, year)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                budget.id,
                budget.user_id,
                budget.category,
                budget.limit,
                budget.month,
                budget.year,
            ],
        )
        .map_err(|e| insert_error(e, Budget::KIND, &budget.id))?;

        Ok(budget.clone())
    }

    pub fn update_budget(&self, budget: &Budget) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                r#"
                UPDATE budgets SET category = ?, "limit" = ?, month = ?, year = ?
                WHERE id = ? AND user_id = ?
                "#,
                params![
                    budget.category,
                    budget.limit,
                    budget.month,
                    budget.year,
                    budget.id,
                    budget.user_id,
                ],
            )
            .map_err(|e| duplicate_key_error(e, budget))?;
        Ok(changed > 0)
    }

    pub fn delete_budget(&self, user_id: &str, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM budgets WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }
}

impl RecordStore<Budget> for Database {
    fn list(&self, user_id: &str) -> Result<Vec<Budget>> {
        self.list_budgets(user_id)
    }

    fn get(&self, user_id: &str, id: &str) -> Result<Option<Budget>> {
        self.get_budget(user_id, id)
    }

    fn insert(&self, record: &Budget) -> Result<Budget> {
        self.upsert_budget(record)
    }

    fn update(&self, record: &Budget) -> Result<bool> {
        self.update_budget(record)
    }

    fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        self.delete_budget(user_id, id)
    }
}
