//! Expense operations

use rusqlite::{params, OptionalExtension, Row};

use super::{date_column, insert_error, Database};
use crate::error::Result;
use crate::models::{Expense, OwnedRecord};
use crate::store::RecordStore;

const EXPENSE_COLUMNS: &str =
    "id, user_id, title, amount, category, date, payment_method, description";

fn row_to_expense(row: &Row<'_>) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        amount: row.get(3)?,
        category: row.get(4)?,
        date: date_column(row, 5)?,
        payment_method: row.get(6)?,
        description: row.get(7)?,
    })
}

impl Database {
    /// List an owner's expenses, newest first
    pub fn list_expenses(&self, user_id: &str) -> Result<Vec<Expense>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM expenses WHERE user_id = ? ORDER BY date DESC, rowid ASC",
            EXPENSE_COLUMNS
        ))?;

        let expenses = stmt
            .query_map(params![user_id], row_to_expense)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(expenses)
    }

    /// Get a single expense of an owner
    pub fn get_expense(&self, user_id: &str, id: &str) -> Result<Option<Expense>> {
        let conn = self.conn()?;
        let expense = conn
            .query_row(
                &format!(
                    "SELECT {} FROM expenses WHERE id = ? AND user_id = ?",
                    EXPENSE_COLUMNS
                ),
                params![id, user_id],
                row_to_expense,
            )
            .optional()?;
        Ok(expense)
    }

    /// Insert an expense (fails with `Conflict` on a duplicate id)
    pub fn insert_expense(&self, expense: &Expense) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO expenses (id, user_id, title, amount, category, date, payment_method, description)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                expense.id,
                expense.user_id,
                expense.title,
                expense.amount,
                expense.category,
                expense.date.to_string(),
                expense.payment_method,
                expense.description,
            ],
        )
        .map_err(|e| insert_error(e, Expense::KIND, &expense.id))?;
        Ok(())
    }

    /// Replace an expense; returns false if the owner has no such expense
    pub fn update_expense(&self, expense: &Expense) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE expenses
            SET title = ?, amount = ?, category = ?, date = ?, payment_method = ?, description = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                expense.title,
                expense.amount,
                expense.category,
                expense.date.to_string(),
                expense.payment_method,
                expense.description,
                expense.id,
                expense.user_id,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Delete an expense; returns false if the owner has no such expense
    pub fn delete_expense(&self, user_id: &str, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM expenses WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }
}

impl RecordStore<Expense> for Database {
    fn list(&self, user_id: &str) -> Result<Vec<Expense>> {
        self.list_expenses(user_id)
    }

    fn get(&self, user_id: &str, id: &str) -> Result<Option<Expense>> {
        self.get_expense(user_id, id)
    }

    fn insert(&self, record: &Expense) -> Result<Expense> {
        self.insert_expense(record)?;
        Ok(record.clone())
    }

    fn update(&self, record: &Expense) -> Result<bool> {
        self.update_expense(record)
    }

    fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        self.delete_expense(user_id, id)
    }
}
