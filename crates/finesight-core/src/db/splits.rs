//! Split expense operations
//!
//! The participant list is stored as JSON text in the `splits` column.

use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use super::{date_column, insert_error, Database};
use crate::error::Result;
use crate::models::{OwnedRecord, Split, SplitExpense};
use crate::store::RecordStore;

const SPLIT_COLUMNS: &str = "id, user_id, description, total_amount, payer, splits, date";

fn row_to_split_expense(row: &Row<'_>) -> rusqlite::Result<SplitExpense> {
    let splits_json: String = row.get(5)?;
    let splits: Vec<Split> = serde_json::from_str(&splits_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    Ok(SplitExpense {
        id: row.get(0)?,
        user_id: row.get(1)?,
        description: row.get(2)?,
        total_amount: row.get(3)?,
        payer: row.get(4)?,
        splits,
        date: date_column(row, 6)?,
    })
}

impl Database {
    /// List an owner's split expenses, newest first
    pub fn list_split_expenses(&self, user_id: &str) -> Result<Vec<SplitExpense>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM split_expenses WHERE user_id = ? ORDER BY date DESC, rowid ASC",
            SPLIT_COLUMNS
        ))?;

        let splits = stmt
            .query_map(params![user_id], row_to_split_expense)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(splits)
    }

    pub fn get_split_expense(&self, user_id: &str, id: &str) -> Result<Option<SplitExpense>> {
        let conn = self.conn()?;
        let split = conn
            .query_row(
                &format!(
                    "SELECT {} FROM split_expenses WHERE id = ? AND user_id = ?",
                    SPLIT_COLUMNS
                ),
                params![id, user_id],
                row_to_split_expense,
            )
            .optional()?;
        Ok(split)
    }

    pub fn insert_split_expense(&self, split: &SplitExpense) -> Result<()> {
        let splits_json = serde_json::to_string(&split.splits)?;
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO split_expenses (id, user_id, description, total_amount, payer, splits, date)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                split.id,
                split.user_id,
                split.description,
                split.total_amount,
                split.payer,
                splits_json,
                split.date.to_string(),
            ],
        )
        .map_err(|e| insert_error(e, SplitExpense::KIND, &split.id))?;
        Ok(())
    }

    pub fn update_split_expense(&self, split: &SplitExpense) -> Result<bool> {
        let splits_json = serde_json::to_string(&split.splits)?;
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE split_expenses
            SET description = ?, total_amount = ?, payer = ?, splits = ?, date = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                split.description,
                split.total_amount,
                split.payer,
                splits_json,
                split.date.to_string(),
                split.id,
                split.user_id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_split_expense(&self, user_id: &str, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM split_expenses WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }
}

impl RecordStore<SplitExpense> for Database {
    fn list(&self, user_id: &str) -> Result<Vec<SplitExpense>> {
        self.list_split_expenses(user_id)
    }

    fn get(&self, user_id: &str, id: &str) -> Result<Option<SplitExpense>> {
        self.get_split_expense(user_id, id)
    }

    fn insert(&self, record: &SplitExpense) -> Result<SplitExpense> {
        self.insert_split_expense(record)?;
        Ok(record.clone())
    }

    fn update(&self, record: &SplitExpense) -> Result<bool> {
        self.update_split_expense(record)
    }

    fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        self.delete_split_expense(user_id, id)
    }
}
