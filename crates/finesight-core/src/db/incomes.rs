//! Income operations

use rusqlite::{params, OptionalExtension, Row};

use super::{date_column, insert_error, Database};
use crate::error::Result;
use crate::models::{Income, OwnedRecord};
use crate::store::RecordStore;

const INCOME_COLUMNS: &str = "id, user_id, source, amount, date, description";

fn row_to_income(row: &Row<'_>) -> rusqlite::Result<Income> {
    Ok(Income {
        id: row.get(0)?,
        user_id: row.get(1)?,
        source: row.get(2)?,
        amount: row.get(3)?,
        date: date_column(row, 4)?,
        description: row.get(5)?,
    })
}

impl Database {
    /// List an owner's incomes, newest first
    pub fn list_incomes(&self, user_id: &str) -> Result<Vec<Income>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM incomes WHERE user_id = ? ORDER BY date DESC, rowid ASC",
            INCOME_COLUMNS
        ))?;

        let incomes = stmt
            .query_map(params![user_id], row_to_income)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(incomes)
    }

    pub fn get_income(&self, user_id: &str, id: &str) -> Result<Option<Income>> {
        let conn = self.conn()?;
        let income = conn
            .query_row(
                &format!(
                    "SELECT {} FROM incomes WHERE id = ? AND user_id = ?",
                    INCOME_COLUMNS
                ),
                params![id, user_id],
                row_to_income,
            )
            .optional()?;
        Ok(income)
    }

    pub fn insert_income(&self, income: &Income) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO incomes (id, user_id, source, amount, date, description) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                income.id,
                income.user_id,
                income.source,
                income.amount,
                income.date.to_string(),
                income.description,
            ],
        )
        .map_err(|e| insert_error(e, Income::KIND, &income.id))?;
        Ok(())
    }

    pub fn update_income(&self, income: &Income) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE incomes SET source = ?, amount = ?, date = ?, description = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                income.source,
                income.amount,
                income.date.to_string(),
                income.description,
                income.id,
                income.user_id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_income(&self, user_id: &str, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM incomes WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }
}

impl RecordStore<Income> for Database {
    fn list(&self, user_id: &str) -> Result<Vec<Income>> {
        self.list_incomes(user_id)
    }

    fn get(&self, user_id: &str, id: &str) -> Result<Option<Income>> {
        self.get_income(user_id, id)
    }

    fn insert(&self, record: &Income) -> Result<Income> {
        self.insert_income(record)?;
        Ok(record.clone())
    }

    fn update(&self, record: &Income) -> Result<bool> {
        self.update_income(record)
    }

    fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        self.delete_income(user_id, id)
    }
}
