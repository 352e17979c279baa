//! Recurring template operations and advancer claims

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{date_column, insert_error, parsed_column, Database};
use crate::error::Result;
use crate::models::{OwnedRecord, RecurringTransaction};
use crate::store::RecordStore;

const RECURRING_COLUMNS: &str =
    "id, user_id, title, amount, category, frequency, next_date, is_active, description";

fn row_to_recurring(row: &Row<'_>) -> rusqlite::Result<RecurringTransaction> {
    Ok(RecurringTransaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        amount: row.get(3)?,
        category: row.get(4)?,
        frequency: parsed_column(row, 5)?,
        next_date: date_column(row, 6)?,
        is_active: row.get(7)?,
        description: row.get(8)?,
    })
}

impl Database {
    /// List an owner's recurring templates, soonest first
    pub fn list_recurring(&self, user_id: &str) -> Result<Vec<RecurringTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM recurring_transactions WHERE user_id = ? ORDER BY next_date ASC, rowid ASC",
            RECURRING_COLUMNS
        ))?;

        let templates = stmt
            .query_map(params![user_id], row_to_recurring)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(templates)
    }

    /// All active templates across owners (advancer input)
    pub fn list_all_active_recurring(&self) -> Result<Vec<RecurringTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM recurring_transactions WHERE is_active = 1 ORDER BY next_date ASC, rowid ASC",
            RECURRING_COLUMNS
        ))?;

        let templates = stmt
            .query_map([], row_to_recurring)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(templates)
    }

    pub fn get_recurring(&self, user_id: &str, id: &str) -> Result<Option<RecurringTransaction>> {
        let conn = self.conn()?;
        let template = conn
            .query_row(
                &format!(
                    "SELECT {} FROM recurring_transactions WHERE id = ? AND user_id = ?",
                    RECURRING_COLUMNS
                ),
                params![id, user_id],
                row_to_recurring,
            )
            .optional()?;
        Ok(template)
    }

    pub fn insert_recurring(&self, template: &RecurringTransaction) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO recurring_transactions
                (id, user_id, title, amount, category, frequency, next_date, is_active, description)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                template.id,
                template.user_id,
                template.title,
                template.amount,
                template.category,
                template.frequency.as_str(),
                template.next_date.to_string(),
                template.is_active,
                template.description,
            ],
        )
        .map_err(|e| insert_error(e, RecurringTransaction::KIND, &template.id))?;
        Ok(())
    }

    pub fn update_recurring(&self, template: &RecurringTransaction) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE recurring_transactions
            SET title = ?, amount = ?, category = ?, frequency = ?, next_date = ?,
                is_active = ?, description = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                template.title,
                template.amount,
                template.category,
                template.frequency.as_str(),
                template.next_date.to_string(),
                template.is_active,
                template.description,
                template.id,
                template.user_id,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Delete a template; occurrences it already generated are kept
    pub fn delete_recurring(&self, user_id: &str, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM recurring_transactions WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    /// Record the (template, day) claim; false if it was already taken
    pub fn claim_recurring_run(&self, template_id: &str, run_date: NaiveDate) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO recurring_runs (template_id, run_date) VALUES (?, ?)",
            params![template_id, run_date.to_string()],
        )?;
        Ok(inserted == 1)
    }
}

impl RecordStore<RecurringTransaction> for Database {
    fn list(&self, user_id: &str) -> Result<Vec<RecurringTransaction>> {
        self.list_recurring(user_id)
    }

    fn get(&self, user_id: &str, id: &str) -> Result<Option<RecurringTransaction>> {
        self.get_recurring(user_id, id)
    }

    fn insert(&self, record: &RecurringTransaction) -> Result<RecurringTransaction> {
        self.insert_recurring(record)?;
        Ok(record.clone())
    }

    fn update(&self, record: &RecurringTransaction) -> Result<bool> {
        self.update_recurring(record)
    }

    fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        self.delete_recurring(user_id, id)
    }
}
