//! Debt operations

use rusqlite::{params, OptionalExtension, Row};

use super::{insert_error, optional_date_column, parsed_column, Database};
use crate::error::Result;
use crate::models::{Debt, OwnedRecord};
use crate::store::RecordStore;

const DEBT_COLUMNS: &str = "id, user_id, type, person, amount, due_date, is_paid";

fn row_to_debt(row: &Row<'_>) -> rusqlite::Result<Debt> {
    Ok(Debt {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: parsed_column(row, 2)?,
        person: row.get(3)?,
        amount: row.get(4)?,
        due_date: optional_date_column(row, 5)?,
        is_paid: row.get(6)?,
    })
}

impl Database {
    /// List an owner's debts by due date, open-ended ones last
    pub fn list_debts(&self, user_id: &str) -> Result<Vec<Debt>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM debts
            WHERE user_id = ?
            ORDER BY due_date IS NULL, due_date ASC, rowid ASC
            "#,
            DEBT_COLUMNS
        ))?;

        let debts = stmt
            .query_map(params![user_id], row_to_debt)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(debts)
    }

    pub fn get_debt(&self, user_id: &str, id: &str) -> Result<Option<Debt>> {
        let conn = self.conn()?;
        let debt = conn
            .query_row(
                &format!("SELECT {} FROM debts WHERE id = ? AND user_id = ?", DEBT_COLUMNS),
                params![id, user_id],
                row_to_debt,
            )
            .optional()?;
        Ok(debt)
    }

    pub fn insert_debt(&self, debt: &Debt) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO debts (id, user_id, type, person, amount, due_date, is_paid)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                debt.id,
                debt.user_id,
                debt.kind.as_str(),
                debt.person,
                debt.amount,
                debt.due_date.map(|d| d.to_string()),
                debt.is_paid,
            ],
        )
        .map_err(|e| insert_error(e, Debt::KIND, &debt.id))?;
        Ok(())
    }

    pub fn update_debt(&self, debt: &Debt) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE debts SET type = ?, person = ?, amount = ?, due_date = ?, is_paid = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                debt.kind.as_str(),
                debt.person,
                debt.amount,
                debt.due_date.map(|d| d.to_string()),
                debt.is_paid,
                debt.id,
                debt.user_id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_debt(&self, user_id: &str, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM debts WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }
}

impl RecordStore<Debt> for Database {
    fn list(&self, user_id: &str) -> Result<Vec<Debt>> {
        self.list_debts(user_id)
    }

    fn get(&self, user_id: &str, id: &str) -> Result<Option<Debt>> {
        self.get_debt(user_id, id)
    }

    fn insert(&self, record: &Debt) -> Result<Debt> {
        self.insert_debt(record)?;
        Ok(record.clone())
    }

    fn update(&self, record: &Debt) -> Result<bool> {
        self.update_debt(record)
    }

    fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        self.delete_debt(user_id, id)
    }
}
