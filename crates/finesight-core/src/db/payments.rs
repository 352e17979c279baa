//! Payment operations

use rusqlite::{params, OptionalExtension, Row};

use super::{date_column, insert_error, Database};
use crate::error::Result;
use crate::models::{OwnedRecord, Payment};
use crate::store::RecordStore;

const PAYMENT_COLUMNS: &str = "id, user_id, amount, status, external_order_id, date, purpose";

fn row_to_payment(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount: row.get(2)?,
        status: row.get(3)?,
        external_order_id: row.get(4)?,
        date: date_column(row, 5)?,
        purpose: row.get(6)?,
    })
}

impl Database {
    /// List an owner's payments, newest first
    pub fn list_payments(&self, user_id: &str) -> Result<Vec<Payment>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM payments WHERE user_id = ? ORDER BY date DESC, rowid ASC",
            PAYMENT_COLUMNS
        ))?;

        let payments = stmt
            .query_map(params![user_id], row_to_payment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(payments)
    }

    pub fn get_payment(&self, user_id: &str, id: &str) -> Result<Option<Payment>> {
        let conn = self.conn()?;
        let payment = conn
            .query_row(
                &format!(
                    "SELECT {} FROM payments WHERE id = ? AND user_id = ?",
                    PAYMENT_COLUMNS
                ),
                params![id, user_id],
                row_to_payment,
            )
            .optional()?;
        Ok(payment)
    }

    pub fn insert_payment(&self, payment: &Payment) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO payments (id, user_id, amount, status, external_order_id, date, purpose)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                payment.id,
                payment.user_id,
                payment.amount,
                payment.status,
                payment.external_order_id,
                payment.date.to_string(),
                payment.purpose,
            ],
        )
        .map_err(|e| insert_error(e, Payment::KIND, &payment.id))?;
        Ok(())
    }

    pub fn update_payment(&self, payment: &Payment) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE payments
            SET amount = ?, status = ?, external_order_id = ?, date = ?, purpose = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                payment.amount,
                payment.status,
                payment.external_order_id,
                payment.date.to_string(),
                payment.purpose,
                payment.id,
                payment.user_id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_payment(&self, user_id: &str, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM payments WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }
}

impl RecordStore<Payment> for Database {
    fn list(&self, user_id: &str) -> Result<Vec<Payment>> {
        self.list_payments(user_id)
    }

    fn get(&self, user_id: &str, id: &str) -> Result<Option<Payment>> {
        self.get_payment(user_id, id)
    }

    fn insert(&self, record: &Payment) -> Result<Payment> {
        self.insert_payment(record)?;
        Ok(record.clone())
    }

    fn update(&self, record: &Payment) -> Result<bool> {
        self.update_payment(record)
    }

    fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        self.delete_payment(user_id, id)
    }
}
