//! Savings goal operations

use rusqlite::{params, OptionalExtension, Row};

use super::{optional_date_column, Database};
use crate::error::{Error, Result};
use crate::models::{Goal, OwnedRecord};
use crate::store::RecordStore;

const GOAL_COLUMNS: &str =
    "id, user_id, title, target_amount, current_amount, deadline, is_completed, color";

fn row_to_goal(row: &Row<'_>) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        target_amount: row.get(3)?,
        current_amount: row.get(4)?,
        deadline: optional_date_column(row, 5)?,
        is_completed: row.get(6)?,
        color: row.get(7)?,
    })
}

impl Database {
    /// List an owner's goals by deadline, goals without one last
    pub fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM goals
            WHERE user_id = ?
            ORDER BY deadline IS NULL, deadline ASC, rowid ASC
            "#,
            GOAL_COLUMNS
        ))?;

        let goals = stmt
            .query_map(params![user_id], row_to_goal)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(goals)
    }

    pub fn get_goal(&self, user_id: &str, id: &str) -> Result<Option<Goal>> {
        let conn = self.conn()?;
        let goal = conn
            .query_row(
                &format!("SELECT {} FROM goals WHERE id = ? AND user_id = ?", GOAL_COLUMNS),
                params![id, user_id],
                row_to_goal,
            )
            .optional()?;
        Ok(goal)
    }

    /// Create a goal, or replace the owner's goal with the same id
    ///
    /// An id held by another owner is a conflict.
    pub fn upsert_goal(&self, goal: &Goal) -> Result<Goal> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            INSERT INTO goals (id, user_id, title, target_amount, current_amount, deadline, is_completed, color)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                target_amount = excluded.target_amount,
                current_amount = excluded.current_amount,
                deadline = excluded.deadline,
                is_completed = excluded.is_completed,
                color = excluded.color
            WHERE goals.user_id = excluded.user_id
            "#,
            params![
                goal.id,
                goal.user_id,
                goal.title,
                goal.target_amount,
                goal.current_amount,
                goal.deadline.map(|d| d.to_string()),
                goal.is_completed,
                goal.color,
            ],
        )?;

        if changed == 0 {
            return Err(Error::Conflict(format!(
                "{} with id {} already exists",
                Goal::KIND,
                goal.id
            )));
        }
        Ok(goal.clone())
    }

    pub fn update_goal(&self, goal: &Goal) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE goals
            SET title = ?, target_amount = ?, current_amount = ?, deadline = ?, is_completed = ?, color = ?
            WHERE id = ? AND user_id = ?
            "#,
            params![
                goal.title,
                goal.target_amount,
                goal.current_amount,
                goal.deadline.map(|d| d.to_string()),
                goal.is_completed,
                goal.color,
                goal.id,
                goal.user_id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_goal(&self, user_id: &str, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM goals WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }
}

impl RecordStore<Goal> for Database {
    fn list(&self, user_id: &str) -> Result<Vec<Goal>> {
        self.list_goals(user_id)
    }

    fn get(&self, user_id: &str, id: &str) -> Result<Option<Goal>> {
        self.get_goal(user_id, id)
    }

    fn insert(&self, record: &Goal) -> Result<Goal> {
        self.upsert_goal(record)
    }

    fn update(&self, record: &Goal) -> Result<bool> {
        self.update_goal(record)
    }

    fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
        self.delete_goal(user_id, id)
    }
}
