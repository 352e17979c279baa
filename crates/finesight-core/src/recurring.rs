//! Recurring-occurrence advancer
//!
//! Once per day every active template whose `next_date` is on or before the
//! run date yields one expense dated on the run date, and its `next_date`
//! moves forward one frequency unit from the previous due date. A template
//! that is several periods behind catches up one occurrence per run.
//!
//! Before writing anything the advancer claims `(template_id, run_date)` in
//! the store. A second run on the same day finds the claim and skips the
//! template, so restarts never duplicate occurrences. A crash between the
//! claim and the writes loses that day's occurrence instead.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::models::{new_id, Expense, RecurringTransaction};
use crate::store::{FinanceStore, RecordStore};

/// Payment method recorded on generated expenses
pub const AUTO_DEBIT: &str = "Auto-Debit";

/// Outcome of one advancer run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvanceReport {
    pub run_date: NaiveDate,
    /// Templates that produced an occurrence
    pub processed: usize,
    /// Due templates already claimed earlier on the same day
    pub skipped_already_run: usize,
    /// Templates whose occurrence could not be written
    pub failed: usize,
    pub created_expense_ids: Vec<String>,
}

/// Whether a template is due on `run_date`
pub fn is_due(template: &RecurringTransaction, run_date: NaiveDate) -> bool {
    template.is_active && template.next_date <= run_date
}

/// The expense a template materializes on `run_date`
pub fn occurrence_for(template: &RecurringTransaction, run_date: NaiveDate) -> Expense {
    Expense {
        id: new_id(),
        user_id: template.user_id.clone(),
        title: template.title.clone(),
        amount: template.amount,
        category: template.category.clone(),
        date: run_date,
        payment_method: AUTO_DEBIT.to_string(),
        description: Some(format!("Recurring: {} subscription", template.frequency)),
    }
}

/// The template after one period has elapsed
pub fn advanced(template: &RecurringTransaction) -> Result<RecurringTransaction> {
    let next_date = template.frequency.advance(template.next_date).ok_or_else(|| {
        Error::InvalidData(format!(
            "next date of recurring transaction {} is out of range",
            template.id
        ))
    })?;
    Ok(RecurringTransaction {
        next_date,
        ..template.clone()
    })
}

/// Materialize every due occurrence for `run_date`
///
/// Failures on one template are logged and counted; the run continues with
/// the next template. Only a failure to list templates aborts the run.
pub fn run_due(store: &dyn FinanceStore, run_date: NaiveDate) -> Result<AdvanceReport> {
    let templates = store.list_active_recurring()?;
    let mut report = AdvanceReport {
        run_date,
        processed: 0,
        skipped_already_run: 0,
        failed: 0,
        created_expense_ids: Vec::new(),
    };

    for template in templates.iter().filter(|t| is_due(t, run_date)) {
        match store.claim_occurrence(&template.id, run_date) {
            Ok(true) => {}
            Ok(false) => {
                debug!(template_id = %template.id, "Recurring occurrence already claimed today");
                report.skipped_already_run += 1;
                continue;
            }
            Err(e) => {
                error!(template_id = %template.id, error = %e, "Failed to claim recurring occurrence");
                report.failed += 1;
                continue;
            }
        }

        match materialize(store, template, run_date) {
            Ok(expense_id) => {
                report.processed += 1;
                report.created_expense_ids.push(expense_id);
            }
            Err(e) => {
                error!(
                    template_id = %template.id,
                    user_id = %template.user_id,
                    error = %e,
                    "Failed to process recurring transaction"
                );
                report.failed += 1;
            }
        }
    }

    info!(
        run_date = %report.run_date,
        processed = report.processed,
        skipped = report.skipped_already_run,
        failed = report.failed,
        "Recurring transactions processed"
    );

    Ok(report)
}

/// Write the occurrence and the advanced template (no transaction spans both)
fn materialize(
    store: &dyn FinanceStore,
    template: &RecurringTransaction,
    run_date: NaiveDate,
) -> Result<String> {
    let next = advanced(template)?;
    let expense = occurrence_for(template, run_date);
    RecordStore::<Expense>::insert(store, &expense)?;

    if !RecordStore::<RecurringTransaction>::update(store, &next)? {
        return Err(Error::NotFound(format!(
            "recurring transaction {} disappeared during the run",
            template.id
        )));
    }

    debug!(
        template_id = %template.id,
        expense_id = %expense.id,
        next_date = %next.next_date,
        "Created recurring occurrence"
    );
    Ok(expense.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Budget, Debt, Frequency, Goal, Income, Payment, SplitExpense};
    use crate::store::MemoryStore;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn template(id: &str, frequency: Frequency, next: &str) -> RecurringTransaction {
        RecurringTransaction {
            id: id.into(),
            user_id: "u1".into(),
            title: "Netflix".into(),
            amount: 15.49,
            category: "Entertainment".into(),
            frequency,
            next_date: date(next),
            is_active: true,
            description: None,
        }
    }

    #[test]
    fn test_occurrence_copies_template() {
        let t = template("r1", Frequency::Weekly, "2024-01-15");
        let e = occurrence_for(&t, date("2024-01-20"));
        assert_eq!(e.user_id, "u1");
        assert_eq!(e.title, "Netflix");
        assert_eq!(e.amount, 15.49);
        assert_eq!(e.category, "Entertainment");
        assert_eq!(e.date, date("2024-01-20"));
        assert_eq!(e.payment_method, "Auto-Debit");
        assert_eq!(
            e.description.as_deref(),
            Some("Recurring: Weekly subscription")
        );
        assert!(uuid::Uuid::parse_str(&e.id).is_ok());
    }

    #[test]
    fn test_monthly_template_advances_from_previous_due_date() {
        let store = MemoryStore::new();
        RecordStore::insert(&store, &template("r1", Frequency::Monthly, "2024-01-15")).unwrap();

        let report = run_due(&store, date("2024-02-01")).unwrap();
        assert_eq!(report.processed, 1);

        let expenses: Vec<Expense> = RecordStore::list(&store, "u1").unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].date, date("2024-02-01"));

        let updated: Option<RecurringTransaction> = RecordStore::get(&store, "u1", "r1").unwrap();
        assert_eq!(updated.unwrap().next_date, date("2024-02-15"));
    }

    #[test]
    fn test_not_yet_due_template_is_untouched() {
        let store = MemoryStore::new();
        RecordStore::insert(&store, &template("r1", Frequency::Daily, "2024-03-02")).unwrap();

        let report = run_due(&store, date("2024-03-01")).unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.skipped_already_run, 0);

        let expenses: Vec<Expense> = RecordStore::list(&store, "u1").unwrap();
        assert!(expenses.is_empty());
    }

    #[test]
    fn test_due_on_run_date_counts() {
        let t = template("r1", Frequency::Daily, "2024-03-01");
        assert!(is_due(&t, date("2024-03-01")));
        assert!(!is_due(&t, date("2024-02-29")));

        let mut inactive = t.clone();
        inactive.is_active = false;
        assert!(!is_due(&inactive, date("2024-03-05")));
    }

    #[test]
    fn test_inactive_template_never_produces() {
        let store = MemoryStore::new();
        let mut t = template("r1", Frequency::Daily, "2024-01-01");
        t.is_active = false;
        RecordStore::insert(&store, &t).unwrap();

        let report = run_due(&store, date("2024-06-01")).unwrap();
        assert_eq!(report.processed, 0);
        let expenses: Vec<Expense> = RecordStore::list(&store, "u1").unwrap();
        assert!(expenses.is_empty());
    }

    #[test]
    fn test_second_run_same_day_is_noop_even_when_behind() {
        let store = MemoryStore::new();
        // Three weeks behind: still due after the first run
        RecordStore::insert(&store, &template("r1", Frequency::Weekly, "2024-01-01")).unwrap();

        let first = run_due(&store, date("2024-01-22")).unwrap();
        assert_eq!(first.processed, 1);

        let second = run_due(&store, date("2024-01-22")).unwrap();
        assert_eq!(second.processed, 0);
        assert_eq!(second.skipped_already_run, 1);

        let expenses: Vec<Expense> = RecordStore::list(&store, "u1").unwrap();
        assert_eq!(expenses.len(), 1);

        let t: Option<RecurringTransaction> = RecordStore::get(&store, "u1", "r1").unwrap();
        assert_eq!(t.unwrap().next_date, date("2024-01-08"));
    }

    #[test]
    fn test_catch_up_one_occurrence_per_day() {
        let store = MemoryStore::new();
        RecordStore::insert(&store, &template("r1", Frequency::Weekly, "2024-01-01")).unwrap();

        for (day, expected_next) in [
            ("2024-01-22", "2024-01-08"),
            ("2024-01-23", "2024-01-15"),
            ("2024-01-24", "2024-01-22"),
            ("2024-01-25", "2024-01-29"),
        ] {
            let report = run_due(&store, date(day)).unwrap();
            assert_eq!(report.processed, 1, "run on {}", day);
            let t: Option<RecurringTransaction> = RecordStore::get(&store, "u1", "r1").unwrap();
            assert_eq!(t.unwrap().next_date, date(expected_next));
        }

        // Caught up: nothing due on the 26th
        let report = run_due(&store, date("2024-01-26")).unwrap();
        assert_eq!(report.processed, 0);
        let expenses: Vec<Expense> = RecordStore::list(&store, "u1").unwrap();
        assert_eq!(expenses.len(), 4);
    }

    #[test]
    fn test_month_end_clamping_through_advancer() {
        let store = MemoryStore::new();
        RecordStore::insert(&store, &template("r1", Frequency::Monthly, "2024-01-31")).unwrap();
        RecordStore::insert(&store, &template("r2", Frequency::Yearly, "2024-02-29")).unwrap();

        let report = run_due(&store, date("2024-03-01")).unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.created_expense_ids.len(), 2);

        let r1: Option<RecurringTransaction> = RecordStore::get(&store, "u1", "r1").unwrap();
        assert_eq!(r1.unwrap().next_date, date("2024-02-29"));
        let r2: Option<RecurringTransaction> = RecordStore::get(&store, "u1", "r2").unwrap();
        assert_eq!(r2.unwrap().next_date, date("2025-02-28"));
    }

    /// Memory store whose expense inserts fail for one title
    struct FailingExpenseStore {
        inner: MemoryStore,
        broken_title: &'static str,
    }

    macro_rules! delegate_records {
        ($($ty:ty),*) => {$(
            impl RecordStore<$ty> for FailingExpenseStore {
                fn list(&self, user_id: &str) -> Result<Vec<$ty>> {
                    RecordStore::<$ty>::list(&self.inner, user_id)
                }

                fn get(&self, user_id: &str, id: &str) -> Result<Option<$ty>> {
                    RecordStore::<$ty>::get(&self.inner, user_id, id)
                }

                fn insert(&self, record: &$ty) -> Result<$ty> {
                    RecordStore::<$ty>::insert(&self.inner, record)
                }

                fn update(&self, record: &$ty) -> Result<bool> {
                    RecordStore::<$ty>::update(&self.inner, record)
                }

                fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
                    RecordStore::<$ty>::delete(&self.inner, user_id, id)
                }
            }
        )*};
    }

    delegate_records!(Income, Payment, Budget, RecurringTransaction, SplitExpense, Goal, Debt);

    impl RecordStore<Expense> for FailingExpenseStore {
        fn list(&self, user_id: &str) -> Result<Vec<Expense>> {
            RecordStore::<Expense>::list(&self.inner, user_id)
        }

        fn get(&self, user_id: &str, id: &str) -> Result<Option<Expense>> {
            RecordStore::<Expense>::get(&self.inner, user_id, id)
        }

        fn insert(&self, record: &Expense) -> Result<Expense> {
            if record.title == self.broken_title {
                return Err(Error::Storage("disk full".into()));
            }
            RecordStore::<Expense>::insert(&self.inner, record)
        }

        fn update(&self, record: &Expense) -> Result<bool> {
            RecordStore::<Expense>::update(&self.inner, record)
        }

        fn delete(&self, user_id: &str, id: &str) -> Result<bool> {
            RecordStore::<Expense>::delete(&self.inner, user_id, id)
        }
    }

    impl FinanceStore for FailingExpenseStore {
        fn backend_name(&self) -> &'static str {
            "failing"
        }

        fn list_budgets_for_month(&self, user_id: &str, month: u32, year: i32) -> Result<Vec<Budget>> {
            self.inner.list_budgets_for_month(user_id, month, year)
        }

        fn list_active_recurring(&self) -> Result<Vec<RecurringTransaction>> {
            self.inner.list_active_recurring()
        }

        fn claim_occurrence(&self, template_id: &str, run_date: NaiveDate) -> Result<bool> {
            self.inner.claim_occurrence(template_id, run_date)
        }
    }

    #[test]
    fn test_one_failing_template_does_not_stop_the_run() {
        let store = FailingExpenseStore {
            inner: MemoryStore::new(),
            broken_title: "Gym",
        };
        let mut broken = template("r2", Frequency::Monthly, "2024-01-20");
        broken.title = "Gym".into();

        RecordStore::insert(&store, &template("r1", Frequency::Monthly, "2024-01-15")).unwrap();
        RecordStore::insert(&store, &broken).unwrap();
        RecordStore::insert(&store, &template("r3", Frequency::Weekly, "2024-01-25")).unwrap();

        let report = run_due(&store, date("2024-02-01")).unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.created_expense_ids.len(), 2);

        let expenses: Vec<Expense> = RecordStore::list(&store, "u1").unwrap();
        assert_eq!(expenses.len(), 2);
        assert!(expenses.iter().all(|e| e.title == "Netflix"));

        let r1: Option<RecurringTransaction> = RecordStore::get(&store, "u1", "r1").unwrap();
        assert_eq!(r1.unwrap().next_date, date("2024-02-15"));
        let r3: Option<RecurringTransaction> = RecordStore::get(&store, "u1", "r3").unwrap();
        assert_eq!(r3.unwrap().next_date, date("2024-02-01"));

        // The failed template keeps its due date
        let r2: Option<RecurringTransaction> = RecordStore::get(&store, "u1", "r2").unwrap();
        assert_eq!(r2.unwrap().next_date, date("2024-01-20"));
    }
}
