//! Spending analytics over an owner's expenses

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::models::Expense;

/// Totals per category and per calendar month
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpendingSummary {
    pub category_totals: BTreeMap<String, f64>,
    /// Keyed `"{year}-{month}"` with the month not zero padded (`"2024-3"`)
    pub monthly_trends: BTreeMap<String, f64>,
}

/// Sum expenses by category and by month
pub fn summarize(expenses: &[Expense]) -> SpendingSummary {
    let mut summary = SpendingSummary::default();

    for expense in expenses {
        *summary
            .category_totals
            .entry(expense.category.clone())
            .or_insert(0.0) += expense.amount;

        let month_key = format!("{}-{}", expense.date.year(), expense.date.month());
        *summary.monthly_trends.entry(month_key).or_insert(0.0) += expense.amount;
    }

    summary
}
