//! Domain models for Finesight
//!
//! Every record is a flat row keyed by a client-assigned string id and scoped
//! by the owner's `user_id`. Responses use snake_case field names; request
//! bodies also accept the camelCase names older mobile clients send.

use std::cmp::Ordering;

use chrono::{Days, Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Generate a fresh record identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Today's date in local time
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidData(format!("{} required", field)));
    }
    Ok(())
}

fn require_amount(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::InvalidData(format!("{} must be a finite number", field)));
    }
    Ok(())
}

/// Orders optional dates ascending with missing dates last
fn cmp_optional_date(a: &Option<NaiveDate>, b: &Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Lenient date parsing for request bodies
///
/// Accepts `YYYY-MM-DD` or a full ISO-8601 timestamp, keeping only the
/// calendar date.
pub mod date_format {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer};

    pub fn parse(s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        let day = s.split(['T', ' ']).next().unwrap_or(s);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| de::Error::custom(format!("invalid date: {}", s)))
    }

    /// Optional variant: `null`, a missing field or an empty string are all `None`
    pub mod option {
        use super::*;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let s: Option<String> = Option::deserialize(deserializer)?;
            match s {
                None => Ok(None),
                Some(s) if s.trim().is_empty() => Ok(None),
                Some(s) => parse(&s)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid date: {}", s))),
            }
        }
    }
}

/// Shared behaviour of every owner-scoped record
pub trait OwnedRecord: Clone + Send + Sync + 'static {
    /// Singular name used in log lines and error messages
    const KIND: &'static str;

    fn id(&self) -> &str;
    fn user_id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn set_user_id(&mut self, user_id: String);

    /// Entity-specific presence checks
    fn check_fields(&self) -> Result<()>;

    /// Ordering used when listing an owner's records
    fn listing_order(a: &Self, b: &Self) -> Ordering;

    /// Assign a UUID v4 when the client did not supply an id
    fn ensure_id(&mut self) {
        if self.id().trim().is_empty() {
            self.set_id(new_id());
        }
    }

    fn validate(&self) -> Result<()> {
        require("user_id", self.user_id())?;
        self.check_fields()
    }
}

macro_rules! record_ids {
    () => {
        fn id(&self) -> &str {
            &self.id
        }

        fn user_id(&self) -> &str {
            &self.user_id
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }

        fn set_user_id(&mut self, user_id: String) {
            self.user_id = user_id;
        }
    };
}

fn default_payment_method() -> String {
    "Card".to_string()
}

fn default_payment_status() -> String {
    "pending".to_string()
}

fn default_true() -> bool {
    true
}

/// A single spending record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    pub amount: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default = "today", deserialize_with = "date_format::deserialize")]
    pub date: NaiveDate,
    #[serde(default = "default_payment_method", alias = "paymentMethod")]
    pub payment_method: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl OwnedRecord for Expense {
    const KIND: &'static str = "expense";

    record_ids!();

    fn check_fields(&self) -> Result<()> {
        require("title", &self.title)?;
        require("category", &self.category)?;
        require_amount("amount", self.amount)
    }

    fn listing_order(a: &Self, b: &Self) -> Ordering {
        b.date.cmp(&a.date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Income {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub source: String,
    pub amount: f64,
    #[serde(default = "today", deserialize_with = "date_format::deserialize")]
    pub date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
}

impl OwnedRecord for Income {
    const KIND: &'static str = "income";

    record_ids!();

    fn check_fields(&self) -> Result<()> {
        require("source", &self.source)?;
        require_amount("amount", self.amount)
    }

    fn listing_order(a: &Self, b: &Self) -> Ordering {
        b.date.cmp(&a.date)
    }
}

/// A payment made through an external processor
///
/// `status` is an open string set by the client (e.g. "pending", "paid").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "userId")]
    pub user_id: String,
    pub amount: f64,
    #[serde(default = "default_payment_status")]
    pub status: String,
    #[serde(
        default,
        alias = "externalOrderId",
        alias = "razorpayOrderId",
        alias = "razorpay_order_id"
    )]
    pub external_order_id: Option<String>,
    #[serde(default = "today", deserialize_with = "date_format::deserialize")]
    pub date: NaiveDate,
    #[serde(default)]
    pub purpose: String,
}

impl OwnedRecord for Payment {
    const KIND: &'static str = "payment";

    record_ids!();

    fn check_fields(&self) -> Result<()> {
        require("status", &self.status)?;
        require_amount("amount", self.amount)
    }

    fn listing_order(a: &Self, b: &Self) -> Ordering {
        b.date.cmp(&a.date)
    }
}

/// Monthly spending limit for one category
///
/// Unique per (user_id, category, month, year); creating a second budget for
/// the same key overwrites the limit of the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub category: String,
    pub limit: f64,
    pub month: u32,
    pub year: i32,
}

impl OwnedRecord for Budget {
    const KIND: &'static str = "budget";

    record_ids!();

    fn check_fields(&self) -> Result<()> {
        require("category", &self.category)?;
        require_amount("limit", self.limit)?;
        if !(1..=12).contains(&self.month) {
            return Err(Error::InvalidData(format!(
                "month must be between 1 and 12, got {}",
                self.month
            )));
        }
        Ok(())
    }

    fn listing_order(a: &Self, b: &Self) -> Ordering {
        a.category.cmp(&b.category)
    }
}

/// How often a recurring template comes due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String")]
pub enum Frequency {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Yearly => "Yearly",
        }
    }

    /// The date one unit after `date`
    ///
    /// Calendar months and years clamp to the last valid day, so Jan 31 plus
    /// one month is the last day of February and Feb 29 plus one year is
    /// Feb 28. Returns `None` only past the end of chrono's date range.
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Daily => date.checked_add_days(Days::new(1)),
            Self::Weekly => date.checked_add_days(Days::new(7)),
            Self::Monthly => date.checked_add_months(Months::new(1)),
            Self::Yearly => date.checked_add_months(Months::new(12)),
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" | "annual" | "annually" => Ok(Self::Yearly),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A repeating obligation that the daily advancer turns into expenses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTransaction {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    pub amount: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(
        default = "today",
        alias = "nextDate",
        deserialize_with = "date_format::deserialize"
    )]
    pub next_date: NaiveDate,
    #[serde(default = "default_true", alias = "isActive")]
    pub is_active: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl OwnedRecord for RecurringTransaction {
    const KIND: &'static str = "recurring transaction";

    record_ids!();

    fn check_fields(&self) -> Result<()> {
        require("title", &self.title)?;
        require("category", &self.category)?;
        require_amount("amount", self.amount)
    }

    fn listing_order(a: &Self, b: &Self) -> Ordering {
        a.next_date.cmp(&b.next_date)
    }
}

/// One participant's portion of a split expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    #[serde(alias = "name")]
    pub participant: String,
    #[serde(alias = "amount")]
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitExpense {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "totalAmount")]
    pub total_amount: f64,
    #[serde(default)]
    pub payer: String,
    #[serde(default)]
    pub splits: Vec<Split>,
    #[serde(default = "today", deserialize_with = "date_format::deserialize")]
    pub date: NaiveDate,
}

impl OwnedRecord for SplitExpense {
    const KIND: &'static str = "split expense";

    record_ids!();

    fn check_fields(&self) -> Result<()> {
        require("payer", &self.payer)?;
        require_amount("total_amount", self.total_amount)?;
        if self.splits.is_empty() {
            return Err(Error::InvalidData("at least one split required".into()));
        }
        for split in &self.splits {
            require("participant", &split.participant)?;
            require_amount("share", split.share)?;
        }
        Ok(())
    }

    fn listing_order(a: &Self, b: &Self) -> Ordering {
        b.date.cmp(&a.date)
    }
}

/// A savings goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(alias = "targetAmount")]
    pub target_amount: f64,
    #[serde(default, alias = "currentAmount")]
    pub current_amount: f64,
    #[serde(default, deserialize_with = "date_format::option::deserialize")]
    pub deadline: Option<NaiveDate>,
    #[serde(default, alias = "isCompleted")]
    pub is_completed: bool,
    /// Display color as the client's ARGB integer
    #[serde(default)]
    pub color: Option<i64>,
}

impl OwnedRecord for Goal {
    const KIND: &'static str = "goal";

    record_ids!();

    fn check_fields(&self) -> Result<()> {
        require("title", &self.title)?;
        require_amount("target_amount", self.target_amount)?;
        require_amount("current_amount", self.current_amount)
    }

    fn listing_order(a: &Self, b: &Self) -> Ordering {
        cmp_optional_date(&a.deadline, &b.deadline)
    }
}

/// Partial goal update: only the fields present are changed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoalPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "targetAmount")]
    pub target_amount: Option<f64>,
    #[serde(default, alias = "currentAmount")]
    pub current_amount: Option<f64>,
    #[serde(default, deserialize_with = "date_format::option::deserialize")]
    pub deadline: Option<NaiveDate>,
    #[serde(default, alias = "isCompleted")]
    pub is_completed: Option<bool>,
    #[serde(default)]
    pub color: Option<i64>,
}

impl GoalPatch {
    pub fn apply(self, goal: &mut Goal) {
        if let Some(title) = self.title {
            goal.title = title;
        }
        if let Some(target) = self.target_amount {
            goal.target_amount = target;
        }
        if let Some(current) = self.current_amount {
            goal.current_amount = current;
        }
        if self.deadline.is_some() {
            goal.deadline = self.deadline;
        }
        if let Some(done) = self.is_completed {
            goal.is_completed = done;
        }
        if self.color.is_some() {
            goal.color = self.color;
        }
    }
}

/// Direction of a debt relative to the owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum DebtType {
    /// The owner borrowed money
    Owe,
    /// The owner lent money
    Owed,
}

impl DebtType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owe => "Owe",
            Self::Owed => "Owed",
        }
    }
}

impl std::str::FromStr for DebtType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owe" => Ok(Self::Owe),
            "owed" => Ok(Self::Owed),
            _ => Err(format!("Unknown debt type: {}", s)),
        }
    }
}

impl TryFrom<String> for DebtType {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for DebtType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "userId")]
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: DebtType,
    #[serde(default)]
    pub person: String,
    pub amount: f64,
    #[serde(
        default,
        alias = "dueDate",
        deserialize_with = "date_format::option::deserialize"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(default, alias = "isPaid")]
    pub is_paid: bool,
}

impl OwnedRecord for Debt {
    const KIND: &'static str = "debt";

    record_ids!();

    fn check_fields(&self) -> Result<()> {
        require("person", &self.person)?;
        require_amount("amount", self.amount)
    }

    fn listing_order(a: &Self, b: &Self) -> Ordering {
        cmp_optional_date(&a.due_date, &b.due_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_monthly_advance_clamps_to_month_end() {
        assert_eq!(
            Frequency::Monthly.advance(date("2024-01-31")),
            Some(date("2024-02-29"))
        );
        assert_eq!(
            Frequency::Monthly.advance(date("2023-01-31")),
            Some(date("2023-02-28"))
        );
        assert_eq!(
            Frequency::Monthly.advance(date("2024-12-15")),
            Some(date("2025-01-15"))
        );
    }

    #[test]
    fn test_yearly_advance_from_leap_day() {
        assert_eq!(
            Frequency::Yearly.advance(date("2024-02-29")),
            Some(date("2025-02-28"))
        );
    }

    #[test]
    fn test_daily_and_weekly_advance() {
        assert_eq!(
            Frequency::Daily.advance(date("2024-12-31")),
            Some(date("2025-01-01"))
        );
        assert_eq!(
            Frequency::Weekly.advance(date("2024-02-26")),
            Some(date("2024-03-04"))
        );
    }

    #[test]
    fn test_frequency_parse_is_case_insensitive() {
        assert_eq!("monthly".parse::<Frequency>().unwrap(), Frequency::Monthly);
        assert_eq!("WEEKLY".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert!("fortnightly".parse::<Frequency>().is_err());
        assert_eq!(
            serde_json::to_value(Frequency::Yearly).unwrap(),
            serde_json::json!("Yearly")
        );
    }

    #[test]
    fn test_expense_accepts_camel_case_and_timestamps() {
        let expense: Expense = serde_json::from_value(serde_json::json!({
            "id": "e1",
            "userId": "u1",
            "title": "Lunch",
            "amount": 12.5,
            "category": "Food",
            "date": "2024-01-15T10:30:00.000Z",
            "paymentMethod": "Cash"
        }))
        .unwrap();

        assert_eq!(expense.user_id, "u1");
        assert_eq!(expense.date, date("2024-01-15"));
        assert_eq!(expense.payment_method, "Cash");
        assert_eq!(expense.description, None);

        let json = serde_json::to_value(&expense).unwrap();
        assert_eq!(json["date"], "2024-01-15");
        assert_eq!(json["payment_method"], "Cash");
    }

    #[test]
    fn test_expense_defaults() {
        let expense: Expense = serde_json::from_value(serde_json::json!({
            "user_id": "u1",
            "title": "Coffee",
            "amount": 3.0,
            "category": "Food"
        }))
        .unwrap();
        assert_eq!(expense.payment_method, "Card");
        assert_eq!(expense.date, today());
        assert!(expense.id.is_empty());
    }

    #[test]
    fn test_ensure_id_generates_uuid_only_when_missing() {
        let mut expense: Expense = serde_json::from_value(serde_json::json!({
            "user_id": "u1", "title": "A", "amount": 1.0, "category": "B"
        }))
        .unwrap();
        expense.ensure_id();
        assert!(uuid::Uuid::parse_str(&expense.id).is_ok());

        let mut kept = expense.clone();
        kept.id = "client-id".into();
        kept.ensure_id();
        assert_eq!(kept.id, "client-id");
    }

    #[test]
    fn test_validation_rejects_missing_owner_and_fields() {
        let mut expense: Expense = serde_json::from_value(serde_json::json!({
            "title": "A", "amount": 1.0, "category": "B"
        }))
        .unwrap();
        let err = expense.validate().unwrap_err();
        assert!(err.to_string().contains("user_id required"));

        expense.user_id = "u1".into();
        expense.title = "  ".into();
        assert!(matches!(expense.validate(), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_budget_month_range() {
        let mut budget = Budget {
            id: "b1".into(),
            user_id: "u1".into(),
            category: "Food".into(),
            limit: 100.0,
            month: 13,
            year: 2024,
        };
        assert!(budget.validate().is_err());
        budget.month = 12;
        assert!(budget.validate().is_ok());
    }

    #[test]
    fn test_split_expense_requires_splits() {
        let split: SplitExpense = serde_json::from_value(serde_json::json!({
            "user_id": "u1",
            "description": "Dinner",
            "totalAmount": 60.0,
            "payer": "me",
            "splits": []
        }))
        .unwrap();
        assert!(split.validate().is_err());

        let split: SplitExpense = serde_json::from_value(serde_json::json!({
            "user_id": "u1",
            "description": "Dinner",
            "total_amount": 60.0,
            "payer": "me",
            "splits": [{"name": "Ana", "amount": 30.0}, {"participant": "me", "share": 30.0}]
        }))
        .unwrap();
        assert!(split.validate().is_ok());
        assert_eq!(split.splits[0].participant, "Ana");
    }

    #[test]
    fn test_debt_type_serializes_as_type() {
        let debt: Debt = serde_json::from_value(serde_json::json!({
            "user_id": "u1",
            "type": "owed",
            "person": "Sam",
            "amount": 40.0,
            "dueDate": ""
        }))
        .unwrap();
        assert_eq!(debt.kind, DebtType::Owed);
        assert_eq!(debt.due_date, None);

        let json = serde_json::to_value(&debt).unwrap();
        assert_eq!(json["type"], "Owed");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_goal_patch_only_touches_present_fields() {
        let mut goal = Goal {
            id: "g1".into(),
            user_id: "u1".into(),
            title: "Car".into(),
            target_amount: 5000.0,
            current_amount: 100.0,
            deadline: Some(date("2025-06-01")),
            is_completed: false,
            color: Some(0xFF00FF),
        };
        let patch: GoalPatch =
            serde_json::from_value(serde_json::json!({"currentAmount": 250.0})).unwrap();
        patch.apply(&mut goal);

        assert_eq!(goal.current_amount, 250.0);
        assert_eq!(goal.title, "Car");
        assert_eq!(goal.deadline, Some(date("2025-06-01")));
    }

    #[test]
    fn test_listing_order_puts_missing_deadlines_last() {
        let mut a = Goal {
            id: "a".into(),
            user_id: "u".into(),
            title: "A".into(),
            target_amount: 1.0,
            current_amount: 0.0,
            deadline: None,
            is_completed: false,
            color: None,
        };
        let mut b = a.clone();
        b.deadline = Some(date("2030-01-01"));
        assert_eq!(Goal::listing_order(&b, &a), Ordering::Less);
        a.deadline = Some(date("2029-01-01"));
        assert_eq!(Goal::listing_order(&a, &b), Ordering::Less);
    }
}
