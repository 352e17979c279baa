//! Chat assistant that turns free text into records
//!
//! The model sees five "add a record" tools. Every tool call it makes creates
//! one record for the requesting owner and yields one result line; the reply
//! is those lines joined by newlines. Without tool calls the model's own text
//! is passed back.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::ai::{AIBackend, ChatRequest, ChatTurn, ToolCall, ToolSpec};
use crate::error::{Error, Result};
use crate::models::{Debt, Expense, Goal, Income, OwnedRecord, RecurringTransaction};
use crate::store::{FinanceStore, RecordStore};

/// System prompt for the chat assistant
pub const SYSTEM_PROMPT: &str = "You are a helpful financial assistant for an expense tracker app. \
You can help users track expenses and income by adding them directly to their tracker. \
When users ask you to add expenses or income, use the provided functions. \
Be concise and friendly in your responses.";

/// Reply used when the model returns neither text nor tool calls
pub const FALLBACK_REPLY: &str = "I'm here to help with your expenses!";

/// Category assigned to recurring templates created without one
const DEFAULT_RECURRING_CATEGORY: &str = "Entertainment";

const EXPENSE_CATEGORIES: &[&str] = &[
    "Food", "Groceries", "Restaurant", "Coffee & Tea", "Fast Food",
    "Transport", "Fuel", "Public Transit", "Taxi & Ride", "Parking",
    "Rent", "Utilities", "Home Maintenance", "Furniture", "Home Decor",
    "Shopping", "Clothing", "Electronics", "Books", "Gifts",
    "Entertainment", "Movies", "Gaming", "Music", "Sports",
    "Health", "Medical", "Pharmacy", "Gym", "Wellness",
    "Education", "Courses", "Office Supplies", "Professional Dev",
    "Investments", "Insurance", "Savings", "Taxes", "Bank Fees",
    "Travel", "Hotels", "Flights", "Vacation",
    "Personal Care", "Haircare", "Beauty", "Spa",
    "Pets", "Pet Food", "Vet",
    "Phone Bill", "Internet", "Streaming", "Subscriptions",
    "Childcare", "Kids Activities", "School Supplies", "Toys",
    "Charity", "Donations", "Religious",
    "Other", "Miscellaneous",
];

/// Result of one chat exchange
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub reply: String,
    pub action_performed: bool,
}

fn tool(name: &str, description: &str, parameters: Value) -> ToolSpec {
    ToolSpec {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    }
}

/// The record-creating tools offered to the model
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        tool(
            "add_expense",
            "Add a new expense to the user's tracker",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Short descriptive title for the expense (e.g., 'Lunch at restaurant', 'Uber ride')"},
                    "amount": {"type": "number", "description": "Amount spent in dollars"},
                    "category": {"type": "string", "enum": EXPENSE_CATEGORIES, "description": "Category that best fits this expense"},
                    "date": {"type": "string", "description": "Date in ISO 8601 format (YYYY-MM-DD). Use today's date if not specified by user."},
                    "paymentMethod": {"type": "string", "description": "Payment method used (Cash, Card, UPI, Bank Transfer, etc). Default to 'Card' if not specified."},
                    "description": {"type": "string", "description": "Optional additional details about the expense"}
                },
                "required": ["title", "amount", "category"]
            }),
        ),
        tool(
            "add_income",
            "Add a new income entry to the user's tracker",
            json!({
                "type": "object",
                "properties": {
                    "source": {"type": "string", "description": "Source of income (e.g., 'Salary', 'Freelance Project', 'Investment Return')"},
                    "amount": {"type": "number", "description": "Amount received in dollars"},
                    "date": {"type": "string", "description": "Date in ISO 8601 format (YYYY-MM-DD). Use today's date if not specified by user."},
                    "description": {"type": "string", "description": "Optional additional details about the income"}
                },
                "required": ["source", "amount"]
            }),
        ),
        tool(
            "add_recurring",
            "Add a new recurring subscription or bill",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Name of subscription (e.g. Netflix, Spotify)"},
                    "amount": {"type": "number", "description": "Cost per cycle"},
                    "frequency": {"type": "string", "enum": ["Daily", "Weekly", "Monthly", "Yearly"], "description": "Billing frequency. Default to 'Monthly'"},
                    "category": {"type": "string", "description": "Category (e.g. Entertainment, Utilities)"},
                    "nextDate": {"type": "string", "description": "Next billing date YYYY-MM-DD"}
                },
                "required": ["title", "amount"]
            }),
        ),
        tool(
            "add_debt",
            "Add a new debt or loan record",
            json!({
                "type": "object",
                "properties": {
                    "type": {"type": "string", "enum": ["Owe", "Owed"], "description": "'Owe' if I borrowed, 'Owed' if I lent"},
                    "person": {"type": "string", "description": "Name of the person"},
                    "amount": {"type": "number", "description": "Amount of money"},
                    "dueDate": {"type": "string", "description": "Due date YYYY-MM-DD"}
                },
                "required": ["type", "person", "amount"]
            }),
        ),
        tool(
            "add_goal",
            "Add a new savings goal",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Name of the goal (e.g. New Car)"},
                    "targetAmount": {"type": "number", "description": "Total amount needed"},
                    "currentAmount": {"type": "number", "description": "Initial saved amount. Default 0"},
                    "deadline": {"type": "string", "description": "Target date YYYY-MM-DD"}
                },
                "required": ["title", "targetAmount"]
            }),
        ),
    ]
}

/// Run one chat exchange for `user_id`
///
/// Model failures are returned as errors; failures creating individual
/// records become `❌` result lines instead.
pub async fn handle_chat<A: AIBackend + ?Sized>(
    ai: &A,
    store: &dyn FinanceStore,
    user_id: &str,
    message: &str,
    context: &[ChatTurn],
) -> Result<ChatReply> {
    if user_id.trim().is_empty() {
        return Err(Error::InvalidData("user_id required".into()));
    }
    if message.trim().is_empty() {
        return Err(Error::InvalidData("message required".into()));
    }

    let request = ChatRequest {
        system: SYSTEM_PROMPT.to_string(),
        history: context.to_vec(),
        message: message.to_string(),
        tools: tool_specs(),
    };

    let outcome = ai.chat(&request).await?;
    debug!(
        model = %ai.model(),
        tool_calls = outcome.tool_calls.len(),
        "Chat outcome"
    );

    if outcome.tool_calls.is_empty() {
        return Ok(ChatReply {
            reply: outcome
                .text
                .unwrap_or_else(|| FALLBACK_REPLY.to_string()),
            action_performed: false,
        });
    }

    let lines: Vec<String> = outcome
        .tool_calls
        .iter()
        .map(|call| match apply_tool_call(store, user_id, call) {
            Ok(line) => line,
            Err(e) => {
                error!(tool = %call.name, user_id = %user_id, error = %e, "Chat tool call failed");
                format!(
                    "❌ Failed to add {}: {}",
                    call.name.trim_start_matches("add_"),
                    e
                )
            }
        })
        .collect();

    Ok(ChatReply {
        reply: lines.join("\n"),
        action_performed: true,
    })
}

/// Create the record a tool call describes and return its result line
pub fn apply_tool_call(store: &dyn FinanceStore, user_id: &str, call: &ToolCall) -> Result<String> {
    match call.name.as_str() {
        "add_expense" => {
            let expense: Expense = record_from_args(user_id, &call.arguments)?;
            RecordStore::<Expense>::insert(store, &expense)?;
            Ok(format!(
                "✅ Added expense: {} - ${:.2} ({})",
                expense.title, expense.amount, expense.category
            ))
        }
        "add_income" => {
            let income: Income = record_from_args(user_id, &call.arguments)?;
            RecordStore::<Income>::insert(store, &income)?;
            Ok(format!(
                "✅ Added income: {} - ${:.2}",
                income.source, income.amount
            ))
        }
        "add_recurring" => {
            let mut args = call.arguments.clone();
            if let Some(obj) = args.as_object_mut() {
                obj.entry("category")
                    .or_insert_with(|| json!(DEFAULT_RECURRING_CATEGORY));
            }
            let recurring: RecurringTransaction = record_from_args(user_id, &args)?;
            RecordStore::<RecurringTransaction>::insert(store, &recurring)?;
            Ok(format!(
                "✅ Added subscription: {} ({})",
                recurring.title, recurring.frequency
            ))
        }
        "add_debt" => {
            let debt: Debt = record_from_args(user_id, &call.arguments)?;
            RecordStore::<Debt>::insert(store, &debt)?;
            Ok(format!(
                "✅ Added loan: {} {} ${:.2}",
                debt.kind, debt.person, debt.amount
            ))
        }
        "add_goal" => {
            let goal: Goal = record_from_args(user_id, &call.arguments)?;
            RecordStore::<Goal>::insert(store, &goal)?;
            Ok(format!(
                "✅ Added goal: {} target ${:.2}",
                goal.title, goal.target_amount
            ))
        }
        other => Err(Error::InvalidData(format!("unknown tool {}", other))),
    }
}

/// Decode tool arguments into a fresh record owned by `user_id`
///
/// Null and empty-string arguments are dropped so field defaults apply; any
/// id or owner the model invents is ignored.
fn record_from_args<T: OwnedRecord + DeserializeOwned>(user_id: &str, args: &Value) -> Result<T> {
    let mut args = args.clone();
    let obj = args
        .as_object_mut()
        .ok_or_else(|| Error::InvalidData("tool arguments must be an object".into()))?;
    obj.retain(|key, value| {
        !matches!(key.as_str(), "id" | "user_id" | "userId")
            && !value.is_null()
            && value.as_str().map_or(true, |s| !s.trim().is_empty())
    });

    let mut record: T = serde_json::from_value(args)
        .map_err(|e| Error::InvalidData(format!("invalid {} arguments: {}", T::KIND, e)))?;
    record.set_user_id(user_id.to_string());
    record.ensure_id();
    record.validate()?;
    Ok(record)
}
