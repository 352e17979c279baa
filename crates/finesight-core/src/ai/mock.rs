//! Mock backend for testing
//!
//! Turns simple phrases into tool calls with keyword rules so the chat flow
//! can be exercised end to end without a running model.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use crate::error::Result;

use super::types::{ChatOutcome, ChatRequest, ToolCall};
use super::AIBackend;

/// Reply returned by `describe_image`, fenced the way real models often answer
pub const MOCK_RECEIPT_REPLY: &str = "```json\n{\"title\": \"Mock Store\", \"amount\": 23.45, \"date\": \"2024-01-15\", \"category\": \"Grocery\", \"description\": \"Milk, bread, eggs\"}\n```";

/// Mock AI backend for testing
///
/// Returns predictable responses for all AI operations.
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self { healthy: true }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self { healthy: false }
    }
}

fn amount_regex() -> &'static Regex {
    static AMOUNT: OnceLock<Regex> = OnceLock::new();
    AMOUNT.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid amount regex"))
}

/// Pick the tool and arguments a phrase maps to
fn tool_for(message: &str) -> Option<(&'static str, serde_json::Value)> {
    let amount: f64 = amount_regex().find(message)?.as_str().parse().ok()?;
    let lower = message.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    let call = if has(&["salary", "income", "earned", "received", "paid me"]) {
        ("add_income", json!({"source": "Salary", "amount": amount}))
    } else if has(&["subscription", "every month", "monthly", "weekly", "yearly"]) {
        let frequency = if lower.contains("weekly") {
            "Weekly"
        } else if lower.contains("yearly") {
            "Yearly"
        } else {
            "Monthly"
        };
        (
            "add_recurring",
            json!({"title": "Subscription", "amount": amount, "frequency": frequency}),
        )
    } else if has(&["owe", "lent", "borrowed", "loan"]) {
        let kind = if has(&["i owe", "borrowed"]) { "owe" } else { "owed" };
        (
            "add_debt",
            json!({"type": kind, "person": "Friend", "amount": amount}),
        )
    } else if has(&["goal", "save for", "saving"]) {
        ("add_goal", json!({"title": "Savings", "targetAmount": amount}))
    } else {
        (
            "add_expense",
            json!({"title": "Expense", "amount": amount, "category": "Other"}),
        )
    };
    Some(call)
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome> {
        let call = tool_for(&request.message)
            .filter(|(name, _)| request.tools.iter().any(|t| t.name == *name));

        Ok(match call {
            Some((name, arguments)) => ChatOutcome {
                text: None,
                tool_calls: vec![ToolCall {
                    id: "mock-call-1".to_string(),
                    name: name.to_string(),
                    arguments,
                }],
            },
            None => ChatOutcome {
                text: Some(format!("Mock reply to: {}", request.message)),
                tool_calls: Vec::new(),
            },
        })
    }

    async fn describe_image(
        &self,
        _system: &str,
        _instruction: &str,
        _image_data: &[u8],
    ) -> Result<String> {
        Ok(MOCK_RECEIPT_REPLY.to_string())
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
