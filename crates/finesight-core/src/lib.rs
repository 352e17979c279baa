//! Finesight Core Library
//!
//! Shared functionality for the Finesight personal finance backend:
//! - Domain records scoped by owner id
//! - Storage contract with SQLite (SQLCipher) and in-memory implementations
//! - Daily recurring-occurrence advancer
//! - Pluggable AI backends (OpenAI-compatible, Anthropic, mock)
//! - Tool-calling chat assistant and receipt scanner
//! - Spending analytics

pub mod ai;
pub mod analytics;
pub mod assistant;
pub mod db;
pub mod error;
pub mod models;
pub mod receipt;
pub mod recurring;
pub mod store;

/// Test utilities including a mock AI server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, AnthropicBackend, ChatOutcome, ChatRequest, ChatTurn, MockBackend,
    OpenAICompatibleBackend, ToolCall, ToolSpec,
};
pub use analytics::{summarize, SpendingSummary};
pub use assistant::{handle_chat, ChatReply};
pub use db::Database;
pub use error::{Error, Result};
pub use models::{
    Budget, Debt, DebtType, Expense, Frequency, Goal, GoalPatch, Income, OwnedRecord, Payment,
    RecurringTransaction, Split, SplitExpense,
};
pub use receipt::{scan_receipt, ScannedReceipt};
pub use recurring::{run_due, AdvanceReport};
pub use store::{FinanceStore, MemoryStore, RecordStore, SharedStore};
