//! Test utilities for finesight-core
//!
//! A mock AI server speaking just enough of the OpenAI chat completions and
//! Anthropic messages protocols to drive the real HTTP backends in tests.

use axum::{
    extract::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::sync::oneshot;

/// Receipt JSON returned for vision requests
pub const MOCK_RECEIPT_JSON: &str = r#"{"title": "Corner Cafe", "amount": 8.75, "date": "2024-05-04", "category": "Food", "description": "Latte and croissant"}"#;

/// Mock OpenAI-compatible / Anthropic server for testing
pub struct MockAIServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockAIServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat_completions))
            .route("/v1/messages", post(handle_messages));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockAIServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_models() -> Json<Value> {
    Json(json!({
        "object": "list",
        "data": [{"id": "mock-model", "object": "model"}]
    }))
}

/// Text of the last message, whether plain or multimodal
fn last_text(messages: &Value) -> String {
    let Some(last) = messages.as_array().and_then(|m| m.last()) else {
        return String::new();
    };
    match &last["content"] {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

fn has_image(messages: &Value, image_type: &str) -> bool {
    messages.as_array().is_some_and(|msgs| {
        msgs.iter().any(|m| {
            m["content"]
                .as_array()
                .is_some_and(|parts| parts.iter().any(|p| p["type"] == image_type))
        })
    })
}

fn wants_tool(request: &Value) -> bool {
    let offers_tools = request["tools"].as_array().is_some_and(|t| !t.is_empty());
    offers_tools && last_text(&request["messages"]).chars().any(|c| c.is_ascii_digit())
}

fn expense_arguments() -> Value {
    json!({"title": "Coffee", "amount": 4.5, "category": "Food"})
}

/// OpenAI chat completions endpoint
async fn handle_chat_completions(Json(request): Json<Value>) -> Json<Value> {
    let message = if has_image(&request["messages"], "image_url") {
        json!({
            "role": "assistant",
            "content": format!("```json\n{}\n```", MOCK_RECEIPT_JSON)
        })
    } else if wants_tool(&request) {
        json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_mock_1",
                "type": "function",
                "function": {
                    "name": "add_expense",
                    "arguments": expense_arguments().to_string()
                }
            }]
        })
    } else {
        json!({"role": "assistant", "content": "Hello from the mock server"})
    };

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": request["model"],
        "choices": [{"index": 0, "message": message, "finish_reason": "stop"}]
    }))
}

/// Anthropic messages endpoint
async fn handle_messages(Json(request): Json<Value>) -> Json<Value> {
    let (content, stop_reason) = if has_image(&request["messages"], "image") {
        (json!([{"type": "text", "text": MOCK_RECEIPT_JSON}]), "end_turn")
    } else if wants_tool(&request) {
        (
            json!([{
                "type": "tool_use",
                "id": "toolu_mock_1",
                "name": "add_expense",
                "input": expense_arguments()
            }]),
            "tool_use",
        )
    } else {
        (
            json!([{"type": "text", "text": "Hello from the mock server"}]),
            "end_turn",
        )
    };

    Json(json!({
        "id": "msg_mock",
        "type": "message",
        "role": "assistant",
        "model": request["model"],
        "content": content,
        "stop_reason": stop_reason,
        "usage": {"input_tokens": 10, "output_tokens": 10}
    }))
}
