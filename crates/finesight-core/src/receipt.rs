//! Receipt image extraction
//!
//! The image goes to a vision-capable model with a fixed prompt; the reply is
//! expected to hold a single JSON object describing the purchase.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::ai::{parsing, AIBackend};
use crate::error::{Error, Result};

/// System prompt for receipt extraction
pub const RECEIPT_PROMPT: &str = "You are a receipt scanning assistant. \
Extract the following information from the receipt image provided: \
- Merchant Name (title) \
- Total Amount (number) \
- Date (ISO 8601 format YYYY-MM-DD) \
- Category (Infer from merchant/items, e.g., 'Food', 'Grocery', 'Transport', 'Shopping', 'Health', 'Other') \
- Description (Brief summary of items) \
Return ONLY a valid JSON object with keys: title, amount, date, category, description. \
Do not include markdown code blocks.";

/// User turn accompanying the image
pub const RECEIPT_INSTRUCTION: &str = "Scan this receipt.";

/// Fields extracted from a receipt
///
/// Missing keys default to empty values; `amount` may arrive as a number or
/// a numeric string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScannedReceipt {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    /// As returned by the model, usually `YYYY-MM-DD`
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

fn lenient_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
        Missing(()),
    }

    Ok(match Amount::deserialize(deserializer)? {
        Amount::Number(n) => n,
        Amount::Text(s) => s
            .trim()
            .trim_start_matches(['$', '₹', '€', '£'])
            .replace(',', "")
            .parse()
            .unwrap_or(0.0),
        Amount::Missing(()) => 0.0,
    })
}

/// Extract receipt fields from JPEG bytes
pub async fn scan_receipt<A: AIBackend + ?Sized>(ai: &A, image: &[u8]) -> Result<ScannedReceipt> {
    if image.is_empty() {
        return Err(Error::InvalidData("Image data required".into()));
    }

    let reply = ai
        .describe_image(RECEIPT_PROMPT, RECEIPT_INSTRUCTION, image)
        .await?;
    debug!(model = %ai.model(), "Receipt reply: {}", reply);

    parsing::extract_json_object(&reply)
}
