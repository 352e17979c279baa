//! Receipt scanning handler

use std::sync::Arc;

use axum::{extract::State, Json};
use base64::Engine;
use serde::Deserialize;
use tracing::info;

use super::records::DataResponse;
use crate::{ApiJson, AppError, AppState};
use finesight_core::{receipt, ScannedReceipt};

/// Request body for receipt scanning
#[derive(Debug, Deserialize)]
pub struct ScanReceiptRequest {
    /// Base64 JPEG, optionally as a `data:` URL
    #[serde(default, alias = "imageBase64")]
    pub image_base64: String,
}

/// Decode the image payload, accepting a bare base64 string or a data URL
fn decode_image(payload: &str) -> Result<Vec<u8>, AppError> {
    let encoded = match payload.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload,
    };
    let encoded: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();

    base64::engine::general_purpose::STANDARD
        .decode(encoded.as_bytes())
        .map_err(|_| AppError::bad_request("Invalid base64 image data"))
}

/// POST /api/scan-receipt - Extract expense fields from a receipt photo
pub async fn scan_receipt(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<ScanReceiptRequest>,
) -> Result<Json<DataResponse<ScannedReceipt>>, AppError> {
    let ai = state.ai()?;

    if body.image_base64.trim().is_empty() {
        return Err(AppError::bad_request("Image data required"));
    }
    let image = decode_image(&body.image_base64)?;
    if image.is_empty() {
        return Err(AppError::bad_request("Image data required"));
    }

    info!(bytes = image.len(), "Scanning receipt");

    let scanned = receipt::scan_receipt(ai, &image)
        .await
        .map_err(|e| AppError::internal_with("Failed to scan receipt", e))?;

    Ok(Json(DataResponse { data: scanned }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_and_data_url() {
        assert_eq!(decode_image("aGk=").unwrap(), b"hi");
        assert_eq!(decode_image("data:image/jpeg;base64,aGk=").unwrap(), b"hi");
        assert_eq!(decode_image("aG\nk=").unwrap(), b"hi");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_image("not base64!").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
