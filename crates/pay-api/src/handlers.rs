//! # Request Handlers
//!
//! Axum request handlers for the payment API.
//! Every operation is reachable by name; the body is the operation payload.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use pay_core::{Operation, PaymentError, ResultEnvelope};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, instrument, warn};

// =============================================================================
// Response Types
// =============================================================================

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Supported operations
#[derive(Debug, Serialize)]
pub struct OperationsResponse {
    pub operations: Vec<&'static str>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn payment_error_to_response(err: PaymentError) -> ApiError {
    let code = err.status_code();
    if code >= 500 {
        error!("Operation rejected: {}", err);
    } else {
        warn!("Operation rejected: {}", err);
    }
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

fn bad_request(message: &str, details: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message, 400).with_details(details)),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "stripe-facade",
        "version": env!("CARGO_PKG_VERSION"),
        "mode": state.facade.config().mode.as_str(),
    }))
}

/// List the operation names accepted by `POST /api/v1/{operation}`
pub async fn list_operations(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.facade.dispatcher().registry();
    let operations = Operation::ALL
        .iter()
        .filter(|op| registry.get(**op).is_some())
        .map(|op| op.as_str())
        .collect();
    Json(OperationsResponse { operations })
}

/// Execute one operation.
///
/// Returns the result envelope with 200 for both `success` and `error`
/// envelopes. Raised errors (unknown operation, missing identifiers) map to
/// 4xx/5xx.
#[instrument(skip(state, body))]
pub async fn execute_operation(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    body: Bytes,
) -> Result<Json<ResultEnvelope>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(bad_request(
            "Missing request body",
            "The payload must be a JSON object, use {} for none",
        ));
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| bad_request("Invalid JSON body", e.to_string()))?;
    if !payload.is_object() {
        return Err(bad_request(
            "Invalid payload",
            "The payload must be a JSON object",
        ));
    }

    let envelope = state
        .facade
        .execute(&operation, payload)
        .await
        .map_err(payment_error_to_response)?;

    Ok(Json(envelope))
}
