//! # Stripe Error Mapping
//!
//! Turns Stripe error responses and transport failures into `GatewayError`.

use pay_core::GatewayError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    param: Option<String>,
    #[serde(default)]
    decline_code: Option<String>,
}

/// Map a non-2xx response to a typed error.
///
/// The error `type` wins when present; otherwise the HTTP status decides
/// (402 card, 400/404 invalid request, 401 authentication, 429 rate limit).
pub fn from_response(status: u16, body: &str) -> GatewayError {
    let parsed = serde_json::from_str::<StripeErrorResponse>(body).ok();
    let http_status = Some(status);

    let Some(StripeErrorResponse { error }) = parsed else {
        return GatewayError::Api {
            message: format!("HTTP {}: {}", status, body),
            http_status,
        };
    };

    let message = error
        .message
        .unwrap_or_else(|| format!("Stripe returned HTTP {}", status));

    match (error.error_type.as_deref(), status) {
        (Some("card_error"), _) | (None, 402) => GatewayError::Card {
            message,
            param: error.param,
            code: error.code,
            decline_code: error.decline_code,
            http_status,
        },
        (_, 401) | (Some("authentication_error"), _) => GatewayError::Authentication {
            message,
            http_status,
        },
        (_, 429) | (Some("rate_limit_error"), _) => GatewayError::RateLimit {
            message,
            http_status,
        },
        (Some("invalid_request_error"), _) | (None, 400) | (None, 404) => {
            GatewayError::InvalidRequest {
                message,
                param: error.param,
                http_status,
            }
        }
        _ => GatewayError::Api {
            message,
            http_status,
        },
    }
}

/// Transport-level failure (DNS, TLS, timeout, reset)
pub fn from_transport(err: reqwest::Error) -> GatewayError {
    GatewayError::Connection {
        message: err.to_string(),
    }
}
