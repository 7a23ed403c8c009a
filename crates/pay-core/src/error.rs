//! # Error Types
//!
//! Two error channels live here:
//!
//! - `PaymentError` is *raised* to the caller. It covers programming and
//!   configuration mistakes (missing key, unknown operation, absent payload,
//!   missing identifier) and is never wrapped in a `ResultEnvelope`.
//! - `GatewayError` is what a `PaymentGateway` implementation fails with.
//!   The dispatcher absorbs it, classifies it and returns a failure envelope.

use thiserror::Error;

/// Errors raised before any remote call is attempted
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing key, empty operation name, absent payload)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid arguments passed to a facade method
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A routing identifier required by the operation is absent or empty
    #[error("Missing required parameter `{param}` for operation {operation}")]
    MissingParameter { operation: String, param: String },

    /// Operation name not present in the registry
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
}

impl PaymentError {
    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::MissingParameter { .. } => 400,
            PaymentError::UnknownOperation(_) => 404,
        }
    }
}

/// Result type alias for raised errors
pub type PaymentResult<T> = Result<T, PaymentError>;

/// Failures reported by the remote payment gateway client.
///
/// Every variant the client can produce is listed here, so the classifier
/// matches exhaustively.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The card was declined or is otherwise unusable
    #[error("Card error: {message}")]
    Card {
        message: String,
        param: Option<String>,
        code: Option<String>,
        decline_code: Option<String>,
        http_status: Option<u16>,
    },

    /// Malformed request, unknown parameter or missing resource
    #[error("Invalid request: {message}")]
    InvalidRequest {
        message: String,
        param: Option<String>,
        http_status: Option<u16>,
    },

    /// Missing, revoked or wrong-mode API key
    #[error("Authentication failed: {message}")]
    Authentication {
        message: String,
        http_status: Option<u16>,
    },

    /// The gateway could not be reached
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Too many requests hit the gateway
    #[error("Rate limited: {message}")]
    RateLimit {
        message: String,
        http_status: Option<u16>,
    },

    /// Any other error the gateway reported
    #[error("Gateway API error: {message}")]
    Api {
        message: String,
        http_status: Option<u16>,
    },

    /// Failures with no gateway meaning (unexpected response shape, broken
    /// routing state)
    #[error("Unexpected error: {message}")]
    Unexpected { message: String },
}

impl GatewayError {
    /// Shorthand for an `Unexpected` failure
    pub fn unexpected(message: impl Into<String>) -> Self {
        GatewayError::Unexpected {
            message: message.into(),
        }
    }

    /// HTTP status exposed by the failure, if any
    pub fn http_status(&self) -> Option<u16> {
        match self {
            GatewayError::Card { http_status, .. }
            | GatewayError::InvalidRequest { http_status, .. }
            | GatewayError::Authentication { http_status, .. }
            | GatewayError::RateLimit { http_status, .. }
            | GatewayError::Api { http_status, .. } => *http_status,
            GatewayError::Connection { .. } | GatewayError::Unexpected { .. } => None,
        }
    }

    /// Offending request parameter exposed by the failure, if any
    pub fn param(&self) -> Option<&str> {
        match self {
            GatewayError::Card { param, .. } | GatewayError::InvalidRequest { param, .. } => {
                param.as_deref()
            }
            _ => None,
        }
    }
}

/// Result type alias for gateway calls
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PaymentError::InvalidRequest("test".into()).status_code(),
            400
        );
        assert_eq!(
            PaymentError::UnknownOperation("refundEverything".into()).status_code(),
            404
        );
        assert_eq!(
            PaymentError::Configuration("no key".into()).status_code(),
            500
        );
    }

    #[test]
    fn test_missing_parameter_message() {
        let err = PaymentError::MissingParameter {
            operation: "retrieveCharge".into(),
            param: "charge_id".into(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required parameter `charge_id` for operation retrieveCharge"
        );
    }

    #[test]
    fn test_gateway_error_accessors() {
        let err = GatewayError::InvalidRequest {
            message: "No such charge".into(),
            param: Some("id".into()),
            http_status: Some(404),
        };
        assert_eq!(err.http_status(), Some(404));
        assert_eq!(err.param(), Some("id"));

        let err = GatewayError::Connection {
            message: "timed out".into(),
        };
        assert_eq!(err.http_status(), None);
        assert_eq!(err.param(), None);
    }
}
