//! # Error Classification
//!
//! Maps every `GatewayError` variant onto an `ErrorDetail`, the error shape
//! callers find inside a failure envelope.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error categories surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    CardError,
    InvalidRequest,
    AuthenticationError,
    ConnectionError,
    GenericApiError,
    UnknownError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::CardError => "CardError",
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::AuthenticationError => "AuthenticationError",
            ErrorKind::ConnectionError => "ConnectionError",
            ErrorKind::GenericApiError => "GenericApiError",
            ErrorKind::UnknownError => "UnknownError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error carried by a failure envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Gateway error code, e.g. `card_declined`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Issuer decline reason for card errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decline_code: Option<String>,
}

impl ErrorDetail {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            http_status: None,
            param: None,
            message: None,
            code: None,
            decline_code: None,
        }
    }

    /// Message surfaced at the top level of the envelope. Only card errors
    /// expose theirs; every other kind reports `false`.
    pub fn envelope_message(&self) -> Option<String> {
        match self.kind {
            ErrorKind::CardError => self.message.clone(),
            _ => None,
        }
    }
}

/// Stateless classifier from client failures to `ErrorDetail`
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, error: &GatewayError) -> ErrorDetail {
        let kind = match error {
            GatewayError::Card { .. } => ErrorKind::CardError,
            GatewayError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            GatewayError::Authentication { .. } => ErrorKind::AuthenticationError,
            GatewayError::Connection { .. } => ErrorKind::ConnectionError,
            GatewayError::RateLimit { .. } | GatewayError::Api { .. } => {
                ErrorKind::GenericApiError
            }
            GatewayError::Unexpected { .. } => ErrorKind::UnknownError,
        };

        let message = match error {
            GatewayError::Card { message, .. }
            | GatewayError::InvalidRequest { message, .. }
            | GatewayError::Authentication { message, .. }
            | GatewayError::Connection { message }
            | GatewayError::RateLimit { message, .. }
            | GatewayError::Api { message, .. }
            | GatewayError::Unexpected { message } => message,
        };

        let (code, decline_code) = match error {
            GatewayError::Card {
                code, decline_code, ..
            } => (code.clone(), decline_code.clone()),
            _ => (None, None),
        };

        ErrorDetail {
            kind,
            http_status: error.http_status(),
            param: error.param().map(String::from),
            message: Some(message.clone()).filter(|m| !m.is_empty()),
            code,
            decline_code,
        }
    }
}
