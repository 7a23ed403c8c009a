//! # Result Envelope
//!
//! The uniform return contract of every operation:
//!
//! ```json
//! {"status": "success", "message": "Success", "response": {...}}
//! {"status": "error",   "message": false,     "response": {"kind": "InvalidRequest", ...}}
//! ```
//!
//! Callers must check `status` before reading `response`: its shape differs
//! between the two tags.

use crate::classify::ErrorDetail;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Message carried by every success envelope
pub const SUCCESS_MESSAGE: &str = "Success";

/// Outcome of one operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status")]
pub enum ResultEnvelope {
    /// `response` is a flattened object or an array of flattened objects
    #[serde(rename = "success")]
    Success { message: String, response: Value },

    /// `message` is the card-error message, or `false` for every other kind
    #[serde(rename = "error")]
    Failure {
        #[serde(serialize_with = "message_or_false")]
        message: Option<String>,
        response: ErrorDetail,
    },
}

impl ResultEnvelope {
    pub fn success(response: Value) -> Self {
        ResultEnvelope::Success {
            message: SUCCESS_MESSAGE.to_string(),
            response,
        }
    }

    pub fn failure(detail: ErrorDetail) -> Self {
        ResultEnvelope::Failure {
            message: detail.envelope_message(),
            response: detail,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResultEnvelope::Success { .. })
    }

    /// `"success"` or `"error"`
    pub fn status(&self) -> &'static str {
        match self {
            ResultEnvelope::Success { .. } => "success",
            ResultEnvelope::Failure { .. } => "error",
        }
    }

    /// Success payload, if any
    pub fn response(&self) -> Option<&Value> {
        match self {
            ResultEnvelope::Success { response, .. } => Some(response),
            ResultEnvelope::Failure { .. } => None,
        }
    }

    /// Error detail, if any
    pub fn error(&self) -> Option<&ErrorDetail> {
        match self {
            ResultEnvelope::Success { .. } => None,
            ResultEnvelope::Failure { response, .. } => Some(response),
        }
    }

    pub fn into_result(self) -> Result<Value, ErrorDetail> {
        match self {
            ResultEnvelope::Success { response, .. } => Ok(response),
            ResultEnvelope::Failure { response, .. } => Err(response),
        }
    }
}

fn message_or_false<S>(message: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match message {
        Some(text) => serializer.serialize_str(text),
        None => serializer.serialize_bool(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let envelope = ResultEnvelope::success(json!({"id": "ch_1"}));
        assert!(envelope.is_success());
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"status": "success", "message": "Success", "response": {"id": "ch_1"}})
        );
    }

    #[test]
    fn test_failure_message_false() {
        let mut detail = ErrorDetail::new(ErrorKind::InvalidRequest);
        detail.message = Some("No such plan".into());
        detail.http_status = Some(404);

        let envelope = ResultEnvelope::failure(detail);
        assert_eq!(envelope.status(), "error");
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "status": "error",
                "message": false,
                "response": {"kind": "InvalidRequest", "http_status": 404, "message": "No such plan"}
            })
        );
    }

    #[test]
    fn test_card_failure_surfaces_message() {
        let mut detail = ErrorDetail::new(ErrorKind::CardError);
        detail.message = Some("Your card was declined.".into());

        let json = serde_json::to_value(ResultEnvelope::failure(detail)).unwrap();
        assert_eq!(json["message"], json!("Your card was declined."));
        assert_eq!(json["response"]["kind"], json!("CardError"));
    }

    #[test]
    fn test_into_result() {
        let ok = ResultEnvelope::success(json!([1, 2]));
        assert_eq!(ok.into_result().unwrap(), json!([1, 2]));

        let err = ResultEnvelope::failure(ErrorDetail::new(ErrorKind::UnknownError));
        assert_eq!(err.into_result().unwrap_err().kind, ErrorKind::UnknownError);
    }
}
