//! Normalized result of an AI request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AiError, FailureKind};

/// Token accounting reported by a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A classified failure of a single attempt or of the whole call
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Outcome of [`AiClient::send`](super::AiClient::send)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResponseEnvelope {
    Success {
        payload: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
    Failure {
        kind: FailureKind,
        message: String,
    },
}

impl ResponseEnvelope {
    /// Wrap a completion text, decoding it as JSON when possible
    pub fn from_text(text: &str, usage: Option<Usage>) -> Self {
        ResponseEnvelope::Success {
            payload: decode_payload(text),
            usage,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResponseEnvelope::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ResponseEnvelope::Failure { kind, .. } => Some(*kind),
            ResponseEnvelope::Success { .. } => None,
        }
    }

    /// Split into a `Result`, attributing failures to `provider`
    pub fn into_result(self, provider: &str) -> Result<(Value, Option<Usage>), AiError> {
        match self {
            ResponseEnvelope::Success { payload, usage } => Ok((payload, usage)),
            ResponseEnvelope::Failure { kind, message } => Err(AiError {
                provider: provider.to_string(),
                kind,
                message,
            }),
        }
    }
}

impl From<Failure> for ResponseEnvelope {
    fn from(failure: Failure) -> Self {
        ResponseEnvelope::Failure {
            kind: failure.kind,
            message: failure.message,
        }
    }
}

/// Parse completion text as JSON, falling back to `{"content": text}`
pub fn decode_payload(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::json!({ "content": text }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_payload_json() {
        let payload = decode_payload(r#"{"story":"Once upon a time","wordCount":4}"#);
        assert_eq!(payload["story"], "Once upon a time");
        assert_eq!(payload["wordCount"], 4);
    }

    #[test]
    fn test_decode_payload_falls_back_to_content() {
        let payload = decode_payload("Here are some ideas for your spring wedding.");
        assert_eq!(
            payload,
            serde_json::json!({ "content": "Here are some ideas for your spring wedding." })
        );

        // Truncated JSON is not JSON
        let payload = decode_payload(r#"{"story": "Once"#);
        assert_eq!(payload["content"], r#"{"story": "Once"#);
    }

    #[test]
    fn test_envelope_serialization() {
        let success = ResponseEnvelope::from_text("plain", None);
        let json = serde_json::to_string(&success).unwrap();
        assert!(json.contains(r#""status":"success""#));
        assert!(json.contains(r#""content":"plain""#));
        assert!(!json.contains("usage")); // should be skipped when None

        let failure: ResponseEnvelope =
            Failure::new(FailureKind::QuotaExceeded, "insufficient_quota").into();
        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains(r#""status":"failure""#));
        assert!(json.contains(r#""kind":"quota_exceeded""#));
    }

    #[test]
    fn test_into_result() {
        let failure: ResponseEnvelope = Failure::new(FailureKind::Unauthorized, "HTTP 401").into();
        let err = failure.into_result("DeepSeek").unwrap_err();
        assert_eq!(err.kind, FailureKind::Unauthorized);
        assert_eq!(err.provider, "DeepSeek");
    }
}
