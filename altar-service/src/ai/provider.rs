//! Provider adapter seam and failure classification.

use reqwest::RequestBuilder;
use serde::Serialize;

use super::envelope::Usage;
use super::{ChatMessage, GenerationParams};
use crate::error::FailureKind;

/// Completion text extracted from a successful provider response
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
}

/// Lower-cased substrings that identify each failure class in an error
/// message. Matching is case-insensitive.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationMarkers {
    pub rate_limit: &'static [&'static str],
    pub quota: &'static [&'static str],
    pub unauthorized: &'static [&'static str],
    pub safety: &'static [&'static str],
}

/// Wire-level differences between generative-text providers
pub trait ProviderAdapter: Send + Sync {
    type Body: Serialize + Send + Sync;

    /// Display name used in logs and error messages
    fn name(&self) -> &'static str;

    fn default_base_url(&self) -> &'static str;

    fn default_model(&self) -> &'static str;

    /// Credential value shipped in sample env files; treated as unset
    fn placeholder_key(&self) -> &'static str;

    fn defaults(&self) -> GenerationParams {
        GenerationParams::default()
    }

    fn endpoint(&self, base_url: &str, model: &str) -> String;

    fn authorize(&self, request: RequestBuilder, api_key: &str) -> RequestBuilder;

    fn build_body(&self, model: &str, messages: &[ChatMessage], params: &GenerationParams)
    -> Self::Body;

    /// Extract the completion from a 2xx body. `Err` carries a description
    /// that is classified like any other error message.
    fn parse_completion(&self, body: &str) -> Result<Completion, String>;

    /// Pull the provider's error message out of a non-2xx body
    fn error_message(&self, body: &str) -> Option<String>;

    fn markers(&self) -> &ClassificationMarkers;
}

/// Map an HTTP status and error message onto a failure class.
///
/// Precedence: rate limit, quota, authentication, content safety, then
/// everything else as transient.
pub fn classify(
    status: Option<u16>,
    message: &str,
    markers: &ClassificationMarkers,
) -> FailureKind {
    let message = message.to_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|needle| message.contains(needle));

    if status == Some(429) || mentions(markers.rate_limit) {
        FailureKind::RateLimited
    } else if mentions(markers.quota) {
        FailureKind::QuotaExceeded
    } else if status == Some(401) || mentions(markers.unauthorized) {
        FailureKind::Unauthorized
    } else if mentions(markers.safety) {
        FailureKind::ContentBlocked
    } else {
        FailureKind::Transient
    }
}
