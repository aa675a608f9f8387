use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::envelope::{Failure, ResponseEnvelope};
use super::prompts::Prompt;
use super::provider::{Completion, ProviderAdapter, classify};
use super::retry::{RetryDecision, RetryPolicy};
use super::{ChatMessage, GenerationConfig};
use crate::config::{ProviderConfig, RetryConfig};
use crate::error::{FailureKind, ServiceError, ServiceResult};

/// Generative-text client with classification and bounded retry
pub struct AiClient<P: ProviderAdapter> {
    client: Client,
    adapter: P,
    api_key: Option<String>,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

/// Readiness snapshot reported by the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub provider: &'static str,
    pub initialized: bool,
    pub has_api_key: bool,
    pub endpoint: String,
    pub model: String,
    pub base_delay_ms: u64,
    pub max_retries: u32,
}

impl<P: ProviderAdapter> AiClient<P> {
    /// Create a new client. A missing or placeholder credential leaves the
    /// client uninitialized; every `send` then fails with `NotInitialized`.
    pub fn new(adapter: P, config: &ProviderConfig, retry: &RetryConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to create HTTP client for {}: {}", adapter.name(), e),
            })?;

        let api_key = usable_key(&adapter, config.api_key.as_deref());
        if api_key.is_some() {
            info!(provider = adapter.name(), "AI provider initialized");
        }

        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| adapter.default_base_url().to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| adapter.default_model().to_string()),
            adapter,
            api_key,
            retry: RetryPolicy::from(retry),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.adapter.name()
    }

    pub fn is_ready(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn status(&self) -> ProviderStatus {
        ProviderStatus {
            provider: self.adapter.name(),
            initialized: self.is_ready(),
            has_api_key: self.api_key.is_some(),
            endpoint: self.adapter.endpoint(&self.base_url, &self.model),
            model: self.model.clone(),
            base_delay_ms: self.retry.base_delay.as_millis() as u64,
            max_retries: self.retry.max_retries,
        }
    }

    /// Send one logical request, retrying transient failures internally.
    ///
    /// Always resolves to a single terminal envelope; intermediate attempts
    /// are never visible to the caller.
    pub async fn send(&self, messages: &[ChatMessage], config: &GenerationConfig) -> ResponseEnvelope {
        let Some(api_key) = self.api_key.as_deref() else {
            return Failure::new(
                FailureKind::NotInitialized,
                format!("{} API not properly initialized", self.adapter.name()),
            )
            .into();
        };

        if messages.is_empty() {
            return Failure::new(
                FailureKind::InvalidRequest,
                "Request must contain at least one message",
            )
            .into();
        }

        let params = config.resolve(&self.adapter.defaults());
        let body = self.adapter.build_body(&self.model, messages, &params);
        let url = self.adapter.endpoint(&self.base_url, &self.model);

        let mut retries = 0;
        loop {
            let failure = match self.attempt(&url, api_key, &body).await {
                Ok(completion) => {
                    debug!(
                        provider = self.adapter.name(),
                        attempts = retries + 1,
                        "AI request succeeded"
                    );
                    return ResponseEnvelope::from_text(&completion.text, completion.usage);
                }
                Err(failure) => failure,
            };

            warn!(
                provider = self.adapter.name(),
                attempt = retries + 1,
                kind = %failure.kind,
                error = %failure.message,
                "AI request failed"
            );

            match self.retry.decide(failure.kind, retries + 1) {
                RetryDecision::Retry(delay) => {
                    retries += 1;
                    info!(
                        provider = self.adapter.name(),
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying AI request"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DontRetry => return failure.into(),
            }
        }
    }

    pub async fn run(&self, prompt: &Prompt) -> ResponseEnvelope {
        self.send(&prompt.messages, &prompt.config).await
    }

    async fn attempt(
        &self,
        url: &str,
        api_key: &str,
        body: &P::Body,
    ) -> Result<Completion, Failure> {
        let request = self.adapter.authorize(self.client.post(url).json(body), api_key);

        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("Request to {} timed out", self.adapter.name())
            } else {
                e.to_string()
            };
            self.classified(None, message)
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.classified(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            let message = self
                .adapter
                .error_message(&text)
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(self.classified(Some(status.as_u16()), message));
        }

        self.adapter
            .parse_completion(&text)
            .map_err(|message| self.classified(None, message))
    }

    fn classified(&self, status: Option<u16>, message: String) -> Failure {
        let kind = classify(status, &message, self.adapter.markers());
        Failure::new(kind, message)
    }
}

/// Treat missing, blank and placeholder credentials as absent
fn usable_key<P: ProviderAdapter>(adapter: &P, key: Option<&str>) -> Option<String> {
    match key.map(str::trim) {
        None | Some("") => {
            warn!(
                provider = adapter.name(),
                "API key not configured; provider disabled"
            );
            None
        }
        Some(key) if key == adapter.placeholder_key() => {
            warn!(
                provider = adapter.name(),
                "API key is still the placeholder value; provider disabled"
            );
            None
        }
        Some(key) => Some(key.to_string()),
    }
}
