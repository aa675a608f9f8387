//! DeepSeek chat-completions adapter.

use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};

use super::envelope::Usage;
use super::provider::{ClassificationMarkers, Completion, ProviderAdapter};
use super::{ChatMessage, GenerationParams};

const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
const DEFAULT_MODEL: &str = "deepseek-chat";

static MARKERS: ClassificationMarkers = ClassificationMarkers {
    rate_limit: &["rate_limit", "rate limit"],
    quota: &["quota", "insufficient_quota", "insufficient balance"],
    unauthorized: &["unauthorized", "authentication"],
    safety: &[],
};

/// OpenAI-compatible chat completions at api.deepseek.com
#[derive(Debug, Clone, Copy, Default)]
pub struct DeepSeek;

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl ProviderAdapter for DeepSeek {
    type Body = ChatRequest;

    fn name(&self) -> &'static str {
        "DeepSeek"
    }

    fn default_base_url(&self) -> &'static str {
        DEFAULT_BASE_URL
    }

    fn default_model(&self) -> &'static str {
        DEFAULT_MODEL
    }

    fn placeholder_key(&self) -> &'static str {
        "your_deepseek_api_key_here"
    }

    fn endpoint(&self, base_url: &str, _model: &str) -> String {
        format!("{}/chat/completions", base_url)
    }

    fn authorize(&self, request: RequestBuilder, api_key: &str) -> RequestBuilder {
        request.bearer_auth(api_key)
    }

    fn build_body(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature: params.temperature,
            max_tokens: params.max_output_tokens,
            top_p: params.top_p,
            frequency_penalty: params.frequency_penalty,
            presence_penalty: params.presence_penalty,
            stream: false,
        }
    }

    fn parse_completion(&self, body: &str) -> Result<Completion, String> {
        let response: ChatResponse = serde_json::from_str(body)
            .map_err(|e| format!("Invalid response format from DeepSeek: {}", e))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .ok_or_else(|| "Invalid response format from DeepSeek".to_string())?
            .content
            .filter(|content| !content.is_empty())
            .ok_or_else(|| "No content received from DeepSeek".to_string())?;

        Ok(Completion {
            text,
            usage: response.usage,
        })
    }

    fn error_message(&self, body: &str) -> Option<String> {
        serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .map(|response| response.error.message)
    }

    fn markers(&self) -> &ClassificationMarkers {
        &MARKERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::classify;
    use crate::error::FailureKind;

    #[test]
    fn test_request_body_shape() {
        let messages = vec![
            ChatMessage::system("You are a wedding planner."),
            ChatMessage::user("Plan a rooftop ceremony."),
        ];
        let body = DeepSeek.build_body("deepseek-chat", &messages, &GenerationParams::default());
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "deepseek-chat");
        assert_eq!(json["stream"], false);
        assert_eq!(json["max_tokens"], 2048);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Plan a rooftop ceremony.");
        assert!(json.get("top_k").is_none());
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            DeepSeek.endpoint(DEFAULT_BASE_URL, DEFAULT_MODEL),
            "https://api.deepseek.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{
            "id": "cmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"ok\":true}"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7}
        }"#;
        let completion = DeepSeek.parse_completion(body).unwrap();

        assert_eq!(completion.text, r#"{"ok":true}"#);
        assert_eq!(completion.usage.unwrap().completion_tokens, 4);
    }

    #[test]
    fn test_parse_completion_without_choices() {
        let err = DeepSeek.parse_completion(r#"{"choices": []}"#).unwrap_err();
        assert!(err.contains("Invalid response format"));
        assert_eq!(
            classify(None, &err, DeepSeek.markers()),
            FailureKind::Transient
        );
    }

    #[test]
    fn test_parse_completion_with_empty_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":""}}]}"#;
        let err = DeepSeek.parse_completion(body).unwrap_err();
        assert_eq!(err, "No content received from DeepSeek");
        assert_eq!(
            classify(None, &err, DeepSeek.markers()),
            FailureKind::Transient
        );

        let err = DeepSeek
            .parse_completion(r#"{"choices":[{"message":{"role":"assistant"}}]}"#)
            .unwrap_err();
        assert_eq!(err, "No content received from DeepSeek");
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error":{"message":"Insufficient Balance","type":"unknown_error"}}"#;
        let message = DeepSeek.error_message(body).unwrap();

        assert_eq!(message, "Insufficient Balance");
        assert_eq!(
            classify(Some(402), &message, DeepSeek.markers()),
            FailureKind::QuotaExceeded
        );
        assert!(DeepSeek.error_message("<html>bad gateway</html>").is_none());
    }
}
