//! Google Gemini `generateContent` adapter.

use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};

use super::envelope::Usage;
use super::provider::{ClassificationMarkers, Completion, ProviderAdapter};
use super::{ChatMessage, GenerationParams, Role};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

static MARKERS: ClassificationMarkers = ClassificationMarkers {
    rate_limit: &["rate limit", "rate_limit"],
    quota: &["quota", "quota_exceeded"],
    unauthorized: &["unauthorized", "unauthenticated", "api key not valid"],
    safety: &["safety", "blocklist", "prohibited_content"],
};

/// Gemini models served from generativelanguage.googleapis.com
#[derive(Debug, Clone, Copy, Default)]
pub struct Gemini;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: WireGenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

impl From<UsageMetadata> for Usage {
    fn from(meta: UsageMetadata) -> Self {
        Usage {
            prompt_tokens: meta.prompt_token_count,
            completion_tokens: meta.candidates_token_count,
            total_tokens: meta.total_token_count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    status: Option<String>,
}

/// Gemini calls the assistant "model"
fn to_gemini_role(role: Role) -> &'static str {
    match role {
        Role::Assistant => "model",
        Role::User | Role::System => "user",
    }
}

impl ProviderAdapter for Gemini {
    type Body = GenerateContentRequest;

    fn name(&self) -> &'static str {
        "Gemini"
    }

    fn default_base_url(&self) -> &'static str {
        DEFAULT_BASE_URL
    }

    fn default_model(&self) -> &'static str {
        DEFAULT_MODEL
    }

    fn placeholder_key(&self) -> &'static str {
        "your_gemini_api_key_here"
    }

    fn endpoint(&self, base_url: &str, model: &str) -> String {
        format!("{}/models/{}:generateContent", base_url, model)
    }

    fn authorize(&self, request: RequestBuilder, api_key: &str) -> RequestBuilder {
        request.header("x-goog-api-key", api_key)
    }

    fn build_body(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> GenerateContentRequest {
        let system: Vec<Part> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| Part {
                text: m.content.clone(),
            })
            .collect();

        let mut contents: Vec<Content> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| Content {
                role: Some(to_gemini_role(m.role)),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();

        // Gemini rejects an empty `contents`; system-only input becomes the user turn
        let system_instruction = if contents.is_empty() {
            contents.push(Content {
                role: Some(to_gemini_role(Role::User)),
                parts: system,
            });
            None
        } else {
            (!system.is_empty()).then_some(Content {
                role: None,
                parts: system,
            })
        };

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: WireGenerationConfig {
                temperature: params.temperature,
                top_k: params.top_k,
                top_p: params.top_p,
                max_output_tokens: params.max_output_tokens,
                response_mime_type: "application/json",
            },
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        }
    }

    fn parse_completion(&self, body: &str) -> Result<Completion, String> {
        let response: GenerateContentResponse = serde_json::from_str(body)
            .map_err(|e| format!("Invalid response format from Gemini: {}", e))?;

        if let Some(reason) = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            return Err(format!("Response blocked: {}", reason));
        }

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| "No content received from Gemini".to_string())?;

        let text: String = candidate
            .content
            .map(|content| content.parts.into_iter().map(|part| part.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(match candidate.finish_reason.as_deref() {
                Some("SAFETY") => "Response blocked: SAFETY".to_string(),
                _ => "No content received from Gemini".to_string(),
            });
        }

        Ok(Completion {
            text,
            usage: response.usage_metadata.map(Usage::from),
        })
    }

    fn error_message(&self, body: &str) -> Option<String> {
        let response: ErrorResponse = serde_json::from_str(body).ok()?;
        Some(match response.error.status {
            Some(status) => format!("{}: {}", status, response.error.message),
            None => response.error.message,
        })
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
            ChatMessage::system("Return JSON only."),
            ChatMessage::user("Describe a garden venue."),
            ChatMessage::assistant("{\"venue\":\"garden\"}"),
            ChatMessage::user("Make it autumn."),
        ];
        let body = Gemini.build_body(DEFAULT_MODEL, &messages, &GenerationParams::default());
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Return JSON only.");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"].as_array().unwrap().len(), 3);
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "Make it autumn.");
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(json["safetySettings"][0]["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
    }

    #[test]
    fn test_request_without_system_instruction() {
        let body = Gemini.build_body(
            DEFAULT_MODEL,
            &[ChatMessage::user("Hello")],
            &GenerationParams::default(),
        );
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_system_only_request_becomes_user_turn() {
        let body = Gemini.build_body(
            DEFAULT_MODEL,
            &[ChatMessage::system("List three spring flowers as JSON.")],
            &GenerationParams::default(),
        );
        let json = serde_json::to_value(&body).unwrap();

        assert!(json.get("systemInstruction").is_none());
        assert_eq!(json["contents"].as_array().unwrap().len(), 1);
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(
            json["contents"][0]["parts"][0]["text"],
            "List three spring flowers as JSON."
        );
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            Gemini.endpoint(DEFAULT_BASE_URL, DEFAULT_MODEL),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_parse_completion_joins_parts() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"story\":"}, {"text": "\"ok\"}"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
        }"#;
        let completion = Gemini.parse_completion(body).unwrap();

        assert_eq!(completion.text, r#"{"story":"ok"}"#);
        assert_eq!(
            completion.usage,
            Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            })
        );
    }

    #[test]
    fn test_parse_completion_blocked() {
        let prompt_blocked = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = Gemini.parse_completion(prompt_blocked).unwrap_err();
        assert_eq!(
            classify(None, &err, Gemini.markers()),
            FailureKind::ContentBlocked
        );

        let candidate_blocked = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let err = Gemini.parse_completion(candidate_blocked).unwrap_err();
        assert_eq!(
            classify(None, &err, Gemini.markers()),
            FailureKind::ContentBlocked
        );
    }

    #[test]
    fn test_parse_completion_empty() {
        let err = Gemini.parse_completion(r#"{"candidates": []}"#).unwrap_err();
        assert_eq!(err, "No content received from Gemini");
        assert_eq!(
            classify(None, &err, Gemini.markers()),
            FailureKind::Transient
        );
    }

    #[test]
    fn test_error_message_classification() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        let message = Gemini.error_message(body).unwrap();
        assert!(message.starts_with("INVALID_ARGUMENT: "));
        assert_eq!(
            classify(Some(400), &message, Gemini.markers()),
            FailureKind::Unauthorized
        );

        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota).","status":"RESOURCE_EXHAUSTED"}}"#;
        let message = Gemini.error_message(body).unwrap();
        assert_eq!(
            classify(Some(429), &message, Gemini.markers()),
            FailureKind::RateLimited
        );
        assert_eq!(
            classify(Some(403), &message, Gemini.markers()),
            FailureKind::QuotaExceeded
        );
    }
}
