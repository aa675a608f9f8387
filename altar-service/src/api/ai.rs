//! Wedding-planning AI endpoints.
//!
//! Every handler builds a [`Prompt`] and runs it on the provider named in the
//! path. Success returns the envelope as-is; a classified failure becomes a
//! localized error response.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;
use strum::{Display, EnumString};

use crate::ai::prompts::{self, CoupleInfo, Prompt, UserContext, VisionBoardPreferences};
use crate::ai::ResponseEnvelope;
use crate::error::{AiError, I18nError, ServiceError};

use super::AppState;

/// Provider segment of `/api/ai/{provider}/...`
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    DeepSeek,
}

#[derive(Deserialize)]
pub struct ImageAnalysisRequest {
    pub description: String,
}

#[derive(Deserialize)]
pub struct ChatReplyRequest {
    pub message: String,
    #[serde(default)]
    pub context: UserContext,
}

pub async fn story_handler(
    Path(provider): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(couple): Json<CoupleInfo>,
) -> Result<Json<ResponseEnvelope>, I18nError> {
    run_on(&state, &provider, prompts::wedding_story(&couple)).await
}

pub async fn vision_board_handler(
    Path(provider): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(preferences): Json<VisionBoardPreferences>,
) -> Result<Json<ResponseEnvelope>, I18nError> {
    run_on(&state, &provider, prompts::vision_board(&preferences)).await
}

pub async fn image_analysis_handler(
    Path(provider): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImageAnalysisRequest>,
) -> Result<Json<ResponseEnvelope>, I18nError> {
    let description = non_blank(&state, "description", &request.description)?;
    run_on(&state, &provider, prompts::image_analysis(description)).await
}

pub async fn chat_handler(
    Path(provider): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatReplyRequest>,
) -> Result<Json<ResponseEnvelope>, I18nError> {
    let message = non_blank(&state, "message", &request.message)?;
    run_on(&state, &provider, prompts::chat_reply(message, &request.context)).await
}

/// Round trip that checks credentials and connectivity
pub async fn test_handler(
    Path(provider): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResponseEnvelope>, I18nError> {
    run_on(&state, &provider, prompts::connection_test()).await
}

fn non_blank<'a>(state: &AppState, field: &str, value: &'a str) -> Result<&'a str, I18nError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(state.i18n_error(ServiceError::InvalidRequest {
            message: format!("{} must not be empty", field),
        }));
    }
    Ok(trimmed)
}

async fn run_on(
    state: &AppState,
    provider: &str,
    prompt: Prompt,
) -> Result<Json<ResponseEnvelope>, I18nError> {
    let kind: ProviderKind = provider.parse().map_err(|_| {
        state.i18n_error(ServiceError::UnknownProvider {
            provider: provider.to_string(),
        })
    })?;

    let (name, envelope) = match kind {
        ProviderKind::Gemini => (state.gemini.provider_name(), state.gemini.run(&prompt).await),
        ProviderKind::DeepSeek => (
            state.deepseek.provider_name(),
            state.deepseek.run(&prompt).await,
        ),
    };

    match envelope {
        ResponseEnvelope::Failure { kind, message } => Err(state.i18n_error(
            AiError {
                provider: name.to_string(),
                kind,
                message,
            }
            .into(),
        )),
        success => Ok(Json(success)),
    }
}
