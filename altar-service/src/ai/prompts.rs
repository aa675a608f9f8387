//! Wedding-planning tasks expressed as message lists plus per-task settings.

use serde::Deserialize;
use serde_json::Value;
use strum::{AsRefStr, Display};

use super::{ChatMessage, GenerationConfig};

const JSON_ONLY: &str = "You are an assistant for a wedding planning application. \
Answer with a single JSON object that follows the requested shape. \
Do not wrap it in markdown or add commentary.";

const NOT_SPECIFIED: &str = "Not specified";

/// A ready-to-send request for [`AiClient::run`](super::AiClient::run)
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub messages: Vec<ChatMessage>,
    pub config: GenerationConfig,
}

impl Prompt {
    fn new(task: &str, config: GenerationConfig) -> Self {
        Self {
            messages: vec![ChatMessage::system(JSON_ONLY), ChatMessage::user(task)],
            config,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StoryStyle {
    Romantic,
    Casual,
    Formal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoupleInfo {
    pub names: String,
    pub style: StoryStyle,
    pub wedding_date: Option<String>,
    pub venue: Option<String>,
    pub additional_info: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionBoardPreferences {
    pub aesthetic: String,
    pub venue: String,
    #[serde(default)]
    pub colors: Vec<String>,
    pub season: String,
    pub must_have: Option<String>,
    pub avoid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub name: Option<String>,
    pub wedding_date: Option<String>,
    pub style_profile: Option<Value>,
    pub recent_activity: Option<String>,
}

fn or_unset(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NOT_SPECIFIED)
}

pub fn wedding_story(couple: &CoupleInfo) -> Prompt {
    let task = format!(
        "Write a {style} story of roughly 150 to 200 words for a couple's wedding website.\n\
         \n\
         Couple: {names}\n\
         Wedding date: {date}\n\
         Venue: {venue}\n\
         Other details: {extra}\n\
         \n\
         Respond with:\n\
         {{\"story\": string, \"style\": \"{style}\", \"wordCount\": number, \"suggestions\": [three short strings]}}",
        style = couple.style,
        names = couple.names,
        date = or_unset(&couple.wedding_date),
        venue = or_unset(&couple.venue),
        extra = couple.additional_info.as_deref().unwrap_or("None"),
    );

    Prompt::new(
        &task,
        GenerationConfig::default()
            .with_temperature(0.9)
            .with_max_output_tokens(1024),
    )
}

pub fn vision_board(preferences: &VisionBoardPreferences) -> Prompt {
    let task = format!(
        "Put together vision board ideas for a wedding.\n\
         \n\
         Aesthetic: {aesthetic}\n\
         Venue type: {venue}\n\
         Colors: {colors}\n\
         Season: {season}\n\
         Must include: {must_have}\n\
         Avoid: {avoid}\n\
         \n\
         Respond with:\n\
         {{\"moodDescription\": string, \"colorPalette\": [five hex colors], \"keywords\": [five strings], \
         \"decorElements\": [five strings], \"flowerSuggestions\": [three strings], \
         \"venueFeatures\": [three strings], \"lightingIdeas\": [three strings], \
         \"textileTextures\": [three strings]}}",
        aesthetic = preferences.aesthetic,
        venue = preferences.venue,
        colors = preferences.colors.join(", "),
        season = preferences.season,
        must_have = or_unset(&preferences.must_have),
        avoid = or_unset(&preferences.avoid),
    );

    Prompt::new(
        &task,
        GenerationConfig::default()
            .with_temperature(0.8)
            .with_max_output_tokens(1536),
    )
}

pub fn image_analysis(description: &str) -> Prompt {
    let task = format!(
        "Study this description of a wedding photo and break down its style.\n\
         \n\
         Description: {description}\n\
         \n\
         Respond with an object containing:\n\
         - overallStyle: {{aesthetic, keywords[], mood, colorScheme[]}}\n\
         - weddingDress: {{silhouette, neckline, fabric, embellishments[], styleCategory}}\n\
         - florals: {{mainFlowers[], colorPalette[], arrangementStyle, season}}\n\
         - venue: {{settingType, keyFeatures[], lighting, searchTerms[]}}"
    );

    Prompt::new(
        &task,
        GenerationConfig::default()
            .with_temperature(0.7)
            .with_max_output_tokens(2048),
    )
}

pub fn chat_reply(message: &str, context: &UserContext) -> Prompt {
    let style_profile = context
        .style_profile
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_else(|| NOT_SPECIFIED.to_string());

    let task = format!(
        "Act as a friendly wedding planning assistant and give practical, personal advice.\n\
         \n\
         Message: {message:?}\n\
         \n\
         About the user:\n\
         - Name: {name}\n\
         - Wedding date: {date}\n\
         - Style profile: {style_profile}\n\
         - Recent activity: {activity}\n\
         \n\
         Respond with:\n\
         {{\"response\": string, \"suggestions\": [two actionable strings], \
         \"relatedTopics\": [three strings], \"confidence\": number between 0 and 1}}",
        name = or_unset(&context.name),
        date = or_unset(&context.wedding_date),
        activity = or_unset(&context.recent_activity),
    );

    Prompt::new(
        &task,
        GenerationConfig::default()
            .with_temperature(0.8)
            .with_max_output_tokens(1024),
    )
}

/// Minimal round trip used to verify credentials and connectivity
pub fn connection_test() -> Prompt {
    let task = format!(
        "Reply with {{\"status\": \"connected\", \"message\": string, \"timestamp\": \"{}\"}}",
        chrono::Utc::now().to_rfc3339()
    );
    Prompt::new(&task, GenerationConfig::default())
}
