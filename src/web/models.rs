use serde::{Deserialize, Serialize};

use crate::model::{Conversation, FinishReason, GeneratedImage, Message, Usage};

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation: Option<Vec<Message>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatPayload {
    pub response: String,
    pub conversation: Conversation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// The subset of a chat envelope the browser session reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatReply {
    pub success: bool,
    pub response: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TextCompletionRequest {
    pub prompt: String,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TextPayload {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub size: Option<String>,
    pub n: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ImagesPayload {
    pub images: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct GeneratedTextPayload {
    pub generated_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiChatRequest {
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct GeminiChatPayload {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct AnalysisPayload {
    pub analysis: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageAnalysisRequest {
    pub image_url: String,
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageAnalysisPayload {
    pub image_analysis: String,
}
