// OpenAI binding: chat completions for text and chat, `images/generations`
// for image synthesis.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    send_json, FinishReason, GeneratedImage, GenerationOptions, GenerationRequest,
    GenerationResult, ProviderBinding, ProviderId, Usage,
};
use crate::error::GatewayError;

pub struct OpenAiBinding {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiBinding {
    pub fn new(client: Client, api_key: String, base_url: String) -> Self {
        info!("Using OpenAI API at: {}", base_url);
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

pub(crate) fn chat_payload(request: &GenerationRequest) -> ChatCompletionRequest<'_> {
    ChatCompletionRequest {
        model: &request.model,
        messages: request
            .messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect(),
        max_tokens: request.options.max_tokens(),
        temperature: request.options.temperature(),
    }
}

/// Takes the first choice. A reply with no choices at all is malformed; a
/// choice whose content is null yields empty text.
pub(crate) fn parse_chat_response(
    response: ChatCompletionResponse,
) -> Result<GenerationResult, GatewayError> {
    let usage = response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    let choice = response.choices.into_iter().next().ok_or_else(|| {
        GatewayError::MalformedUpstreamResponse {
            provider: ProviderId::OpenAi,
            message: "response contained no choices".to_string(),
        }
    })?;

    Ok(GenerationResult {
        text: choice.message.content.unwrap_or_default(),
        usage,
        finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_provider),
    })
}

pub(crate) fn image_payload<'a>(
    model: &'a str,
    prompt: &'a str,
    options: &GenerationOptions,
) -> ImageGenerationRequest<'a> {
    ImageGenerationRequest {
        model,
        prompt,
        n: options.n(),
        size: options.size().as_str(),
    }
}

#[async_trait]
impl ProviderBinding for OpenAiBinding {
    fn provider(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResult, GatewayError> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = chat_payload(request);
        debug!("OpenAI chat payload: {:?}", payload);

        let response: ChatCompletionResponse = send_json(
            ProviderId::OpenAi,
            self.client.post(&url).bearer_auth(&self.api_key).json(&payload),
        )
        .await?;

        parse_chat_response(response)
    }

    async fn generate_images(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Vec<GeneratedImage>, GatewayError> {
        let url = format!("{}/images/generations", self.base_url);
        let payload = image_payload(model, prompt, options);
        debug!("OpenAI image payload: {:?}", payload);

        let response: ImageGenerationResponse = send_json(
            ProviderId::OpenAi,
            self.client.post(&url).bearer_auth(&self.api_key).json(&payload),
        )
        .await?;

        Ok(response.data)
    }
}
