pub mod gemini;
pub mod openai;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::GatewayError;

use self::gemini::{GeminiBinding, ImageFetchPolicy};
use self::openai::OpenAiBinding;

pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const MAX_IMAGES_PER_REQUEST: u32 = 4;

pub const OPENAI_CHAT_MODELS: &[&str] = &[
    "gpt-4o-mini",
    "gpt-4o",
    "gpt-3.5-turbo",
    "gpt-4",
    "gpt-4-turbo-preview",
];
pub const OPENAI_IMAGE_MODELS: &[&str] = &["dall-e-2", "dall-e-3"];
pub const GEMINI_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-1.5-pro", "gemini-1.5-flash"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// One turn of a conversation. History sent by the browser carries no
/// timestamp, so a missing one is filled with the time of arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

pub type Conversation = Vec<Message>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "256x256")]
    Small,
    #[serde(rename = "512x512")]
    Medium,
    #[serde(rename = "1024x1024")]
    #[default]
    Large,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Small => "256x256",
            ImageSize::Medium => "512x512",
            ImageSize::Large => "1024x1024",
        }
    }
}

impl FromStr for ImageSize {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "256x256" => Ok(ImageSize::Small),
            "512x512" => Ok(ImageSize::Medium),
            "1024x1024" => Ok(ImageSize::Large),
            other => Err(GatewayError::invalid_input(format!(
                "unsupported image size '{}', expected one of 256x256, 512x512, 1024x1024",
                other
            ))),
        }
    }
}

/// Generation knobs. Every field is optional; the accessors apply the
/// documented defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub image_refs: Vec<String>,
    pub size: Option<ImageSize>,
    pub n: Option<u32>,
}

impl GenerationOptions {
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn size(&self) -> ImageSize {
        self.size.unwrap_or_default()
    }

    pub fn n(&self) -> u32 {
        self.n.unwrap_or(1)
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.max_tokens == Some(0) {
            return Err(GatewayError::invalid_input("max_tokens must be greater than 0"));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(GatewayError::invalid_input(format!(
                    "temperature {} is outside [0, 2]",
                    t
                )));
            }
        }
        if let Some(n) = self.n {
            if !(1..=MAX_IMAGES_PER_REQUEST).contains(&n) {
                return Err(GatewayError::invalid_input(format!(
                    "n must be between 1 and {}",
                    MAX_IMAGES_PER_REQUEST
                )));
            }
        }
        if let Some(bad) = self.image_refs.iter().find(|r| !looks_like_url(r)) {
            return Err(GatewayError::invalid_input(format!(
                "image reference '{}' is not an http(s) URL",
                bad
            )));
        }
        Ok(())
    }
}

fn looks_like_url(s: &str) -> bool {
    (s.starts_with("http://") || s.starts_with("https://")) && !s.contains(char::is_whitespace)
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub messages: Conversation,
    pub model: String,
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn new(messages: Conversation, model: impl Into<String>) -> Self {
        Self {
            messages,
            model: model.into(),
            options: GenerationOptions::default(),
        }
    }

    /// Single user turn, as used by the prompt-style endpoints.
    pub fn from_prompt(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(vec![Message::user(prompt)], model)
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Other,
}

impl FinishReason {
    /// Normalizes the finish reasons of both providers.
    pub fn from_provider(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "stop" => FinishReason::Stop,
            "length" | "max_tokens" => FinishReason::Length,
            "content_filter" | "safety" | "recitation" | "blocklist" | "prohibited_content" => {
                FinishReason::ContentFilter
            }
            "tool_calls" | "function_call" => FinishReason::ToolCalls,
            _ => FinishReason::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl GenerationResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
            finish_reason: None,
        }
    }
}

/// One entry of an image-generation response, passed through as returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenAi,
    Gemini,
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderId::OpenAi => write!(f, "OpenAI"),
            ProviderId::Gemini => write!(f, "Gemini"),
        }
    }
}

/// What a provider/model pair is able to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    TextChat,
    Multimodal,
    Image,
}

pub fn select_binding(provider: ProviderId, model: &str) -> Result<BindingKind, GatewayError> {
    match provider {
        ProviderId::OpenAi if OPENAI_CHAT_MODELS.contains(&model) => Ok(BindingKind::TextChat),
        ProviderId::OpenAi if OPENAI_IMAGE_MODELS.contains(&model) => Ok(BindingKind::Image),
        ProviderId::Gemini if GEMINI_MODELS.contains(&model) => Ok(BindingKind::Multimodal),
        _ => Err(GatewayError::UnsupportedModel {
            provider,
            model: model.to_string(),
        }),
    }
}

/// Per-provider adapter. Implementations translate to and from the
/// provider's wire format and keep no state between calls.
#[async_trait]
pub trait ProviderBinding: Send + Sync {
    fn provider(&self) -> ProviderId;

    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResult, GatewayError>;

    async fn generate_images(
        &self,
        model: &str,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<Vec<GeneratedImage>, GatewayError> {
        Err(GatewayError::UnsupportedModel {
            provider: self.provider(),
            model: model.to_string(),
        })
    }
}

/// Entry point for every outbound model call. Built once at start and
/// shared by reference with the request handlers.
pub struct Gateway {
    openai: Arc<dyn ProviderBinding>,
    gemini: Arc<dyn ProviderBinding>,
}

impl Gateway {
    pub fn new(config: &Config) -> Result<Self> {
        info!(
            "Initializing provider gateway (timeout: {}s)",
            config.request_timeout.as_secs()
        );

        let client = Client::builder().timeout(config.request_timeout).build()?;

        // User-supplied image URLs get their own client so redirects are re-checked
        let image_policy = ImageFetchPolicy {
            max_bytes: config.max_image_bytes,
            allow_private_hosts: config.allow_private_image_hosts,
        };
        let image_client = Client::builder()
            .timeout(config.request_timeout)
            .redirect(image_policy.redirect_policy())
            .build()?;

        let openai = OpenAiBinding::new(
            client.clone(),
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
        );
        let gemini = GeminiBinding::new(
            client,
            config.gemini_api_key.clone(),
            config.gemini_base_url.clone(),
        )
        .with_image_fetching(image_client, image_policy);

        Ok(Self::with_bindings(Arc::new(openai), Arc::new(gemini)))
    }

    pub fn with_bindings(openai: Arc<dyn ProviderBinding>, gemini: Arc<dyn ProviderBinding>) -> Self {
        Self { openai, gemini }
    }

    fn binding(&self, provider: ProviderId) -> &dyn ProviderBinding {
        match provider {
            ProviderId::OpenAi => self.openai.as_ref(),
            ProviderId::Gemini => self.gemini.as_ref(),
        }
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        provider: ProviderId,
    ) -> Result<GenerationResult, GatewayError> {
        if request.messages.is_empty() {
            return Err(GatewayError::invalid_input("at least one message is required"));
        }

        let kind = select_binding(provider, &request.model)?;
        if kind == BindingKind::Image {
            return Err(GatewayError::UnsupportedModel {
                provider,
                model: request.model.clone(),
            });
        }

        request.options.validate()?;
        if !request.options.image_refs.is_empty() && kind != BindingKind::Multimodal {
            return Err(GatewayError::invalid_input(format!(
                "model '{}' does not accept image inputs",
                request.model
            )));
        }

        info!(
            "Dispatching {} messages to {} ({})",
            request.messages.len(),
            provider,
            request.model
        );

        match self.binding(provider).complete(request).await {
            Ok(result) => {
                info!(
                    "{} response length: {} characters",
                    provider,
                    result.text.chars().count()
                );
                Ok(result)
            }
            Err(e) => {
                error!("{} generation failed: {}", provider, e);
                Err(e)
            }
        }
    }

    pub async fn generate_images(
        &self,
        prompt: &str,
        model: &str,
        options: &GenerationOptions,
        provider: ProviderId,
    ) -> Result<Vec<GeneratedImage>, GatewayError> {
        if prompt.trim().is_empty() {
            return Err(GatewayError::invalid_input("prompt must not be empty"));
        }
        if select_binding(provider, model)? != BindingKind::Image {
            return Err(GatewayError::UnsupportedModel {
                provider,
                model: model.to_string(),
            });
        }
        options.validate()?;

        info!(
            "Requesting {} image(s) of {} from {} ({})",
            options.n(),
            options.size().as_str(),
            provider,
            model
        );

        self.binding(provider)
            .generate_images(model, prompt, options)
            .await
            .map_err(|e| {
                error!("{} image generation failed: {}", provider, e);
                e
            })
    }
}

/// Sends a prepared request and decodes the JSON body. Transport errors and
/// non-success statuses become `UpstreamFailure`; a body that does not match
/// `T` becomes `MalformedUpstreamResponse`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: ProviderId,
    request: reqwest::RequestBuilder,
) -> Result<T, GatewayError> {
    let response = request
        .send()
        .await
        .map_err(|e| GatewayError::from_transport(provider, e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::from_transport(provider, e))?;

    if !status.is_success() {
        return Err(GatewayError::UpstreamFailure {
            provider,
            status: Some(status.as_u16()),
            message: format!("HTTP {}: {}", status.as_u16(), body),
        });
    }

    debug!("{} response body: {}", provider, body);
    decode_body(provider, &body)
}

pub(crate) fn decode_body<T: DeserializeOwned>(provider: ProviderId, body: &str) -> Result<T, GatewayError> {
    serde_json::from_str(body).map_err(|e| GatewayError::MalformedUpstreamResponse {
        provider,
        message: e.to_string(),
    })
}
