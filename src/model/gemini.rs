// Gemini binding over the `generateContent` API. Text, chat and image
// understanding share one request shape; image references are fetched and
// attached to the last user turn as inline data.

use std::net::{Ipv4Addr, Ipv6Addr};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::{debug, info, warn};
use reqwest::{redirect, Client};
use serde::{Deserialize, Serialize};
use url::{Host, Url};

use super::{
    send_json, FinishReason, GenerationRequest, GenerationResult, ProviderBinding, ProviderId,
    Role, Usage,
};
use crate::error::GatewayError;

const FALLBACK_IMAGE_MIME: &str = "image/jpeg";
const MAX_IMAGE_REDIRECTS: usize = 5;
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Limits applied when fetching user-supplied image URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageFetchPolicy {
    pub max_bytes: usize,
    pub allow_private_hosts: bool,
}

impl Default for ImageFetchPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
            allow_private_hosts: false,
        }
    }
}

impl ImageFetchPolicy {
    /// Parses `raw` and rejects hosts the policy does not allow.
    pub fn check_url(&self, raw: &str) -> Result<Url, GatewayError> {
        let url = Url::parse(raw).map_err(|e| {
            GatewayError::invalid_input(format!("image reference '{}' is not a valid URL: {}", raw, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GatewayError::invalid_input(format!(
                "image reference '{}' is not an http(s) URL",
                raw
            )));
        }
        if !self.allows(&url) {
            return Err(GatewayError::invalid_input(format!(
                "image host of '{}' is not allowed",
                raw
            )));
        }
        Ok(url)
    }

    pub fn allows(&self, url: &Url) -> bool {
        self.allow_private_hosts || is_public_host(url)
    }

    /// Redirect policy that re-checks every hop against the host rules.
    pub fn redirect_policy(self) -> redirect::Policy {
        redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_IMAGE_REDIRECTS {
                attempt.error("too many redirects")
            } else if !self.allows(attempt.url()) {
                attempt.error("redirect to a disallowed host")
            } else {
                attempt.follow()
            }
        })
    }
}

fn is_public_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain != "localhost" && !domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => is_public_v4(ip),
        Some(Host::Ipv6(ip)) => is_public_v6(ip),
        None => false,
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    // 100.64.0.0/10 is carrier-grade NAT space.
    let shared = a == 100 && (b & 0xc0) == 64;
    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || shared)
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_public_v4(v4);
    }
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;
    !(ip.is_loopback() || ip.is_unspecified() || unique_local || link_local)
}

pub struct GeminiBinding {
    client: Client,
    image_client: Client,
    image_policy: ImageFetchPolicy,
    api_key: String,
    base_url: String,
}

impl GeminiBinding {
    pub fn new(client: Client, api_key: String, base_url: String) -> Self {
        info!("Using Gemini API at: {}", base_url);
        Self {
            image_client: client.clone(),
            client,
            image_policy: ImageFetchPolicy::default(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Uses a dedicated client and policy for image downloads. The client
    /// should carry `policy.redirect_policy()`.
    pub fn with_image_fetching(mut self, image_client: Client, policy: ImageFetchPolicy) -> Self {
        self.image_client = image_client;
        self.image_policy = policy;
        self
    }

    async fn fetch_image(&self, raw_url: &str) -> Result<InlineImage, GatewayError> {
        let url = self.image_policy.check_url(raw_url)?;
        let limit = self.image_policy.max_bytes;
        debug!("Fetching image for Gemini: {}", url);

        let mut response = self
            .image_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| GatewayError::from_transport(ProviderId::Gemini, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::UpstreamFailure {
                provider: ProviderId::Gemini,
                status: Some(status.as_u16()),
                message: format!("could not fetch image {}: HTTP {}", url, status.as_u16()),
            });
        }

        if let Some(declared) = response.content_length() {
            if declared > limit as u64 {
                return Err(too_large(raw_url, limit));
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Content-Length may be absent or wrong; count what actually arrives.
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| GatewayError::from_transport(ProviderId::Gemini, e))?
        {
            if bytes.len() + chunk.len() > limit {
                return Err(too_large(raw_url, limit));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(InlineImage {
            mime_type: image_mime_type(raw_url, content_type.as_deref()),
            data: BASE64.encode(&bytes),
        })
    }
}

fn too_large(url: &str, limit: usize) -> GatewayError {
    warn!("Image {} exceeds the {} byte limit", url, limit);
    GatewayError::invalid_input(format!("image {} is larger than {} bytes", url, limit))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineImage,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineImage {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
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
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Maps the conversation onto Gemini contents. System turns are folded into
/// `systemInstruction`; assistant turns use Gemini's `model` role.
pub(crate) fn content_payload(
    request: &GenerationRequest,
    images: Vec<InlineImage>,
) -> GenerateContentRequest {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for message in &request.messages {
        let part = Part::Text {
            text: message.content.clone(),
        };
        match message.role {
            Role::System => system_parts.push(part),
            Role::User => contents.push(Content {
                role: Some("user"),
                parts: vec![part],
            }),
            Role::Assistant => contents.push(Content {
                role: Some("model"),
                parts: vec![part],
            }),
        }
    }

    if !images.is_empty() {
        let image_parts = images.into_iter().map(|inline_data| Part::Inline { inline_data });
        match contents.iter_mut().rev().find(|c| c.role == Some("user")) {
            Some(last_user) => last_user.parts.extend(image_parts),
            None => contents.push(Content {
                role: Some("user"),
                parts: image_parts.collect(),
            }),
        }
    }

    GenerateContentRequest {
        contents,
        system_instruction: if system_parts.is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: system_parts,
            })
        },
        generation_config: GenerationConfig {
            temperature: request.options.temperature(),
            max_output_tokens: request.options.max_tokens(),
        },
    }
}

/// Concatenates the text parts of the first candidate.
pub(crate) fn parse_content_response(
    response: GenerateContentResponse,
) -> Result<GenerationResult, GatewayError> {
    let usage = response.usage_metadata.map(|u| Usage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("prompt was blocked ({})", r))
            .unwrap_or_else(|| "response contained no candidates".to_string());
        return Err(GatewayError::MalformedUpstreamResponse {
            provider: ProviderId::Gemini,
            message: reason,
        });
    };

    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    Ok(GenerationResult {
        text,
        usage,
        finish_reason: candidate.finish_reason.as_deref().map(FinishReason::from_provider),
    })
}

/// Prefers the served `Content-Type`, then the URL extension.
pub(crate) fn image_mime_type(url: &str, content_type: Option<&str>) -> String {
    if let Some(ct) = content_type {
        let essence = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        if essence.starts_with("image/") {
            return essence;
        }
    }

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => {
            warn!("Could not determine image type for {}, assuming JPEG", url);
            FALLBACK_IMAGE_MIME
        }
    };
    mime.to_string()
}

#[async_trait]
impl ProviderBinding for GeminiBinding {
    fn provider(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationResult, GatewayError> {
        let mut images = Vec::with_capacity(request.options.image_refs.len());
        for url in &request.options.image_refs {
            images.push(self.fetch_image(url).await?);
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let payload = content_payload(request, images);
        debug!(
            "Gemini payload: {} contents, system instruction: {}",
            payload.contents.len(),
            payload.system_instruction.is_some()
        );

        let response: GenerateContentResponse = send_json(
            ProviderId::Gemini,
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&payload),
        )
        .await?;

        parse_content_response(response)
    }
}
