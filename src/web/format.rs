use pulldown_cmark::{html, Event, Options, Parser};
use serde::Serialize;

use crate::error::GatewayError;
use crate::model::GenerationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Raw,
    MarkdownToHtml,
}

/// Success/error wrapper returned by every API endpoint. The payload is
/// flattened into the top-level object and omitted entirely on failure, so
/// clients only need to look at `success`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope<T> {
    pub success: bool,
    #[serde(flatten)]
    pub payload: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ResponseEnvelope<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(error.into()),
        }
    }

    /// Reshapes the payload, leaving a failure untouched.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ResponseEnvelope<U> {
        ResponseEnvelope {
            success: self.success,
            payload: self.payload.map(f),
            error: self.error,
        }
    }
}

pub fn format(mut result: GenerationResult, mode: RenderMode) -> ResponseEnvelope<GenerationResult> {
    if mode == RenderMode::MarkdownToHtml {
        result.text = markdown_to_html(&result.text);
    }
    ResponseEnvelope::ok(result)
}

/// Failure envelope whose message is `"<context>: <error>"`.
pub fn format_error<T>(context: &str, err: &GatewayError) -> ResponseEnvelope<T> {
    ResponseEnvelope::failure(format!("{}: {}", context, err))
}

/// CommonMark to HTML. Raw HTML in the source is emitted as escaped text.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
