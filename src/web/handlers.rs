use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use log::{error, info, warn};
use serde_json::json;
use tera::Context;

use crate::conversation::{self, MAX_MESSAGE_CHARS};
use crate::error::GatewayError;
use crate::model::{
    Gateway, GenerationOptions, GenerationRequest, ImageSize, ProviderId,
};
use crate::web::format::{self, format_error, RenderMode, ResponseEnvelope};
use crate::web::models::{
    AnalysisPayload, AnalysisRequest, ChatPayload, ChatRequest, GeminiChatPayload,
    GeminiChatRequest, GeneratedTextPayload, ImageAnalysisPayload, ImageAnalysisRequest,
    ImageRequest, ImagesPayload, PromptRequest, TextCompletionRequest, TextPayload,
};
use crate::web::{AppState, PAGE_TITLE};

const OPENAI_CHAT_MODEL: &str = "gpt-4o-mini";
const OPENAI_TEXT_MODEL: &str = "gpt-3.5-turbo";
const OPENAI_IMAGE_MODEL: &str = "dall-e-2";
const GEMINI_FAST_MODEL: &str = "gemini-2.5-flash";
const GEMINI_PRO_MODEL: &str = "gemini-1.5-pro";

// Models the text completion endpoint will forward to
const TEXT_COMPLETION_MODELS: &[&str] = &["gpt-3.5-turbo", "gpt-4", "gpt-4-turbo-preview"];

const MAX_IMAGE_PROMPT_CHARS: usize = 1000;
const ANALYSIS_MAX_TOKENS: u32 = 1000;
const DEFAULT_IMAGE_QUESTION: &str = "What do you see in this image?";
const FALLBACK_REPLY: &str = "Sorry, I could not generate a response.";

const CHAT_FAILED: &str = "Failed to get AI response";
const TEXT_FAILED: &str = "Failed to generate text";
const IMAGE_FAILED: &str = "Failed to generate image";
const ANALYSIS_FAILED: &str = "Failed to analyze data";
const IMAGE_ANALYSIS_FAILED: &str = "Failed to analyze image";

/// Local validation problems are the client's fault; everything else is ours.
fn failure(context: &str, err: &GatewayError) -> HttpResponse {
    let status = if err.is_local() {
        warn!("{}: {}", context, err);
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        error!("{}: {}", context, err);
        StatusCode::INTERNAL_SERVER_ERROR
    };
    HttpResponse::build(status).json(format_error::<()>(context, err))
}

// Chat page
pub async fn index(data: web::Data<AppState>) -> impl Responder {
    let mut context = Context::new();
    context.insert("title", PAGE_TITLE);
    match data.tera.render("chat.html", &context) {
        Ok(html) => HttpResponse::Ok().content_type("text/html").body(html),
        Err(e) => {
            error!("Template error: {}", e);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

// Health check endpoint
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

// Chat API endpoint
pub async fn chat(gateway: web::Data<Gateway>, req: web::Json<ChatRequest>) -> HttpResponse {
    let ChatRequest {
        message,
        conversation,
    } = req.into_inner();
    let history = conversation.unwrap_or_default();

    info!(
        "Chat request: {} characters, {} prior messages",
        message.chars().count(),
        history.len()
    );

    // Build conversation history
    let messages = match conversation::assemble(&history, &message) {
        Ok(messages) => messages,
        Err(e) => return failure(CHAT_FAILED, &e),
    };

    // Send to the model
    let request = GenerationRequest::new(messages, OPENAI_CHAT_MODEL);
    match gateway.generate(&request, ProviderId::OpenAi).await {
        Ok(mut result) => {
            if result.text.trim().is_empty() {
                result.text = FALLBACK_REPLY.to_string();
            }
            let conversation = conversation::append_reply(&request.messages, &result);
            let envelope = format::format(result, RenderMode::Raw).map(|r| ChatPayload {
                response: r.text,
                conversation,
                usage: r.usage,
            });
            HttpResponse::Ok().json(envelope)
        }
        Err(e) => failure(CHAT_FAILED, &e),
    }
}

// Text completion endpoint
pub async fn generate_text(
    gateway: web::Data<Gateway>,
    req: web::Json<TextCompletionRequest>,
) -> HttpResponse {
    let prompt = match conversation::validate_message(&req.prompt, MAX_MESSAGE_CHARS) {
        Ok(prompt) => prompt,
        Err(e) => return failure(TEXT_FAILED, &e),
    };
    let model = req.model.as_deref().unwrap_or(OPENAI_TEXT_MODEL);
    if !TEXT_COMPLETION_MODELS.contains(&model) {
        let err = GatewayError::UnsupportedModel {
            provider: ProviderId::OpenAi,
            model: model.to_string(),
        };
        return failure(TEXT_FAILED, &err);
    }
    info!("Text completion request on {}", model);

    let request = GenerationRequest::from_prompt(prompt, model);
    match gateway.generate(&request, ProviderId::OpenAi).await {
        Ok(result) => HttpResponse::Ok().json(
            format::format(result, RenderMode::Raw).map(|r| TextPayload { text: r.text }),
        ),
        Err(e) => failure(TEXT_FAILED, &e),
    }
}

// Image generation endpoint
pub async fn generate_image(
    gateway: web::Data<Gateway>,
    req: web::Json<ImageRequest>,
) -> HttpResponse {
    let prompt = match conversation::validate_message(&req.prompt, MAX_IMAGE_PROMPT_CHARS) {
        Ok(prompt) => prompt,
        Err(e) => return failure(IMAGE_FAILED, &e),
    };
    // Parse requested size
    let size = match req.size.as_deref().map(str::parse::<ImageSize>).transpose() {
        Ok(size) => size,
        Err(e) => return failure(IMAGE_FAILED, &e),
    };
    let options = GenerationOptions {
        size,
        n: req.n,
        ..Default::default()
    };

    match gateway
        .generate_images(prompt, OPENAI_IMAGE_MODEL, &options, ProviderId::OpenAi)
        .await
    {
        Ok(images) => {
            info!("Generated {} image(s)", images.len());
            HttpResponse::Ok().json(ResponseEnvelope::ok(ImagesPayload { images }))
        }
        Err(e) => failure(IMAGE_FAILED, &e),
    }
}

// Gemini endpoints
pub async fn gemini_generate_text(
    gateway: web::Data<Gateway>,
    req: web::Json<PromptRequest>,
) -> HttpResponse {
    let prompt = match conversation::validate_message(&req.prompt, MAX_MESSAGE_CHARS) {
        Ok(prompt) => prompt,
        Err(e) => return failure(TEXT_FAILED, &e),
    };

    let request = GenerationRequest::from_prompt(prompt, GEMINI_FAST_MODEL);
    match gateway.generate(&request, ProviderId::Gemini).await {
        Ok(result) => HttpResponse::Ok().json(
            format::format(result, RenderMode::MarkdownToHtml).map(|r| GeneratedTextPayload {
                generated_text: r.text,
                usage: r.usage,
            }),
        ),
        Err(e) => failure(TEXT_FAILED, &e),
    }
}

pub async fn gemini_chat(
    gateway: web::Data<Gateway>,
    req: web::Json<GeminiChatRequest>,
) -> HttpResponse {
    let GeminiChatRequest { messages } = req.into_inner();
    info!("Gemini chat request with {} messages", messages.len());

    let request = GenerationRequest::new(messages, GEMINI_PRO_MODEL);
    match gateway.generate(&request, ProviderId::Gemini).await {
        Ok(result) => HttpResponse::Ok().json(
            format::format(result, RenderMode::Raw).map(|r| GeminiChatPayload {
                response: r.text,
                finish_reason: r.finish_reason,
            }),
        ),
        Err(e) => failure(CHAT_FAILED, &e),
    }
}

pub async fn gemini_analyze(
    gateway: web::Data<Gateway>,
    req: web::Json<AnalysisRequest>,
) -> HttpResponse {
    if req.data.is_null() {
        return failure(
            ANALYSIS_FAILED,
            &GatewayError::invalid_input("data must be provided"),
        );
    }

    // Wrap the data in an analysis prompt
    let prompt = format!("Analyze this data and provide insights: {}", req.data);
    let request = GenerationRequest::from_prompt(prompt, GEMINI_PRO_MODEL).with_options(
        GenerationOptions {
            max_tokens: Some(ANALYSIS_MAX_TOKENS),
            ..Default::default()
        },
    );

    match gateway.generate(&request, ProviderId::Gemini).await {
        Ok(result) => HttpResponse::Ok().json(
            format::format(result, RenderMode::Raw).map(|r| AnalysisPayload { analysis: r.text }),
        ),
        Err(e) => failure(ANALYSIS_FAILED, &e),
    }
}

pub async fn gemini_analyze_image(
    gateway: web::Data<Gateway>,
    req: web::Json<ImageAnalysisRequest>,
) -> HttpResponse {
    let ImageAnalysisRequest {
        image_url,
        question,
    } = req.into_inner();
    // Fall back to a generic question
    let question = question
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_IMAGE_QUESTION.to_string());
    info!("Image analysis request for {}", image_url);

    let request = GenerationRequest::from_prompt(question, GEMINI_PRO_MODEL).with_options(
        GenerationOptions {
            image_refs: vec![image_url.trim().to_string()],
            ..Default::default()
        },
    );

    match gateway.generate(&request, ProviderId::Gemini).await {
        Ok(result) => HttpResponse::Ok().json(
            format::format(result, RenderMode::Raw).map(|r| ImageAnalysisPayload {
                image_analysis: r.text,
            }),
        ),
        Err(e) => failure(IMAGE_ANALYSIS_FAILED, &e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{test, App};
    use serde_json::{json, Value};

    use super::*;
    use crate::model::testing::{gateway, StubBinding};
    use crate::model::{GeneratedImage, GenerationResult, Role, Usage};
    use crate::session::{ChatSession, SessionState};
    use crate::web::models::ChatReply;
    use crate::web::routes;

    fn hello_result() -> GenerationResult {
        GenerationResult {
            text: "Hello!".into(),
            usage: Some(Usage {
                total_tokens: Some(5),
                ..Default::default()
            }),
            finish_reason: None,
        }
    }

    fn stub_gateway(openai: StubBinding, gemini: StubBinding) -> (Arc<StubBinding>, Arc<StubBinding>, web::Data<Gateway>) {
        let openai = Arc::new(openai);
        let gemini = Arc::new(gemini);
        let data = web::Data::new(gateway(openai.clone(), gemini.clone()));
        (openai, gemini, data)
    }

    fn gemini_idle() -> StubBinding {
        StubBinding::replying(ProviderId::Gemini, GenerationResult::text("unused"))
    }

    #[actix_web::test]
    async fn chat_round_trip_updates_the_session() {
        let (openai, _, data) = stub_gateway(
            StubBinding::replying(ProviderId::OpenAi, hello_result()),
            gemini_idle(),
        );
        let app = test::init_service(App::new().app_data(data).configure(routes::configure)).await;

        let mut session = ChatSession::new();
        let outbound = session.submit("Hi").expect("idle session accepts input");
        assert_eq!(session.state(), SessionState::Sending);

        let req = test::TestRequest::post()
            .uri("/api/openai/chat")
            .set_json(&outbound)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["response"], "Hello!");
        assert_eq!(body["usage"], json!({"total_tokens": 5}));
        assert_eq!(body["conversation"].as_array().unwrap().len(), 2);
        assert!(body.get("error").is_none());

        let sent = openai.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(sent.model, "gpt-4o-mini");
        assert_eq!(sent.messages.len(), 1);
        assert_eq!(sent.messages[0].content, "Hi");

        let reply: ChatReply = serde_json::from_value(body).unwrap();
        session.resolve(Ok(reply));

        assert_eq!(session.state(), SessionState::Idle);
        let history: Vec<_> = session
            .history()
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(history, vec![(Role::User, "Hi"), (Role::Assistant, "Hello!")]);
    }

    #[actix_web::test]
    async fn upstream_500_becomes_failure_envelope() {
        let (_, _, data) = stub_gateway(StubBinding::failing(ProviderId::OpenAi, 500), gemini_idle());
        let app = test::init_service(App::new().app_data(data).configure(routes::configure)).await;

        let mut session = ChatSession::new();
        let outbound = session.submit("Hi").unwrap();

        let req = test::TestRequest::post()
            .uri("/api/openai/chat")
            .set_json(&outbound)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;

        assert_eq!(body["success"], false);
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Failed to get AI response: "));
        assert!(body.get("response").is_none());

        session.resolve(Ok(serde_json::from_value(body).unwrap()));
        assert_eq!(session.state(), SessionState::Error);
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].role, Role::User);
    }

    #[actix_web::test]
    async fn chat_rejects_oversized_message_locally() {
        let (openai, _, data) = stub_gateway(
            StubBinding::replying(ProviderId::OpenAi, hello_result()),
            gemini_idle(),
        );
        let app = test::init_service(App::new().app_data(data).configure(routes::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/openai/chat")
            .set_json(json!({"message": "x".repeat(2001), "conversation": []}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(openai.call_count(), 0);
    }

    #[actix_web::test]
    async fn empty_reply_gets_fallback_text() {
        let (_, _, data) = stub_gateway(
            StubBinding::replying(ProviderId::OpenAi, GenerationResult::text("")),
            gemini_idle(),
        );
        let app = test::init_service(App::new().app_data(data).configure(routes::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/openai/chat")
            .set_json(json!({"message": "Hi"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["response"], FALLBACK_REPLY);
    }

    #[actix_web::test]
    async fn unsupported_image_size_is_rejected_before_dispatch() {
        let (openai, _, data) = stub_gateway(
            StubBinding::with_images(ProviderId::OpenAi, Vec::new()),
            gemini_idle(),
        );
        let app = test::init_service(App::new().app_data(data).configure(routes::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/openai/generate-image")
            .set_json(json!({"prompt": "a lighthouse", "size": "2048x2048"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("2048x2048"));
        assert_eq!(openai.call_count(), 0);
    }

    #[actix_web::test]
    async fn generate_image_returns_image_list() {
        let image = GeneratedImage {
            url: Some("https://img.example/1.png".into()),
            b64_json: None,
            revised_prompt: None,
        };
        let (_, _, data) = stub_gateway(
            StubBinding::with_images(ProviderId::OpenAi, vec![image.clone(), image]),
            gemini_idle(),
        );
        let app = test::init_service(App::new().app_data(data).configure(routes::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/openai/generate-image")
            .set_json(json!({"prompt": "a lighthouse", "size": "512x512", "n": 2}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["images"].as_array().unwrap().len(), 2);
        assert_eq!(body["images"][0]["url"], "https://img.example/1.png");
    }

    #[actix_web::test]
    async fn text_completion_honours_model_choice() {
        let (openai, _, data) = stub_gateway(
            StubBinding::replying(ProviderId::OpenAi, GenerationResult::text("42")),
            gemini_idle(),
        );
        let app = test::init_service(App::new().app_data(data).configure(routes::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/openai/generate-text")
            .set_json(json!({"prompt": "meaning of life?", "model": "gpt-4"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"success": true, "text": "42"}));
        assert_eq!(openai.last_request.lock().unwrap().as_ref().unwrap().model, "gpt-4");

        let req = test::TestRequest::post()
            .uri("/api/openai/generate-text")
            .set_json(json!({"prompt": "meaning of life?", "model": "gpt-9000"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn text_completion_refuses_chat_only_models() {
        let (openai, _, data) = stub_gateway(
            StubBinding::replying(ProviderId::OpenAi, GenerationResult::text("42")),
            gemini_idle(),
        );
        let app = test::init_service(App::new().app_data(data).configure(routes::configure)).await;

        for model in ["gpt-4o", "gpt-4o-mini"] {
            let req = test::TestRequest::post()
                .uri("/api/openai/generate-text")
                .set_json(json!({"prompt": "meaning of life?", "model": model}))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["success"], false);
            assert!(body["error"].as_str().unwrap().contains(model));
        }
        assert_eq!(openai.call_count(), 0);

        let req = test::TestRequest::post()
            .uri("/api/openai/generate-text")
            .set_json(json!({"prompt": "meaning of life?", "model": "gpt-4-turbo-preview"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(openai.call_count(), 1);
    }

    #[actix_web::test]
    async fn gemini_chat_reports_finish_reason() {
        let (_, gemini, data) = stub_gateway(
            StubBinding::replying(ProviderId::OpenAi, GenerationResult::text("unused")),
            StubBinding::replying(
                ProviderId::Gemini,
                GenerationResult {
                    text: "Paris.".into(),
                    usage: None,
                    finish_reason: Some(crate::model::FinishReason::Stop),
                },
            ),
        );
        let app = test::init_service(App::new().app_data(data).configure(routes::configure)).await;

        // History straight from a client, no timestamps
        let req = test::TestRequest::post()
            .uri("/api/gemini/chat")
            .set_json(json!({"messages": [
                {"role": "system", "content": "Answer briefly."},
                {"role": "user", "content": "Capital of France?"}
            ]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            json!({"success": true, "response": "Paris.", "finish_reason": "stop"})
        );

        let sent = gemini.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(sent.model, "gemini-1.5-pro");
        assert_eq!(sent.messages.len(), 2);
        assert_eq!(sent.messages[0].role, Role::System);
        assert_eq!(sent.messages[1].content, "Capital of France?");
    }

    #[actix_web::test]
    async fn gemini_chat_without_messages_is_rejected() {
        let (_, gemini, data) = stub_gateway(
            StubBinding::replying(ProviderId::OpenAi, GenerationResult::text("unused")),
            gemini_idle(),
        );
        let app = test::init_service(App::new().app_data(data).configure(routes::configure)).await;

        for payload in [json!({"messages": []}), json!({})] {
            let req = test::TestRequest::post()
                .uri("/api/gemini/chat")
                .set_json(payload)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["success"], false);
        }
        assert_eq!(gemini.call_count(), 0);
    }

    #[actix_web::test]
    async fn gemini_text_is_rendered_as_html() {
        let (_, _, data) = stub_gateway(
            StubBinding::replying(ProviderId::OpenAi, GenerationResult::text("unused")),
            StubBinding::replying(ProviderId::Gemini, GenerationResult::text("**bold** <b>raw</b>")),
        );
        let app = test::init_service(App::new().app_data(data).configure(routes::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/gemini/generate-text")
            .set_json(json!({"prompt": "say something"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body["generated_text"],
            "<p><strong>bold</strong> &lt;b&gt;raw&lt;/b&gt;</p>\n"
        );
        assert!(body.get("usage").is_none());
    }

    #[actix_web::test]
    async fn image_analysis_uses_default_question() {
        let (_, gemini, data) = stub_gateway(
            StubBinding::replying(ProviderId::OpenAi, GenerationResult::text("unused")),
            StubBinding::replying(ProviderId::Gemini, GenerationResult::text("A cat.")),
        );
        let app = test::init_service(App::new().app_data(data).configure(routes::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/gemini/analyze-image")
            .set_json(json!({"image_url": "https://example.com/cat.jpg"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["image_analysis"], "A cat.");

        let sent = gemini.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(sent.messages[0].content, DEFAULT_IMAGE_QUESTION);
        assert_eq!(sent.options.image_refs, vec!["https://example.com/cat.jpg".to_string()]);
    }

    #[actix_web::test]
    async fn analysis_wraps_data_in_prompt() {
        let (_, gemini, data) = stub_gateway(
            StubBinding::replying(ProviderId::OpenAi, GenerationResult::text("unused")),
            StubBinding::replying(ProviderId::Gemini, GenerationResult::text("Trending up.")),
        );
        let app = test::init_service(App::new().app_data(data).configure(routes::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/gemini/analyze")
            .set_json(json!({"data": {"sales": [1, 2, 3]}}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["analysis"], "Trending up.");

        let sent = gemini.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(
            sent.messages[0].content,
            "Analyze this data and provide insights: {\"sales\":[1,2,3]}"
        );
        assert_eq!(sent.options.max_tokens, Some(1000));
    }

    #[actix_web::test]
    async fn malformed_json_gets_an_envelope() {
        let (_, _, data) = stub_gateway(
            StubBinding::replying(ProviderId::OpenAi, hello_result()),
            gemini_idle(),
        );
        let app = test::init_service(App::new().app_data(data).configure(routes::configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/openai/chat")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn chat_page_renders_title() {
        let tera = tera::Tera::new("templates/**/*").unwrap();
        let state = web::Data::new(AppState { tera });
        let app = test::init_service(App::new().app_data(state).configure(routes::configure)).await;

        let req = test::TestRequest::get().uri("/chat").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        let html = std::str::from_utf8(&body).unwrap();
        assert!(html.contains("<title>AI Chat Assistant</title>"));
        assert!(html.contains("/static/chat.js"));
    }

    #[actix_web::test]
    async fn health_reports_ok() {
        let app = test::init_service(App::new().configure(routes::configure)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"status": "ok"}));
    }
}
