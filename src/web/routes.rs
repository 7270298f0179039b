use actix_web::{error, web, HttpResponse};

use crate::web::format::ResponseEnvelope;
use crate::web::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(
            web::scope("/api")
                .service(
                    web::scope("/openai")
                        .route("/chat", web::post().to(handlers::chat))
                        .route("/generate-text", web::post().to(handlers::generate_text))
                        .route("/generate-image", web::post().to(handlers::generate_image)),
                )
                .service(
                    web::scope("/gemini")
                        .route("/generate-text", web::post().to(handlers::gemini_generate_text))
                        .route("/chat", web::post().to(handlers::gemini_chat))
                        .route("/analyze", web::post().to(handlers::gemini_analyze))
                        .route("/analyze-image", web::post().to(handlers::gemini_analyze_image)),
                ),
        )
        .route("/", web::get().to(handlers::index))
        .route("/chat", web::get().to(handlers::index))
        .route("/health", web::get().to(handlers::health_check));
}

// Bodies that fail to parse still get an envelope rather than plain text.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest()
            .json(ResponseEnvelope::<()>::failure(format!("Invalid request body: {}", err)));
        error::InternalError::from_response(err, response).into()
    })
}
