pub mod format;
pub mod handlers;
pub mod models;
pub mod routes;

use tera::Tera;

pub const PAGE_TITLE: &str = "AI Chat Assistant";

/// Shared state for page rendering. API handlers take the gateway directly.
pub struct AppState {
    pub tera: Tera,
}
