//! bookshelf-web library - catalog management HTTP service
//!
//! Server-rendered HTML forms over the bookshelf-common repositories, plus a
//! small read-only JSON API. Exposed as a library so integration tests can
//! drive the router directly.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod forms;
pub mod session;
pub mod upload;

pub use crate::error::{ApiError, ApiResult};
use crate::session::SessionStore;
use crate::upload::ImageStore;

/// Request body ceiling: comfortably above the 5 MiB image validation limit
/// so oversized uploads reach the validator and produce a form error instead
/// of a bare 413.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Uploaded image storage
    pub images: ImageStore,
    /// In-process session store (flash messages, old input, field errors)
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(db: SqlitePool, images: ImageStore) -> Self {
        Self {
            db,
            images,
            sessions: SessionStore::new(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let images_dir = state.images.dir().to_path_buf();

    Router::new()
        // HTML pages
        .merge(api::pages::page_routes())
        // Form actions (POST)
        .merge(api::books::action_routes())
        .merge(api::catalog::action_routes())
        // Read-only JSON API + health
        .merge(api::json::api_routes())
        // Stored images served by filename under a fixed /images prefix
        .nest_service("/images", ServeDir::new(images_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
