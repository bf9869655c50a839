//! Read-only JSON API and health endpoint

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use bookshelf_common::db::models::{Book, Format, Genre, Platform, Publisher};
use bookshelf_common::db::{book_platforms, books, formats, genres, platforms, publishers};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health
///
/// Health check endpoint for monitoring. No database access.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "bookshelf-web".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/books
pub async fn list_books(State(state): State<AppState>) -> ApiResult<Json<Vec<Book>>> {
    Ok(Json(books::find_all(&state.db).await?))
}

/// GET /api/books/:id
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Book>> {
    let book = books::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("book {}", id)))?;
    Ok(Json(book))
}

/// GET /api/books/:id/platforms
pub async fn get_book_platforms(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Platform>>> {
    if books::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("book {}", id)));
    }
    Ok(Json(book_platforms::platforms_for_book(&state.db, id).await?))
}

/// GET /api/genres
pub async fn list_genres(State(state): State<AppState>) -> ApiResult<Json<Vec<Genre>>> {
    Ok(Json(genres::find_all(&state.db).await?))
}

/// GET /api/genres/:id/books
pub async fn get_genre_books(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Book>>> {
    if genres::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("genre {}", id)));
    }
    Ok(Json(books::find_by_genre(&state.db, id).await?))
}

/// GET /api/platforms
pub async fn list_platforms(State(state): State<AppState>) -> ApiResult<Json<Vec<Platform>>> {
    Ok(Json(platforms::find_all(&state.db).await?))
}

/// GET /api/platforms/:id/books
pub async fn get_platform_books(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Book>>> {
    if platforms::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("platform {}", id)));
    }
    Ok(Json(books::find_by_platform(&state.db, id).await?))
}

/// GET /api/publishers
pub async fn list_publishers(State(state): State<AppState>) -> ApiResult<Json<Vec<Publisher>>> {
    Ok(Json(publishers::find_all(&state.db).await?))
}

/// GET /api/formats
pub async fn list_formats(State(state): State<AppState>) -> ApiResult<Json<Vec<Format>>> {
    Ok(Json(formats::find_all(&state.db).await?))
}

/// Build JSON API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/books", get(list_books))
        .route("/api/books/:id", get(get_book))
        .route("/api/books/:id/platforms", get(get_book_platforms))
        .route("/api/genres", get(list_genres))
        .route("/api/genres/:id/books", get(get_genre_books))
        .route("/api/platforms", get(list_platforms))
        .route("/api/platforms/:id/books", get(get_platform_books))
        .route("/api/publishers", get(list_publishers))
        .route("/api/formats", get(list_formats))
}
