//! Form actions for the lookup entities (genres, platforms, publishers,
//! formats)
//!
//! All four share one shape: a single `name` field validated with the same
//! rule string, saved through the entity's repository. Deleting an entity
//! that book rows still reference fails the foreign key check and surfaces
//! as an error flash rather than a crash.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::post,
    Form, Router,
};
use std::collections::HashMap;
use tracing::info;

use crate::forms::{FieldValue, Validator};
use crate::session::{self, FlashLevel, SessionData};
use crate::AppState;
use bookshelf_common::db::{formats, genres, platforms, publishers};

/// Build lookup entity form action routes
pub fn action_routes() -> Router<AppState> {
    Router::new()
        .route("/genres", post(store_genre))
        .route("/genres/:id", post(update_genre))
        .route("/genres/:id/delete", post(delete_genre))
        .route("/platforms", post(store_platform))
        .route("/platforms/:id", post(update_platform))
        .route("/platforms/:id/delete", post(delete_platform))
        .route("/publishers", post(store_publisher))
        .route("/publishers/:id", post(update_publisher))
        .route("/publishers/:id/delete", post(delete_publisher))
        .route("/formats", post(store_format))
        .route("/formats/:id", post(update_format))
        .route("/formats/:id/delete", post(delete_format))
}

const NAME_RULES: &str = "required|notempty|max:255";

/// Validate the submitted name; `Err` carries the form-redirect response
async fn validated_name(
    state: &AppState,
    headers: &HeaderMap,
    form: &HashMap<String, String>,
    form_url: &str,
) -> Result<String, Response> {
    let mut data = HashMap::new();
    if let Some(name) = form.get("name") {
        data.insert("name".to_string(), FieldValue::Text(name.clone()));
    }

    let validator = Validator::validate(&data, &[("name", NAME_RULES)]);
    if !validator.fails() {
        return Ok(form.get("name").cloned().unwrap_or_default());
    }

    let mut session_data =
        SessionData::with_flash(FlashLevel::Error, "Please fix the errors below.");
    if let Some(name) = form.get("name") {
        session_data.old_input.insert("name".to_string(), name.clone());
    }
    session_data.field_errors = validator.first_errors();

    let sid = session::session_id_or_new(headers);
    state.sessions.put(sid, session_data).await;
    Err((session::session_headers(sid), Redirect::to(form_url)).into_response())
}

async fn flash_redirect(
    state: &AppState,
    headers: &HeaderMap,
    level: FlashLevel,
    message: &str,
    to: &str,
) -> Response {
    let sid = session::session_id_or_new(headers);
    state
        .sessions
        .put(sid, SessionData::with_flash(level, message))
        .await;
    (session::session_headers(sid), Redirect::to(to)).into_response()
}

macro_rules! lookup_actions {
    ($store_fn:ident, $update_fn:ident, $delete_fn:ident, $repo:ident, $record:path, $base:literal, $label:literal) => {
        pub async fn $store_fn(
            State(state): State<AppState>,
            headers: HeaderMap,
            Form(form): Form<HashMap<String, String>>,
        ) -> Response {
            // A path metavariable cannot open a struct literal directly
            type Record = $record;

            let name = match validated_name(&state, &headers, &form, concat!($base, "/new")).await {
                Ok(name) => name,
                Err(response) => return response,
            };

            let mut record = Record { id: None, name };
            match $repo::save(&state.db, &mut record).await {
                Ok(()) => {
                    info!(concat!("Created ", $label, " {:?}"), record.name);
                    flash_redirect(
                        &state,
                        &headers,
                        FlashLevel::Success,
                        concat!($label, " created."),
                        $base,
                    )
                    .await
                }
                Err(e) => {
                    flash_redirect(
                        &state,
                        &headers,
                        FlashLevel::Error,
                        &format!("Failed to save: {}", e),
                        concat!($base, "/new"),
                    )
                    .await
                }
            }
        }

        pub async fn $update_fn(
            State(state): State<AppState>,
            Path(id): Path<i64>,
            headers: HeaderMap,
            Form(form): Form<HashMap<String, String>>,
        ) -> Response {
            let form_url = format!("{}/{}/edit", $base, id);

            let existing = match $repo::find_by_id(&state.db, id).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    return flash_redirect(
                        &state,
                        &headers,
                        FlashLevel::Error,
                        "Record not found.",
                        $base,
                    )
                    .await
                }
                Err(e) => {
                    return flash_redirect(
                        &state,
                        &headers,
                        FlashLevel::Error,
                        &format!("Error: {}", e),
                        $base,
                    )
                    .await
                }
            };

            let name = match validated_name(&state, &headers, &form, &form_url).await {
                Ok(name) => name,
                Err(response) => return response,
            };

            let mut record = existing;
            record.name = name;
            match $repo::save(&state.db, &mut record).await {
                Ok(()) => {
                    info!(concat!("Updated ", $label, " {}"), id);
                    flash_redirect(
                        &state,
                        &headers,
                        FlashLevel::Success,
                        concat!($label, " updated."),
                        $base,
                    )
                    .await
                }
                Err(e) => {
                    flash_redirect(
                        &state,
                        &headers,
                        FlashLevel::Error,
                        &format!("Failed to save: {}", e),
                        &form_url,
                    )
                    .await
                }
            }
        }

        pub async fn $delete_fn(
            State(state): State<AppState>,
            Path(id): Path<i64>,
            headers: HeaderMap,
        ) -> Response {
            let existing = match $repo::find_by_id(&state.db, id).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    return flash_redirect(
                        &state,
                        &headers,
                        FlashLevel::Error,
                        "Record not found.",
                        $base,
                    )
                    .await
                }
                Err(e) => {
                    return flash_redirect(
                        &state,
                        &headers,
                        FlashLevel::Error,
                        &format!("Error: {}", e),
                        $base,
                    )
                    .await
                }
            };

            match $repo::delete(&state.db, &existing).await {
                Ok(_) => {
                    info!(concat!("Deleted ", $label, " {}"), id);
                    flash_redirect(
                        &state,
                        &headers,
                        FlashLevel::Success,
                        concat!($label, " deleted."),
                        $base,
                    )
                    .await
                }
                Err(e) => {
                    // Typically a foreign key violation: books still reference it
                    flash_redirect(
                        &state,
                        &headers,
                        FlashLevel::Error,
                        &format!("Cannot delete: {}", e),
                        $base,
                    )
                    .await
                }
            }
        }
    };
}

lookup_actions!(
    store_genre,
    update_genre,
    delete_genre,
    genres,
    bookshelf_common::db::models::Genre,
    "/genres",
    "Genre"
);
lookup_actions!(
    store_platform,
    update_platform,
    delete_platform,
    platforms,
    bookshelf_common::db::models::Platform,
    "/platforms",
    "Platform"
);
lookup_actions!(
    store_publisher,
    update_publisher,
    delete_publisher,
    publishers,
    bookshelf_common::db::models::Publisher,
    "/publishers",
    "Publisher"
);
lookup_actions!(
    store_format,
    update_format,
    delete_format,
    formats,
    bookshelf_common::db::models::Format,
    "/formats",
    "Format"
);
