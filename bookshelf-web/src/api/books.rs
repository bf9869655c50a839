//! Book form actions
//!
//! Each POST runs a fixed pipeline of stages: parse the multipart body,
//! validate against the rule set, resolve references, store the image, persist
//! the record, then sync platform links. A failing stage stashes the flash
//! state in the session and redirects back to the form; nothing later runs.

use axum::{
    extract::{Multipart, Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::post,
    Router,
};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::forms::{FieldValue, Validator};
use crate::session::{self, FlashLevel, SessionData};
use crate::upload::FileUpload;
use crate::AppState;
use bookshelf_common::db::models::Book;
use bookshelf_common::db::{book_platforms, books, genres};

/// Build book form action routes
pub fn action_routes() -> Router<AppState> {
    Router::new()
        .route("/books", post(store_book))
        .route("/books/:id", post(update_book))
        .route("/books/:id/delete", post(delete_book))
}

const TITLE_RULES: &str = "required|notempty|min:1|max:255";
const RELEASE_DATE_RULES: &str = "required|notempty";
const GENRE_RULES: &str = "required|integer";
const DESCRIPTION_RULES: &str = "required|notempty|min:10|max:5000";
const PLATFORMS_RULES: &str = "required|array|min:1|max:10";
const IMAGE_RULES: &str = "required|file|image|mimes:jpg,jpeg,png|max_file_size:5242880";
/// Same file checks without `required`, applied only when a replacement image
/// was actually submitted
const IMAGE_OPTIONAL_RULES: &str = "file|image|mimes:jpg,jpeg,png|max_file_size:5242880";

// ============================================================================
// Stage: parse
// ============================================================================

/// Collect a multipart form body into field values
///
/// Repeated text fields (checkbox groups) fold into `Items`. A file part with
/// no filename and no bytes is the browser's "no file chosen" and is dropped.
async fn parse_form(multipart: &mut Multipart) -> Result<HashMap<String, FieldValue>, String> {
    let mut data: HashMap<String, FieldValue> = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Malformed form body: {}", e))?
    {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        if let Some(file_name) = field.file_name().map(|f| f.to_string()) {
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| format!("Failed to read upload: {}", e))?;
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            data.insert(
                name,
                FieldValue::File(FileUpload {
                    original_name: file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                }),
            );
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| format!("Failed to read field: {}", e))?;
            match data.remove(&name) {
                Some(FieldValue::Text(prev)) => {
                    data.insert(name, FieldValue::Items(vec![prev, text]));
                }
                Some(FieldValue::Items(mut items)) => {
                    items.push(text);
                    data.insert(name, FieldValue::Items(items));
                }
                _ => {
                    data.insert(name, FieldValue::Text(text));
                }
            }
        }
    }

    Ok(data)
}

fn text_of(data: &HashMap<String, FieldValue>, field: &str) -> String {
    match data.get(field) {
        Some(FieldValue::Text(s)) => s.clone(),
        _ => String::new(),
    }
}

fn items_of(data: &HashMap<String, FieldValue>, field: &str) -> Vec<String> {
    match data.get(field) {
        Some(FieldValue::Items(items)) => items.clone(),
        // A single checked checkbox arrives as plain text
        Some(FieldValue::Text(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

// ============================================================================
// Stage: validate
// ============================================================================

/// Rules for a book submission; the image requirement differs between create
/// and update, and on update the file checks apply only when a file arrived.
fn book_rules(data: &HashMap<String, FieldValue>, creating: bool) -> Vec<(&'static str, &'static str)> {
    let mut rules = vec![
        ("title", TITLE_RULES),
        ("release_date", RELEASE_DATE_RULES),
        ("genre_id", GENRE_RULES),
        ("description", DESCRIPTION_RULES),
        ("platform_ids", PLATFORMS_RULES),
    ];
    if creating {
        rules.push(("image", IMAGE_RULES));
    } else if matches!(data.get("image"), Some(FieldValue::File(_))) {
        rules.push(("image", IMAGE_OPTIONAL_RULES));
    }
    rules
}

/// Checkbox submissions arrive as plain text when only one box is checked;
/// normalize so the `array` rule and count bounds see a list either way.
fn normalize_platform_ids(data: &mut HashMap<String, FieldValue>) {
    if let Some(FieldValue::Text(single)) = data.get("platform_ids") {
        let single = single.clone();
        data.insert("platform_ids".to_string(), FieldValue::Items(vec![single]));
    }
}

/// Checks the rule engine cannot express: date shape and genre existence
async fn resolve_references(
    state: &AppState,
    data: &HashMap<String, FieldValue>,
    field_errors: &mut HashMap<String, String>,
) -> Option<i64> {
    let release_date = text_of(data, "release_date");
    if !release_date.is_empty()
        && chrono::NaiveDate::parse_from_str(&release_date, "%Y-%m-%d").is_err()
    {
        field_errors
            .entry("release_date".to_string())
            .or_insert_with(|| "The release_date field must be a date (YYYY-MM-DD).".to_string());
    }

    let genre_id: i64 = match text_of(data, "genre_id").parse() {
        Ok(id) => id,
        Err(_) => return None,
    };
    match genres::find_by_id(&state.db, genre_id).await {
        Ok(Some(_)) => Some(genre_id),
        Ok(None) => {
            field_errors
                .entry("genre_id".to_string())
                .or_insert_with(|| "The selected genre does not exist.".to_string());
            None
        }
        Err(e) => {
            warn!("Genre lookup failed: {}", e);
            field_errors
                .entry("genre_id".to_string())
                .or_insert_with(|| "Could not verify the selected genre.".to_string());
            None
        }
    }
}

// ============================================================================
// Stage: respond
// ============================================================================

/// Stash validation state and send the browser back to the form
async fn back_to_form(
    state: &AppState,
    headers: &HeaderMap,
    data: &HashMap<String, FieldValue>,
    field_errors: HashMap<String, String>,
    form_url: &str,
) -> Response {
    let mut old_input = HashMap::new();
    for field in ["title", "release_date", "genre_id", "description"] {
        let value = text_of(data, field);
        if !value.is_empty() {
            old_input.insert(field.to_string(), value);
        }
    }
    let mut old_multi = HashMap::new();
    let platform_ids = items_of(data, "platform_ids");
    if !platform_ids.is_empty() {
        old_multi.insert("platform_ids".to_string(), platform_ids);
    }

    let mut session_data = SessionData::with_flash(FlashLevel::Error, "Please fix the errors below.");
    session_data.old_input = old_input;
    session_data.old_multi = old_multi;
    session_data.field_errors = field_errors;

    let sid = session::session_id_or_new(headers);
    state.sessions.put(sid, session_data).await;

    (session::session_headers(sid), Redirect::to(form_url)).into_response()
}

async fn redirect_with_flash(
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

// ============================================================================
// Stage: persist
// ============================================================================

/// Parse validated platform ids; non-numeric entries were already rejected by
/// the rule engine only for shape, so drop anything unparseable here.
fn parse_platform_ids(data: &HashMap<String, FieldValue>) -> Vec<i64> {
    items_of(data, "platform_ids")
        .iter()
        .filter_map(|v| v.parse().ok())
        .collect()
}

/// Sync a book's platform links, warning when ids were dropped as unknown
///
/// Unknown ids are dropped inside `replace_links` and only logged; a database
/// failure is propagated so the handler takes its cleanup branch.
async fn sync_platforms(
    state: &AppState,
    book_id: i64,
    requested: &[i64],
) -> bookshelf_common::Result<()> {
    let linked = book_platforms::replace_links(&state.db, book_id, requested).await?;
    if linked.len() < requested.len() {
        warn!(
            "Book {}: {} of {} requested platform ids were unknown and dropped",
            book_id,
            requested.len() - linked.len(),
            requested.len()
        );
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /books - create a book
pub async fn store_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut data = match parse_form(&mut multipart).await {
        Ok(data) => data,
        Err(message) => {
            return redirect_with_flash(&state, &headers, FlashLevel::Error, &message, "/books/new")
                .await
        }
    };
    normalize_platform_ids(&mut data);

    let validator = Validator::validate(&data, &book_rules(&data, true));
    let mut field_errors = validator.first_errors();
    let genre_id = resolve_references(&state, &data, &mut field_errors).await;

    if !field_errors.is_empty() {
        return back_to_form(&state, &headers, &data, field_errors, "/books/new").await;
    }
    let genre_id = match genre_id {
        Some(id) => id,
        None => return back_to_form(&state, &headers, &data, field_errors, "/books/new").await,
    };

    // Validation passed, so the image is present and well-formed
    let image_filename = match data.get("image") {
        Some(FieldValue::File(upload)) => match state.images.process(upload) {
            Ok(filename) => filename,
            Err(e) => {
                return redirect_with_flash(
                    &state,
                    &headers,
                    FlashLevel::Error,
                    &format!("Failed to store image: {}", e),
                    "/books/new",
                )
                .await
            }
        },
        _ => {
            return back_to_form(&state, &headers, &data, field_errors, "/books/new").await;
        }
    };

    let mut book = Book {
        id: None,
        title: text_of(&data, "title"),
        release_date: text_of(&data, "release_date"),
        genre_id,
        description: text_of(&data, "description"),
        image_filename: Some(image_filename.clone()),
    };

    if let Err(e) = books::save(&state.db, &mut book).await {
        // The image was written before the insert; remove the orphan
        state.images.delete_image(&image_filename);
        return redirect_with_flash(
            &state,
            &headers,
            FlashLevel::Error,
            &format!("Failed to save book: {}", e),
            "/books/new",
        )
        .await;
    }
    let book_id = book.id.unwrap_or_default();

    if let Err(e) = sync_platforms(&state, book_id, &parse_platform_ids(&data)).await {
        // Roll the creation back: remove the stored image and the row
        state.images.delete_image(&image_filename);
        if let Err(del) = books::delete(&state.db, &book).await {
            warn!("Book {}: cleanup delete failed: {}", book_id, del);
        }
        return redirect_with_flash(
            &state,
            &headers,
            FlashLevel::Error,
            &format!("Failed to save platforms: {}", e),
            "/books/new",
        )
        .await;
    }

    info!("Created book {} ({})", book_id, book.title);
    redirect_with_flash(
        &state,
        &headers,
        FlashLevel::Success,
        "Book created.",
        &format!("/books/{}", book_id),
    )
    .await
}

/// POST /books/:id - update a book
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let existing = match books::find_by_id(&state.db, id).await {
        Ok(Some(book)) => book,
        Ok(None) => {
            return redirect_with_flash(&state, &headers, FlashLevel::Error, "Book not found.", "/")
                .await
        }
        Err(e) => {
            return redirect_with_flash(
                &state,
                &headers,
                FlashLevel::Error,
                &format!("Error: {}", e),
                "/",
            )
            .await
        }
    };

    let form_url = format!("/books/{}/edit", id);

    let mut data = match parse_form(&mut multipart).await {
        Ok(data) => data,
        Err(message) => {
            return redirect_with_flash(&state, &headers, FlashLevel::Error, &message, &form_url)
                .await
        }
    };
    normalize_platform_ids(&mut data);

    let validator = Validator::validate(&data, &book_rules(&data, false));
    let mut field_errors = validator.first_errors();
    let genre_id = resolve_references(&state, &data, &mut field_errors).await;

    if !field_errors.is_empty() {
        return back_to_form(&state, &headers, &data, field_errors, &form_url).await;
    }
    let genre_id = match genre_id {
        Some(id) => id,
        None => return back_to_form(&state, &headers, &data, field_errors, &form_url).await,
    };

    // Store the replacement image (if any) before touching the record
    let new_image = match data.get("image") {
        Some(FieldValue::File(upload)) => match state.images.process(upload) {
            Ok(filename) => Some(filename),
            Err(e) => {
                return redirect_with_flash(
                    &state,
                    &headers,
                    FlashLevel::Error,
                    &format!("Failed to store image: {}", e),
                    &form_url,
                )
                .await
            }
        },
        _ => None,
    };

    let mut book = Book {
        id: Some(id),
        title: text_of(&data, "title"),
        release_date: text_of(&data, "release_date"),
        genre_id,
        description: text_of(&data, "description"),
        image_filename: new_image.clone().or_else(|| existing.image_filename.clone()),
    };

    if let Err(e) = books::save(&state.db, &mut book).await {
        if let Some(filename) = &new_image {
            state.images.delete_image(filename);
        }
        return redirect_with_flash(
            &state,
            &headers,
            FlashLevel::Error,
            &format!("Failed to save book: {}", e),
            &form_url,
        )
        .await;
    }

    if let Err(e) = sync_platforms(&state, id, &parse_platform_ids(&data)).await {
        if let Some(filename) = &new_image {
            state.images.delete_image(filename);
        }
        return redirect_with_flash(
            &state,
            &headers,
            FlashLevel::Error,
            &format!("Failed to save platforms: {}", e),
            &form_url,
        )
        .await;
    }

    // The record now points at the new image; the old file is unreferenced
    if new_image.is_some() {
        if let Some(old) = &existing.image_filename {
            state.images.delete_image(old);
        }
    }

    info!("Updated book {} ({})", id, book.title);
    redirect_with_flash(
        &state,
        &headers,
        FlashLevel::Success,
        "Book updated.",
        &format!("/books/{}", id),
    )
    .await
}

/// POST /books/:id/delete - delete a book and its stored image
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let existing = match books::find_by_id(&state.db, id).await {
        Ok(Some(book)) => book,
        Ok(None) => {
            return redirect_with_flash(&state, &headers, FlashLevel::Error, "Book not found.", "/")
                .await
        }
        Err(e) => {
            return redirect_with_flash(
                &state,
                &headers,
                FlashLevel::Error,
                &format!("Error: {}", e),
                "/",
            )
            .await
        }
    };

    // Clear platform links first so the row delete never violates references
    if let Err(e) = book_platforms::replace_links(&state.db, id, &[]).await {
        warn!("Book {}: failed to clear platform links: {}", id, e);
    }

    if let Err(e) = books::delete(&state.db, &existing).await {
        return redirect_with_flash(
            &state,
            &headers,
            FlashLevel::Error,
            &format!("Failed to delete book: {}", e),
            "/",
        )
        .await;
    }

    if let Some(filename) = &existing.image_filename {
        state.images.delete_image(filename);
    }

    info!("Deleted book {} ({})", id, existing.title);
    redirect_with_flash(&state, &headers, FlashLevel::Success, "Book deleted.", "/").await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn single_checkbox_normalizes_to_items() {
        let mut data = HashMap::new();
        data.insert("platform_ids".to_string(), text("3"));

        normalize_platform_ids(&mut data);

        assert!(matches!(
            data.get("platform_ids"),
            Some(FieldValue::Items(items)) if items == &vec!["3".to_string()]
        ));
    }

    #[test]
    fn update_rules_skip_image_when_no_file_submitted() {
        let data = HashMap::new();
        let rules = book_rules(&data, false);
        assert!(!rules.iter().any(|(field, _)| *field == "image"));

        let rules = book_rules(&data, true);
        assert!(rules.iter().any(|(field, _)| *field == "image"));
    }

    #[test]
    fn parse_platform_ids_drops_garbage() {
        let mut data = HashMap::new();
        data.insert(
            "platform_ids".to_string(),
            FieldValue::Items(vec!["1".to_string(), "x".to_string(), "4".to_string()]),
        );

        assert_eq!(parse_platform_ids(&data), vec![1, 4]);
    }
}
