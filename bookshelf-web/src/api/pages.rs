//! HTML pages for the catalog web interface
//!
//! Server-rendered pages with no client framework. Form pages pull flash
//! state (message, old input, field errors) out of the session store and the
//! store clears it on read, so each notice displays exactly once.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use std::collections::HashMap;

use crate::session::{self, Flash, FlashLevel, SessionData};
use crate::AppState;
use bookshelf_common::db::models::{Book, Genre, Platform};
use bookshelf_common::db::{book_platforms, books, formats, genres, platforms, publishers};

/// Build HTML page routes
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index_page))
        .route("/books/new", get(book_create_page))
        .route("/books/:id", get(book_detail_page))
        .route("/books/:id/edit", get(book_edit_page))
        .route("/genres", get(genre_list_page))
        .route("/genres/new", get(genre_create_page))
        .route("/genres/:id/edit", get(genre_edit_page))
        .route("/platforms", get(platform_list_page))
        .route("/platforms/new", get(platform_create_page))
        .route("/platforms/:id/edit", get(platform_edit_page))
        .route("/publishers", get(publisher_list_page))
        .route("/publishers/new", get(publisher_create_page))
        .route("/publishers/:id/edit", get(publisher_edit_page))
        .route("/formats", get(format_list_page))
        .route("/formats/new", get(format_create_page))
        .route("/formats/:id/edit", get(format_edit_page))
}

// ============================================================================
// Rendering helpers
// ============================================================================

/// Escape a string for interpolation into HTML text or attribute values
pub fn h(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn flash_html(flash: &Option<Flash>) -> String {
    match flash {
        Some(Flash { level: FlashLevel::Success, message }) => {
            format!(r#"<div class="flash flash-success">{}</div>"#, h(message))
        }
        Some(Flash { level: FlashLevel::Error, message }) => {
            format!(r#"<div class="flash flash-error">{}</div>"#, h(message))
        }
        None => String::new(),
    }
}

fn field_error_html(errors: &HashMap<String, String>, field: &str) -> String {
    match errors.get(field) {
        Some(message) => format!(r#"<p class="field-error">{}</p>"#, h(message)),
        None => String::new(),
    }
}

/// Common page shell
fn layout(title: &str, flash: &Option<Flash>, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Bookshelf</title>
    <style>
        body {{
            font-family: system-ui, -apple-system, sans-serif;
            max-width: 900px;
            margin: 40px auto;
            padding: 20px;
            line-height: 1.6;
        }}
        h1 {{
            color: #333;
            border-bottom: 2px solid #0066cc;
            padding-bottom: 10px;
        }}
        nav a {{
            margin-right: 12px;
        }}
        table {{
            border-collapse: collapse;
            width: 100%;
        }}
        th, td {{
            text-align: left;
            padding: 6px 10px;
            border-bottom: 1px solid #ddd;
        }}
        .input {{
            margin: 12px 0;
        }}
        .input label {{
            display: block;
            font-weight: 600;
        }}
        .input input[type="text"], .input input[type="date"], .input select, .input textarea {{
            width: 100%;
            max-width: 480px;
            padding: 6px;
        }}
        .input textarea {{
            min-height: 120px;
        }}
        .button {{
            display: inline-block;
            padding: 8px 16px;
            background: #0066cc;
            color: white;
            border: none;
            border-radius: 4px;
            text-decoration: none;
            cursor: pointer;
        }}
        .button:hover {{
            background: #0052a3;
        }}
        .button-danger {{
            background: #cc3333;
        }}
        .flash {{
            padding: 10px 14px;
            border-radius: 4px;
            margin-bottom: 16px;
        }}
        .flash-success {{
            background: #e6f4ea;
            color: #1e7a34;
        }}
        .flash-error {{
            background: #fdecea;
            color: #b3261e;
        }}
        .field-error {{
            color: #b3261e;
            margin: 2px 0 0 0;
            font-size: 14px;
        }}
        img.cover {{
            max-width: 240px;
            display: block;
            margin: 10px 0;
        }}
    </style>
</head>
<body>
    <nav>
        <a href="/">Books</a>
        <a href="/genres">Genres</a>
        <a href="/platforms">Platforms</a>
        <a href="/publishers">Publishers</a>
        <a href="/formats">Formats</a>
    </nav>
    {flash}
    <h1>{title}</h1>
    {body}
    <p><small>bookshelf-web v{version}</small></p>
</body>
</html>"#,
        title = h(title),
        flash = flash_html(flash),
        body = body,
        version = env!("CARGO_PKG_VERSION"),
    ))
}

/// Redirect carrying a flash message for the next page
async fn redirect_with_error(state: &AppState, headers: &HeaderMap, message: &str, to: &str) -> Response {
    let sid = session::session_id_or_new(headers);
    state
        .sessions
        .put(sid, SessionData::with_flash(FlashLevel::Error, message))
        .await;
    (session::session_headers(sid), Redirect::to(to)).into_response()
}

/// Pull one-read flash state for a rendering request
async fn take_session(state: &AppState, headers: &HeaderMap) -> SessionData {
    match session::session_id(headers) {
        Some(sid) => state.sessions.take(sid).await,
        None => SessionData::default(),
    }
}

// ============================================================================
// Book pages
// ============================================================================

/// GET / - book listing
pub async fn index_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = take_session(&state, &headers).await;

    let (all_books, all_genres) = match (
        books::find_all(&state.db).await,
        genres::find_all(&state.db).await,
    ) {
        (Ok(b), Ok(g)) => (b, g),
        _ => {
            return layout("Books", &session.flash, "<p>Failed to load the catalog.</p>")
                .into_response()
        }
    };

    let genre_names: HashMap<i64, String> = all_genres
        .into_iter()
        .filter_map(|g| g.id.map(|id| (id, g.name)))
        .collect();

    let mut rows = String::new();
    for book in &all_books {
        let id = book.id.unwrap_or_default();
        let genre = genre_names
            .get(&book.genre_id)
            .map(|n| n.as_str())
            .unwrap_or("-");
        rows.push_str(&format!(
            r#"<tr>
                <td><a href="/books/{id}">{title}</a></td>
                <td>{genre}</td>
                <td>{date}</td>
                <td><a href="/books/{id}/edit">Edit</a></td>
            </tr>"#,
            id = id,
            title = h(&book.title),
            genre = h(genre),
            date = h(&book.release_date),
        ));
    }

    let body = format!(
        r#"<p><a class="button" href="/books/new">Add Book</a></p>
        <table>
            <tr><th>Title</th><th>Genre</th><th>Released</th><th></th></tr>
            {rows}
        </table>"#,
    );

    layout("Books", &session.flash, &body).into_response()
}

/// GET /books/:id - book detail
pub async fn book_detail_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let session = take_session(&state, &headers).await;

    let book = match books::find_by_id(&state.db, id).await {
        Ok(Some(book)) => book,
        Ok(None) => return redirect_with_error(&state, &headers, "Book not found.", "/").await,
        Err(e) => return redirect_with_error(&state, &headers, &format!("Error: {}", e), "/").await,
    };

    let genre_name = match genres::find_by_id(&state.db, book.genre_id).await {
        Ok(Some(genre)) => genre.name,
        _ => "-".to_string(),
    };
    let linked = book_platforms::platforms_for_book(&state.db, id)
        .await
        .unwrap_or_default();
    let platform_names: Vec<String> = linked.iter().map(|p| h(&p.name)).collect();

    let image_html = match &book.image_filename {
        Some(filename) => format!(
            r#"<img class="cover" src="/images/{}" alt="Cover image">"#,
            h(filename)
        ),
        None => String::new(),
    };

    let body = format!(
        r#"{image}
        <p><strong>Released:</strong> {date}</p>
        <p><strong>Genre:</strong> {genre}</p>
        <p><strong>Platforms:</strong> {platforms}</p>
        <p>{description}</p>
        <p>
            <a class="button" href="/books/{id}/edit">Edit</a>
            <form method="POST" action="/books/{id}/delete" style="display:inline">
                <button class="button button-danger" type="submit">Delete</button>
            </form>
        </p>"#,
        image = image_html,
        date = h(&book.release_date),
        genre = h(&genre_name),
        platforms = if platform_names.is_empty() {
            "-".to_string()
        } else {
            platform_names.join(", ")
        },
        description = h(&book.description),
        id = id,
    );

    layout(&book.title, &session.flash, &body).into_response()
}

/// Shared book form body for create and edit
///
/// Prefill priority: old input from a failed submission, then the record
/// being edited, then empty.
fn book_form_body(
    action: &str,
    submit_label: &str,
    book: Option<&Book>,
    linked_platform_ids: &[i64],
    genre_options: &[Genre],
    platform_options: &[Platform],
    session: &SessionData,
) -> String {
    let old = |field: &str, fallback: &str| -> String {
        session
            .old_input
            .get(field)
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    };

    let title = old("title", book.map(|b| b.title.as_str()).unwrap_or(""));
    let release_date = old("release_date", book.map(|b| b.release_date.as_str()).unwrap_or(""));
    let description = old("description", book.map(|b| b.description.as_str()).unwrap_or(""));
    let selected_genre: Option<i64> = session
        .old_input
        .get("genre_id")
        .and_then(|v| v.parse().ok())
        .or(book.map(|b| b.genre_id));
    let checked_platforms: Vec<i64> = match session.old_multi.get("platform_ids") {
        Some(old_ids) => old_ids.iter().filter_map(|v| v.parse().ok()).collect(),
        None => linked_platform_ids.to_vec(),
    };

    let mut genre_select = String::new();
    for genre in genre_options {
        let id = genre.id.unwrap_or_default();
        let selected = if Some(id) == selected_genre { " selected" } else { "" };
        genre_select.push_str(&format!(
            r#"<option value="{}"{}>{}</option>"#,
            id,
            selected,
            h(&genre.name)
        ));
    }

    let mut platform_checkboxes = String::new();
    for platform in platform_options {
        let id = platform.id.unwrap_or_default();
        let checked = if checked_platforms.contains(&id) { " checked" } else { "" };
        platform_checkboxes.push_str(&format!(
            r#"<div>
                <input type="checkbox" id="platform_{id}" name="platform_ids" value="{id}"{checked}>
                <label for="platform_{id}" style="display:inline;font-weight:normal">{name}</label>
            </div>"#,
            id = id,
            checked = checked,
            name = h(&platform.name),
        ));
    }

    let current_image = match book.and_then(|b| b.image_filename.as_deref()) {
        Some(filename) => format!(
            r#"<img class="cover" src="/images/{}" alt="Current cover">"#,
            h(filename)
        ),
        None => String::new(),
    };
    let image_label = if book.is_some() { "Image (optional):" } else { "Image:" };

    format!(
        r#"<form method="POST" action="{action}" enctype="multipart/form-data">
            <div class="input">
                <label for="title">Title:</label>
                <input type="text" id="title" name="title" value="{title}">
                {title_error}
            </div>
            <div class="input">
                <label for="release_date">Release Date:</label>
                <input type="date" id="release_date" name="release_date" value="{release_date}">
                {release_date_error}
            </div>
            <div class="input">
                <label for="genre_id">Genre:</label>
                <select id="genre_id" name="genre_id">{genre_select}</select>
                {genre_error}
            </div>
            <div class="input">
                <label for="description">Description:</label>
                <textarea id="description" name="description">{description}</textarea>
                {description_error}
            </div>
            <div class="input">
                <label>Platforms:</label>
                {platform_checkboxes}
                {platforms_error}
            </div>
            {current_image}
            <div class="input">
                <label for="image">{image_label}</label>
                <input type="file" id="image" name="image" accept="image/*">
                {image_error}
            </div>
            <div class="input">
                <button class="button" type="submit">{submit_label}</button>
                <a href="/">Cancel</a>
            </div>
        </form>"#,
        action = action,
        title = h(&title),
        title_error = field_error_html(&session.field_errors, "title"),
        release_date = h(&release_date),
        release_date_error = field_error_html(&session.field_errors, "release_date"),
        genre_select = genre_select,
        genre_error = field_error_html(&session.field_errors, "genre_id"),
        description = h(&description),
        description_error = field_error_html(&session.field_errors, "description"),
        platform_checkboxes = platform_checkboxes,
        platforms_error = field_error_html(&session.field_errors, "platform_ids"),
        current_image = current_image,
        image_label = image_label,
        image_error = field_error_html(&session.field_errors, "image"),
        submit_label = submit_label,
    )
}

/// GET /books/new - create form
pub async fn book_create_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = take_session(&state, &headers).await;

    let (genre_options, platform_options) = match (
        genres::find_all(&state.db).await,
        platforms::find_all(&state.db).await,
    ) {
        (Ok(g), Ok(p)) => (g, p),
        _ => return redirect_with_error(&state, &headers, "Failed to load form options.", "/").await,
    };

    let body = book_form_body(
        "/books",
        "Create Book",
        None,
        &[],
        &genre_options,
        &platform_options,
        &session,
    );
    layout("Add Book", &session.flash, &body).into_response()
}

/// GET /books/:id/edit - edit form
pub async fn book_edit_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let session = take_session(&state, &headers).await;

    let book = match books::find_by_id(&state.db, id).await {
        Ok(Some(book)) => book,
        Ok(None) => return redirect_with_error(&state, &headers, "Book not found.", "/").await,
        Err(e) => return redirect_with_error(&state, &headers, &format!("Error: {}", e), "/").await,
    };

    let (genre_options, platform_options) = match (
        genres::find_all(&state.db).await,
        platforms::find_all(&state.db).await,
    ) {
        (Ok(g), Ok(p)) => (g, p),
        _ => return redirect_with_error(&state, &headers, "Failed to load form options.", "/").await,
    };

    let linked_ids: Vec<i64> = book_platforms::platforms_for_book(&state.db, id)
        .await
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.id)
        .collect();

    let body = book_form_body(
        &format!("/books/{}", id),
        "Update Book",
        Some(&book),
        &linked_ids,
        &genre_options,
        &platform_options,
        &session,
    );
    layout("Edit Book", &session.flash, &body).into_response()
}

// ============================================================================
// Lookup entity pages (genres, platforms, publishers, formats)
// ============================================================================

/// Render a name-only entity listing
fn lookup_list_body(base: &str, items: &[(i64, String)]) -> String {
    let mut rows = String::new();
    for (id, name) in items {
        rows.push_str(&format!(
            r#"<tr>
                <td>{name}</td>
                <td><a href="{base}/{id}/edit">Edit</a></td>
                <td>
                    <form method="POST" action="{base}/{id}/delete" style="display:inline">
                        <button class="button button-danger" type="submit">Delete</button>
                    </form>
                </td>
            </tr>"#,
            name = h(name),
            base = base,
            id = id,
        ));
    }

    format!(
        r#"<p><a class="button" href="{base}/new">Add</a></p>
        <table>
            <tr><th>Name</th><th></th><th></th></tr>
            {rows}
        </table>"#,
        base = base,
        rows = rows,
    )
}

/// Render a name-only entity form
fn lookup_form_body(action: &str, submit_label: &str, name: &str, session: &SessionData) -> String {
    let value = session
        .old_input
        .get("name")
        .cloned()
        .unwrap_or_else(|| name.to_string());

    format!(
        r#"<form method="POST" action="{action}">
            <div class="input">
                <label for="name">Name:</label>
                <input type="text" id="name" name="name" value="{value}">
                {name_error}
            </div>
            <div class="input">
                <button class="button" type="submit">{submit_label}</button>
            </div>
        </form>"#,
        action = action,
        value = h(&value),
        name_error = field_error_html(&session.field_errors, "name"),
        submit_label = submit_label,
    )
}

macro_rules! lookup_pages {
    ($list_fn:ident, $create_fn:ident, $edit_fn:ident, $repo:ident, $base:literal, $title:literal) => {
        pub async fn $list_fn(State(state): State<AppState>, headers: HeaderMap) -> Response {
            let session = take_session(&state, &headers).await;
            let items: Vec<(i64, String)> = match $repo::find_all(&state.db).await {
                Ok(records) => records
                    .into_iter()
                    .filter_map(|r| r.id.map(|id| (id, r.name)))
                    .collect(),
                Err(e) => {
                    return redirect_with_error(&state, &headers, &format!("Error: {}", e), "/")
                        .await
                }
            };
            layout($title, &session.flash, &lookup_list_body($base, &items)).into_response()
        }

        pub async fn $create_fn(State(state): State<AppState>, headers: HeaderMap) -> Response {
            let session = take_session(&state, &headers).await;
            let body = lookup_form_body($base, "Create", "", &session);
            layout(concat!("Add - ", $title), &session.flash, &body).into_response()
        }

        pub async fn $edit_fn(
            State(state): State<AppState>,
            Path(id): Path<i64>,
            headers: HeaderMap,
        ) -> Response {
            let session = take_session(&state, &headers).await;
            let record = match $repo::find_by_id(&state.db, id).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    return redirect_with_error(&state, &headers, "Record not found.", $base).await
                }
                Err(e) => {
                    return redirect_with_error(&state, &headers, &format!("Error: {}", e), $base)
                        .await
                }
            };
            let body = lookup_form_body(&format!("{}/{}", $base, id), "Update", &record.name, &session);
            layout(concat!("Edit - ", $title), &session.flash, &body).into_response()
        }
    };
}

lookup_pages!(genre_list_page, genre_create_page, genre_edit_page, genres, "/genres", "Genres");
lookup_pages!(platform_list_page, platform_create_page, platform_edit_page, platforms, "/platforms", "Platforms");
lookup_pages!(publisher_list_page, publisher_create_page, publisher_edit_page, publishers, "/publishers", "Publishers");
lookup_pages!(format_list_page, format_create_page, format_edit_page, formats, "/formats", "Formats");
