//! Database initialization
//!
//! Creates the database file on first run, applies connection pragmas, and
//! creates all catalog tables idempotently. Safe to call repeatedly and from
//! concurrent processes.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Set busy timeout so request handlers wait out short lock contention
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Schema creation (idempotent - safe to call multiple times)
    create_genres_table(&pool).await?;
    create_publishers_table(&pool).await?;
    create_formats_table(&pool).await?;
    create_platforms_table(&pool).await?;
    create_books_table(&pool).await?;
    create_book_platforms_table(&pool).await?;

    // Seed lookup tables so a fresh install renders usable forms
    seed_defaults(&pool).await?;

    Ok(pool)
}

/// Create the genres table
pub async fn create_genres_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS genres (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the publishers table
pub async fn create_publishers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS publishers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the formats table
pub async fn create_formats_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS formats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the platforms table
pub async fn create_platforms_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS platforms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the books table
///
/// `genre_id` carries a foreign key for integrity, but the application also
/// verifies the genre exists before saving so the user sees a form error
/// instead of a constraint violation.
pub async fn create_books_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            release_date TEXT NOT NULL,
            genre_id INTEGER NOT NULL REFERENCES genres(id),
            description TEXT NOT NULL,
            image_filename TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (length(title) > 0),
            CHECK (length(title) <= 255)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_books_genre ON books(genre_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_books_title ON books(title)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the book_platforms join table
///
/// Association rows have no identity beyond the (book_id, platform_id) pair;
/// the composite primary key enforces uniqueness per pair.
pub async fn create_book_platforms_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS book_platforms (
            book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
            platform_id INTEGER NOT NULL REFERENCES platforms(id) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (book_id, platform_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_book_platforms_platform ON book_platforms(platform_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed default lookup rows
///
/// Uses INSERT OR IGNORE keyed on the unique name so re-initialization and
/// concurrent startup never duplicate rows or clobber user edits.
pub async fn seed_defaults(pool: &SqlitePool) -> Result<()> {
    let genres = ["Fantasy", "Science Fiction", "Mystery", "Non-fiction", "Horror"];
    for name in genres {
        sqlx::query("INSERT OR IGNORE INTO genres (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await?;
    }

    let platforms = ["Print", "Kindle", "Kobo", "Apple Books", "Audible"];
    for name in platforms {
        sqlx::query("INSERT OR IGNORE INTO platforms (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await?;
    }

    let formats = ["Hardcover", "Paperback", "Ebook", "Audiobook"];
    for name in formats {
        sqlx::query("INSERT OR IGNORE INTO formats (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await?;
    }

    let publishers = ["Tor Books", "Penguin Random House", "HarperCollins", "Orbit"];
    for name in publishers {
        sqlx::query("INSERT OR IGNORE INTO publishers (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await?;
    }

    info!("Default lookup rows seeded");
    Ok(())
}

/// Create an in-memory database with the full schema, for tests
///
/// Capped at one connection: every connection to `sqlite::memory:` opens its
/// own blank database, so the pool must hand out the same one.
pub async fn init_test_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    create_genres_table(&pool).await?;
    create_publishers_table(&pool).await?;
    create_formats_table(&pool).await?;
    create_platforms_table(&pool).await?;
    create_books_table(&pool).await?;
    create_book_platforms_table(&pool).await?;

    Ok(pool)
}
