//! Book repository
//!
//! All query parameters are bound, never interpolated. Lookups that miss
//! return `Ok(None)`; only contract violations (affected-row mismatch,
//! missing generated id) and database failures produce errors.

use crate::db::models::Book;
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

fn book_from_row(row: &SqliteRow) -> Book {
    Book {
        id: Some(row.get("id")),
        title: row.get("title"),
        release_date: row.get("release_date"),
        genre_id: row.get("genre_id"),
        description: row.get("description"),
        image_filename: row.get("image_filename"),
    }
}

/// Find all books ordered by title
pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Book>> {
    let rows = sqlx::query("SELECT * FROM books ORDER BY title")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(book_from_row).collect())
}

/// Find a book by id, `None` when no row matches
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Book>> {
    let row = sqlx::query("SELECT * FROM books WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(book_from_row))
}

/// Find all books in a genre, ordered by title
pub async fn find_by_genre(pool: &SqlitePool, genre_id: i64) -> Result<Vec<Book>> {
    let rows = sqlx::query("SELECT * FROM books WHERE genre_id = ? ORDER BY title")
        .bind(genre_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(book_from_row).collect())
}

/// Find all books available on a platform, ordered by title
///
/// Joins through the book_platforms association table.
pub async fn find_by_platform(pool: &SqlitePool, platform_id: i64) -> Result<Vec<Book>> {
    let rows = sqlx::query(
        r#"
        SELECT b.*
        FROM books b
        INNER JOIN book_platforms bp ON b.id = bp.book_id
        WHERE bp.platform_id = ?
        ORDER BY b.title
        "#,
    )
    .bind(platform_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(book_from_row).collect())
}

/// Save a book: INSERT when the id is unset, UPDATE otherwise
///
/// An INSERT must yield a generated rowid, which is written back into the
/// record. An UPDATE must affect exactly one row; zero rows means the record
/// vanished under us, which is reported as a persistence failure rather than
/// silently succeeding.
pub async fn save(pool: &SqlitePool, book: &mut Book) -> Result<()> {
    match book.id {
        Some(id) => {
            let result = sqlx::query(
                r#"
                UPDATE books
                SET title = ?,
                    release_date = ?,
                    genre_id = ?,
                    description = ?,
                    image_filename = ?,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = ?
                "#,
            )
            .bind(&book.title)
            .bind(&book.release_date)
            .bind(book.genre_id)
            .bind(&book.description)
            .bind(&book.image_filename)
            .bind(id)
            .execute(pool)
            .await?;

            let affected = result.rows_affected();
            if affected != 1 {
                return Err(Error::Persistence(format!(
                    "update of book {} affected {} rows, expected 1",
                    id, affected
                )));
            }
        }
        None => {
            let result = sqlx::query(
                r#"
                INSERT INTO books (title, release_date, genre_id, description, image_filename)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&book.title)
            .bind(&book.release_date)
            .bind(book.genre_id)
            .bind(&book.description)
            .bind(&book.image_filename)
            .execute(pool)
            .await?;

            let id = result.last_insert_rowid();
            if id <= 0 {
                return Err(Error::Persistence(
                    "insert reported no generated book id".to_string(),
                ));
            }
            book.id = Some(id);
        }
    }

    Ok(())
}

/// Delete a book
///
/// Returns `Ok(false)` when the record has no id. Otherwise returns whether
/// the statement was acknowledged, not whether a row actually existed.
pub async fn delete(pool: &SqlitePool, book: &Book) -> Result<bool> {
    let Some(id) = book.id else {
        return Ok(false);
    };

    sqlx::query("DELETE FROM books WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_test_database;
    use crate::db::{book_platforms, genres, platforms};
    use crate::db::models::{Genre, Platform};

    async fn seeded_pool() -> (SqlitePool, i64) {
        let pool = init_test_database().await.expect("in-memory db");
        let mut genre = Genre { id: None, name: "Fantasy".to_string() };
        genres::save(&pool, &mut genre).await.expect("seed genre");
        (pool, genre.id.unwrap())
    }

    fn sample_book(genre_id: i64) -> Book {
        Book {
            id: None,
            title: "The Left Hand of Darkness".to_string(),
            release_date: "1969-03-01".to_string(),
            genre_id,
            description: "An envoy to the planet Gethen.".to_string(),
            image_filename: None,
        }
    }

    #[tokio::test]
    async fn save_then_find_by_id_round_trips_all_fields() {
        let (pool, genre_id) = seeded_pool().await;

        let mut book = sample_book(genre_id);
        book.image_filename = Some("abc123.jpg".to_string());
        save(&pool, &mut book).await.expect("insert");

        let id = book.id.expect("generated id");
        assert!(id > 0);

        let loaded = find_by_id(&pool, id).await.unwrap().expect("book found");
        assert_eq!(loaded, book);
    }

    #[tokio::test]
    async fn resave_updates_in_place_without_duplicating() {
        let (pool, genre_id) = seeded_pool().await;

        let mut book = sample_book(genre_id);
        save(&pool, &mut book).await.expect("insert");
        let id = book.id.unwrap();

        book.title = "The Dispossessed".to_string();
        save(&pool, &mut book).await.expect("update");

        assert_eq!(book.id, Some(id), "update must not reassign the id");

        let all = find_all(&pool).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "The Dispossessed");
    }

    #[tokio::test]
    async fn update_of_vanished_row_is_a_persistence_failure() {
        let (pool, genre_id) = seeded_pool().await;

        let mut book = sample_book(genre_id);
        book.id = Some(4242);

        let err = save(&pool, &mut book).await.expect_err("no such row");
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[tokio::test]
    async fn find_by_id_miss_returns_none() {
        let (pool, _) = seeded_pool().await;
        let missing = find_by_id(&pool, 999).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn delete_without_id_returns_false() {
        let (pool, genre_id) = seeded_pool().await;
        let book = sample_book(genre_id);
        assert!(!delete(&pool, &book).await.unwrap());
    }

    #[tokio::test]
    async fn delete_of_nonexistent_row_is_acknowledged() {
        let (pool, genre_id) = seeded_pool().await;
        let mut book = sample_book(genre_id);
        book.id = Some(777);
        // Acknowledgement, not row existence
        assert!(delete(&pool, &book).await.unwrap());
    }

    #[tokio::test]
    async fn find_all_orders_by_title() {
        let (pool, genre_id) = seeded_pool().await;

        for title in ["Zothique", "Annihilation", "Middlemarch"] {
            let mut book = sample_book(genre_id);
            book.title = title.to_string();
            save(&pool, &mut book).await.unwrap();
        }

        let titles: Vec<String> = find_all(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, ["Annihilation", "Middlemarch", "Zothique"]);
    }

    #[tokio::test]
    async fn find_by_platform_joins_through_associations() {
        let (pool, genre_id) = seeded_pool().await;

        let mut platform = Platform { id: None, name: "Kindle".to_string() };
        platforms::save(&pool, &mut platform).await.unwrap();
        let platform_id = platform.id.unwrap();

        let mut linked = sample_book(genre_id);
        save(&pool, &mut linked).await.unwrap();
        let mut unlinked = sample_book(genre_id);
        unlinked.title = "Unlinked".to_string();
        save(&pool, &mut unlinked).await.unwrap();

        book_platforms::link(&pool, linked.id.unwrap(), platform_id)
            .await
            .unwrap();

        let found = find_by_platform(&pool, platform_id).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, linked.id);
    }
}
