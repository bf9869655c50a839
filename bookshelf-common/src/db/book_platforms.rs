//! Book/platform association helper
//!
//! Manages the many-to-many join rows between books and platforms. Rows are
//! identified by the (book_id, platform_id) pair alone.

use crate::db::models::Platform;
use crate::Result;
use sqlx::{Row, SqlitePool};

/// Platforms currently linked to a book, ordered by platform name
pub async fn platforms_for_book(pool: &SqlitePool, book_id: i64) -> Result<Vec<Platform>> {
    let rows = sqlx::query(
        r#"
        SELECT p.id, p.name
        FROM platforms p
        INNER JOIN book_platforms bp ON p.id = bp.platform_id
        WHERE bp.book_id = ?
        ORDER BY p.name
        "#,
    )
    .bind(book_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Platform { id: Some(row.get("id")), name: row.get("name") })
        .collect())
}

/// Insert one association row
///
/// Idempotent: inserting an already-linked pair is a no-op via
/// ON CONFLICT DO NOTHING rather than an error.
pub async fn link(pool: &SqlitePool, book_id: i64, platform_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO book_platforms (book_id, platform_id)
        VALUES (?, ?)
        ON CONFLICT(book_id, platform_id) DO NOTHING
        "#,
    )
    .bind(book_id)
    .bind(platform_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Replace a book's platform links with exactly the given set
///
/// Runs delete-all-then-insert inside one transaction so no reader observes a
/// partial set. Candidate ids are verified against the platforms table inside
/// the same transaction; unknown ids are skipped rather than failing the
/// whole operation. Returns the ids actually linked so callers can log drops.
pub async fn replace_links(
    pool: &SqlitePool,
    book_id: i64,
    platform_ids: &[i64],
) -> Result<Vec<i64>> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM book_platforms WHERE book_id = ?")
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

    let mut linked = Vec::new();
    for &platform_id in platform_ids {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM platforms WHERE id = ?)")
            .bind(platform_id)
            .fetch_one(&mut *tx)
            .await?;

        if !exists {
            continue;
        }

        sqlx::query(
            r#"
            INSERT INTO book_platforms (book_id, platform_id)
            VALUES (?, ?)
            ON CONFLICT(book_id, platform_id) DO NOTHING
            "#,
        )
        .bind(book_id)
        .bind(platform_id)
        .execute(&mut *tx)
        .await?;

        linked.push(platform_id);
    }

    tx.commit().await?;
    Ok(linked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_test_database;
    use crate::db::models::{Book, Genre};
    use crate::db::{books, genres, platforms};

    async fn pool_with_book_and_platforms() -> (SqlitePool, i64, Vec<i64>) {
        let pool = init_test_database().await.unwrap();

        let mut genre = Genre { id: None, name: "Mystery".to_string() };
        genres::save(&pool, &mut genre).await.unwrap();

        let mut book = Book {
            id: None,
            title: "Gaudy Night".to_string(),
            release_date: "1935-11-04".to_string(),
            genre_id: genre.id.unwrap(),
            description: "Harriet Vane returns to Oxford.".to_string(),
            image_filename: None,
        };
        books::save(&pool, &mut book).await.unwrap();

        let mut ids = Vec::new();
        for name in ["Print", "Kindle", "Kobo"] {
            let mut platform = Platform { id: None, name: name.to_string() };
            platforms::save(&pool, &mut platform).await.unwrap();
            ids.push(platform.id.unwrap());
        }

        (pool, book.id.unwrap(), ids)
    }

    #[tokio::test]
    async fn link_is_idempotent_for_duplicate_pairs() {
        let (pool, book_id, platform_ids) = pool_with_book_and_platforms().await;

        link(&pool, book_id, platform_ids[0]).await.unwrap();
        link(&pool, book_id, platform_ids[0]).await.unwrap();

        let linked = platforms_for_book(&pool, book_id).await.unwrap();
        assert_eq!(linked.len(), 1);
    }

    #[tokio::test]
    async fn platforms_for_book_ordered_by_name() {
        let (pool, book_id, platform_ids) = pool_with_book_and_platforms().await;

        for id in &platform_ids {
            link(&pool, book_id, *id).await.unwrap();
        }

        let names: Vec<String> = platforms_for_book(&pool, book_id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["Kindle", "Kobo", "Print"]);
    }

    #[tokio::test]
    async fn replace_links_drops_unknown_ids_and_succeeds() {
        let (pool, book_id, platform_ids) = pool_with_book_and_platforms().await;

        let requested = vec![platform_ids[0], platform_ids[1], 999];
        let linked = replace_links(&pool, book_id, &requested).await.unwrap();

        assert_eq!(linked, vec![platform_ids[0], platform_ids[1]]);
        assert_eq!(platforms_for_book(&pool, book_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn replace_links_yields_exactly_the_new_set() {
        let (pool, book_id, platform_ids) = pool_with_book_and_platforms().await;

        replace_links(&pool, book_id, &platform_ids).await.unwrap();
        replace_links(&pool, book_id, &platform_ids[2..]).await.unwrap();

        let linked = platforms_for_book(&pool, book_id).await.unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id, Some(platform_ids[2]));
    }

    #[tokio::test]
    async fn replace_links_with_empty_set_clears_all() {
        let (pool, book_id, platform_ids) = pool_with_book_and_platforms().await;

        replace_links(&pool, book_id, &platform_ids).await.unwrap();
        let linked = replace_links(&pool, book_id, &[]).await.unwrap();

        assert!(linked.is_empty());
        assert!(platforms_for_book(&pool, book_id).await.unwrap().is_empty());
    }
}
