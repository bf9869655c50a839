//! Genre repository

use crate::db::models::Genre;
use crate::{Error, Result};
use sqlx::{Row, SqlitePool};

/// Find all genres ordered by name
pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Genre>> {
    let rows = sqlx::query("SELECT id, name FROM genres ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| Genre { id: Some(row.get("id")), name: row.get("name") })
        .collect())
}

/// Find a genre by id, `None` when no row matches
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Genre>> {
    let row = sqlx::query("SELECT id, name FROM genres WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Genre { id: Some(row.get("id")), name: row.get("name") }))
}

/// Save a genre: INSERT when the id is unset, UPDATE otherwise
pub async fn save(pool: &SqlitePool, genre: &mut Genre) -> Result<()> {
    match genre.id {
        Some(id) => {
            let result = sqlx::query("UPDATE genres SET name = ? WHERE id = ?")
                .bind(&genre.name)
                .bind(id)
                .execute(pool)
                .await?;

            if result.rows_affected() != 1 {
                return Err(Error::Persistence(format!(
                    "update of genre {} affected {} rows, expected 1",
                    id,
                    result.rows_affected()
                )));
            }
        }
        None => {
            let result = sqlx::query("INSERT INTO genres (name) VALUES (?)")
                .bind(&genre.name)
                .execute(pool)
                .await?;

            let id = result.last_insert_rowid();
            if id <= 0 {
                return Err(Error::Persistence(
                    "insert reported no generated genre id".to_string(),
                ));
            }
            genre.id = Some(id);
        }
    }

    Ok(())
}

/// Delete a genre; `Ok(false)` when the record has no id
pub async fn delete(pool: &SqlitePool, genre: &Genre) -> Result<bool> {
    let Some(id) = genre.id else {
        return Ok(false);
    };

    sqlx::query("DELETE FROM genres WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_test_database;

    #[tokio::test]
    async fn save_and_find_ordered_by_name() {
        let pool = init_test_database().await.unwrap();

        for name in ["Western", "Biography", "Poetry"] {
            let mut genre = Genre { id: None, name: name.to_string() };
            save(&pool, &mut genre).await.unwrap();
            assert!(genre.id.unwrap() > 0);
        }

        let names: Vec<String> = find_all(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, ["Biography", "Poetry", "Western"]);
    }

    #[tokio::test]
    async fn rename_persists() {
        let pool = init_test_database().await.unwrap();

        let mut genre = Genre { id: None, name: "Scifi".to_string() };
        save(&pool, &mut genre).await.unwrap();

        genre.name = "Science Fiction".to_string();
        save(&pool, &mut genre).await.unwrap();

        let loaded = find_by_id(&pool, genre.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Science Fiction");
    }
}
