//! Publisher repository

use crate::db::models::Publisher;
use crate::{Error, Result};
use sqlx::{Row, SqlitePool};

/// Find all publishers ordered by name
pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Publisher>> {
    let rows = sqlx::query("SELECT id, name FROM publishers ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| Publisher { id: Some(row.get("id")), name: row.get("name") })
        .collect())
}

/// Find a publisher by id, `None` when no row matches
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Publisher>> {
    let row = sqlx::query("SELECT id, name FROM publishers WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Publisher { id: Some(row.get("id")), name: row.get("name") }))
}

/// Save a publisher: INSERT when the id is unset, UPDATE otherwise
pub async fn save(pool: &SqlitePool, publisher: &mut Publisher) -> Result<()> {
    match publisher.id {
        Some(id) => {
            let result = sqlx::query("UPDATE publishers SET name = ? WHERE id = ?")
                .bind(&publisher.name)
                .bind(id)
                .execute(pool)
                .await?;

            if result.rows_affected() != 1 {
                return Err(Error::Persistence(format!(
                    "update of publisher {} affected {} rows, expected 1",
                    id,
                    result.rows_affected()
                )));
            }
        }
        None => {
            let result = sqlx::query("INSERT INTO publishers (name) VALUES (?)")
                .bind(&publisher.name)
                .execute(pool)
                .await?;

            let id = result.last_insert_rowid();
            if id <= 0 {
                return Err(Error::Persistence(
                    "insert reported no generated publisher id".to_string(),
                ));
            }
            publisher.id = Some(id);
        }
    }

    Ok(())
}

/// Delete a publisher; `Ok(false)` when the record has no id
pub async fn delete(pool: &SqlitePool, publisher: &Publisher) -> Result<bool> {
    let Some(id) = publisher.id else {
        return Ok(false);
    };

    sqlx::query("DELETE FROM publishers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(true)
}
