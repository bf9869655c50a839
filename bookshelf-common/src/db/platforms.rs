//! Platform repository

use crate::db::models::Platform;
use crate::{Error, Result};
use sqlx::{Row, SqlitePool};

/// Find all platforms ordered by name
pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Platform>> {
    let rows = sqlx::query("SELECT id, name FROM platforms ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| Platform { id: Some(row.get("id")), name: row.get("name") })
        .collect())
}

/// Find a platform by id, `None` when no row matches
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Platform>> {
    let row = sqlx::query("SELECT id, name FROM platforms WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Platform { id: Some(row.get("id")), name: row.get("name") }))
}

/// Save a platform: INSERT when the id is unset, UPDATE otherwise
pub async fn save(pool: &SqlitePool, platform: &mut Platform) -> Result<()> {
    match platform.id {
        Some(id) => {
            let result = sqlx::query("UPDATE platforms SET name = ? WHERE id = ?")
                .bind(&platform.name)
                .bind(id)
                .execute(pool)
                .await?;

            if result.rows_affected() != 1 {
                return Err(Error::Persistence(format!(
                    "update of platform {} affected {} rows, expected 1",
                    id,
                    result.rows_affected()
                )));
            }
        }
        None => {
            let result = sqlx::query("INSERT INTO platforms (name) VALUES (?)")
                .bind(&platform.name)
                .execute(pool)
                .await?;

            let id = result.last_insert_rowid();
            if id <= 0 {
                return Err(Error::Persistence(
                    "insert reported no generated platform id".to_string(),
                ));
            }
            platform.id = Some(id);
        }
    }

    Ok(())
}

/// Delete a platform; `Ok(false)` when the record has no id
pub async fn delete(pool: &SqlitePool, platform: &Platform) -> Result<bool> {
    let Some(id) = platform.id else {
        return Ok(false);
    };

    sqlx::query("DELETE FROM platforms WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(true)
}
