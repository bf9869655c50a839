//! Format repository

use crate::db::models::Format;
use crate::{Error, Result};
use sqlx::{Row, SqlitePool};

/// Find all formats ordered by name
pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Format>> {
    let rows = sqlx::query("SELECT id, name FROM formats ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| Format { id: Some(row.get("id")), name: row.get("name") })
        .collect())
}

/// Find a format by id, `None` when no row matches
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Format>> {
    let row = sqlx::query("SELECT id, name FROM formats WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Format { id: Some(row.get("id")), name: row.get("name") }))
}

/// Save a format: INSERT when the id is unset, UPDATE otherwise
pub async fn save(pool: &SqlitePool, format: &mut Format) -> Result<()> {
    match format.id {
        Some(id) => {
            let result = sqlx::query("UPDATE formats SET name = ? WHERE id = ?")
                .bind(&format.name)
                .bind(id)
                .execute(pool)
                .await?;

            if result.rows_affected() != 1 {
                return Err(Error::Persistence(format!(
                    "update of format {} affected {} rows, expected 1",
                    id,
                    result.rows_affected()
                )));
            }
        }
        None => {
            let result = sqlx::query("INSERT INTO formats (name) VALUES (?)")
                .bind(&format.name)
                .execute(pool)
                .await?;

            let id = result.last_insert_rowid();
            if id <= 0 {
                return Err(Error::Persistence(
                    "insert reported no generated format id".to_string(),
                ));
            }
            format.id = Some(id);
        }
    }

    Ok(())
}

/// Delete a format; `Ok(false)` when the record has no id
pub async fn delete(pool: &SqlitePool, format: &Format) -> Result<bool> {
    let Some(id) = format.id else {
        return Ok(false);
    };

    sqlx::query("DELETE FROM formats WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(true)
}
