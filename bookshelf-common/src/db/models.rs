//! Catalog record types
//!
//! Records are transient: constructed per request (from a row, from form
//! input, or empty), persisted via the repository `save` functions, and never
//! cached across requests. The serde field set of each record is the fixed
//! field mapping exposed by the JSON API.

use serde::{Deserialize, Serialize};

/// A book in the catalog
///
/// `id` is `None` until the record has been inserted; `image_filename` is
/// `None` until an image has been processed for it. `release_date` is stored
/// as an ISO-8601 date string (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: Option<i64>,
    pub title: String,
    pub release_date: String,
    pub genre_id: i64,
    pub description: String,
    pub image_filename: Option<String>,
}

/// A genre a book can belong to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: Option<i64>,
    pub name: String,
}

/// A publisher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publisher {
    pub id: Option<i64>,
    pub name: String,
}

/// A physical or digital format (hardcover, ebook, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Format {
    pub id: Option<i64>,
    pub name: String,
}

/// A platform a book is available on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub id: Option<i64>,
    pub name: String,
}
