//! Database layer: initialization, record types, and per-entity repositories

pub mod book_platforms;
pub mod books;
pub mod formats;
pub mod genres;
pub mod init;
pub mod models;
pub mod platforms;
pub mod publishers;
