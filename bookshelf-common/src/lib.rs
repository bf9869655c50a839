//! # Bookshelf Common Library
//!
//! Shared code for the bookshelf catalog application:
//! - Database initialization and schema
//! - Record types and per-entity repositories
//! - Configuration loading
//! - Error types

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
