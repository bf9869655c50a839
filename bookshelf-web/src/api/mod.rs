//! HTTP handlers: HTML pages, form actions, and the JSON API

pub mod books;
pub mod catalog;
pub mod json;
pub mod pages;
