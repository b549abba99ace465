//! Spaceflight news reader with an offline, paginated SQLite cache.
//!
//! [`repository::ArticleRepository`] is the entry point: it hands out
//! [`paging::ArticlePager`]s for the listing and search results, and answers
//! single-article lookups cache first.

pub mod api;
pub mod config;
pub mod error;
pub mod paging;
pub mod repository;
pub mod storage;
pub mod util;
