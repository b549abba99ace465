//! Remote news API access.
//!
//! - [`source`] - the [`ArticleSource`] trait the pagination engine consumes
//! - [`client`] - `reqwest` implementation against the spaceflight news API
//! - [`types`] - wire DTOs and their conversion into cached [`Article`]s
//!
//! [`Article`]: crate::storage::Article

mod client;
mod source;
mod types;

pub use client::{ApiError, NewsApiClient, DEFAULT_BASE_URL};
pub use source::ArticleSource;
pub use types::{ArticleListResponse, ArticlePage, RemoteArticle};
