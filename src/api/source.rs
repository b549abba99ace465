use async_trait::async_trait;

use super::client::ApiError;
use super::types::{ArticlePage, RemoteArticle};

/// Offset-paginated remote article source.
///
/// Implementations make exactly one attempt per call; retrying is left to
/// whoever drives the pagination.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetch `limit` articles starting at `offset`, optionally filtered by a
    /// server-side search term.
    async fn fetch_page(
        &self,
        limit: usize,
        offset: usize,
        search: Option<&str>,
    ) -> Result<ArticlePage, ApiError>;

    /// Fetch a single article by id.
    async fn fetch_article(&self, id: i64) -> Result<RemoteArticle, ApiError>;
}
