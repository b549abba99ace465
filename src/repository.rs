//! Entry point for presentation code: paged listings and single-article lookup.
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::api::ArticleSource;
use crate::error::ArticleError;
use crate::paging::{ArticlePager, MediatorRegistry, PagingConfig};
use crate::storage::{Article, Database, Scope};

pub struct ArticleRepository {
    db: Database,
    source: Arc<dyn ArticleSource>,
    registry: MediatorRegistry,
    config: PagingConfig,
}

impl ArticleRepository {
    pub fn new(
        db: Database,
        source: Arc<dyn ArticleSource>,
        config: PagingConfig,
        max_mediators: NonZeroUsize,
    ) -> Self {
        let registry = MediatorRegistry::new(db.clone(), source.clone(), max_mediators);
        Self {
            db,
            source,
            registry,
            config,
        }
    }

    /// Paged listing for `query`; `None` or `""` lists everything.
    ///
    /// Every pager for the same query shares one mediator, so their remote
    /// loads are serialized.
    pub fn articles(&self, query: Option<&str>) -> ArticlePager {
        ArticlePager::new(self.db.clone(), self.registry.get(query), self.config)
    }

    /// Look up one article, cache first.
    ///
    /// A cache miss falls back to the remote source and writes the result
    /// into the unfiltered listing's cache. Any failure on that path is
    /// reported as [`ArticleError::NotFound`] carrying the underlying cause.
    pub async fn article(&self, id: i64) -> Result<Article, ArticleError> {
        match self.db.article_by_id(id).await {
            Ok(Some(article)) => return Ok(article),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(id, error = %e, "Cache lookup failed, trying remote");
            }
        }

        let article = match self.source.fetch_article(id).await {
            Ok(remote) => remote.into_article(),
            Err(e) => {
                let cause = ArticleError::from(e);
                tracing::warn!(id, error = %cause, "Remote lookup failed");
                return Err(ArticleError::not_found(id, cause));
            }
        };

        if let Err(e) = self.db.upsert_articles(&Scope::all(), &[article.clone()]).await {
            tracing::warn!(id, error = %e, "Failed to cache fetched article");
            return Err(ArticleError::not_found(id, e.into()));
        }

        tracing::debug!(id, "Cached article from remote lookup");
        Ok(article)
    }

    pub fn registry(&self) -> &MediatorRegistry {
        &self.registry
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
