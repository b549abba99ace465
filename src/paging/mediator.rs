use std::sync::Arc;
use tokio::sync::Mutex;

use super::state::PagingState;
use crate::api::{ArticlePage, ArticleSource};
use crate::error::ArticleError;
use crate::storage::{Article, Database, DatabaseError, RemoteKey, Scope};

/// Direction of a load requested by the pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadType {
    /// Reload the window around the anchor, replacing the scope's cache
    Refresh,
    /// Extend the window before the first loaded item
    Prepend,
    /// Extend the window after the last loaded item
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediatorResult {
    Success { end_of_pagination_reached: bool },
    Error(ArticleError),
}

impl MediatorResult {
    fn success(end_of_pagination_reached: bool) -> Self {
        MediatorResult::Success {
            end_of_pagination_reached,
        }
    }
}

// ============================================================================
// Mediator
// ============================================================================

/// Keeps the cache for one query scope in step with the remote listing.
///
/// All cursor state lives in the `remote_keys` table, so a mediator can be
/// dropped and recreated at any time. Loads on one instance are serialized;
/// loads on different scopes never wait on each other.
pub struct ArticleMediator {
    db: Database,
    source: Arc<dyn ArticleSource>,
    scope: Scope,
    lock: Mutex<()>,
}

impl ArticleMediator {
    pub fn new(db: Database, source: Arc<dyn ArticleSource>, scope: Scope) -> Self {
        Self {
            db,
            source,
            scope,
            lock: Mutex::new(()),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Run one load cycle: derive the offset, fetch one page, commit it.
    ///
    /// The fetch completes before any transaction opens, so a failed or
    /// cancelled fetch never touches the cache.
    pub async fn load(&self, load_type: LoadType, state: &PagingState) -> MediatorResult {
        let _guard = self.lock.lock().await;

        match self.load_locked(load_type, state).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    scope = %self.scope,
                    load_type = ?load_type,
                    error = %err,
                    "Load failed"
                );
                MediatorResult::Error(err)
            }
        }
    }

    async fn load_locked(
        &self,
        load_type: LoadType,
        state: &PagingState,
    ) -> Result<MediatorResult, ArticleError> {
        let page_size = state.config.page_size;

        let offset = match load_type {
            LoadType::Refresh => {
                let key = match state
                    .anchor_position
                    .and_then(|anchor| state.closest_item_to_position(anchor))
                {
                    Some(article) => self.key_for(article).await?,
                    None => None,
                };
                key.and_then(|k| k.next_key)
                    .map_or(0, |next| next.saturating_sub(page_size as i64).max(0))
            }
            LoadType::Prepend => {
                let Some(key) = self.key_for_edge(state.first_item()).await? else {
                    return Ok(MediatorResult::success(false));
                };
                match key.prev_key {
                    Some(prev) => prev,
                    None => return Ok(MediatorResult::success(true)),
                }
            }
            LoadType::Append => {
                let Some(key) = self.key_for_edge(state.last_item()).await? else {
                    return Ok(MediatorResult::success(false));
                };
                let Some(next) = key.next_key else {
                    return Ok(MediatorResult::success(true));
                };
                let loaded = state.loaded_count();
                if key.prev_key.is_none() && loaded > page_size {
                    // Tail page came from a refresh; stored cursor has drifted
                    loaded as i64
                } else {
                    next
                }
            }
        };

        tracing::debug!(
            scope = %self.scope,
            load_type = ?load_type,
            offset,
            page_size,
            "Fetching page"
        );

        let page = self
            .source
            .fetch_page(page_size, offset.max(0) as usize, self.scope.filter())
            .await?;

        let end_of_pagination_reached = page.items.is_empty();
        self.commit_page(load_type, offset, page_size as i64, page)
            .await?;

        Ok(MediatorResult::success(end_of_pagination_reached))
    }

    async fn key_for(&self, article: &Article) -> Result<Option<RemoteKey>, DatabaseError> {
        self.db.remote_key_for(&self.scope, article.id).await
    }

    async fn key_for_edge(
        &self,
        article: Option<&Article>,
    ) -> Result<Option<RemoteKey>, DatabaseError> {
        match article {
            Some(article) => self.key_for(article).await,
            None => Ok(None),
        }
    }

    /// Write one fetched page and its cursors in a single transaction.
    ///
    /// Refresh clears the scope first; prepend and append are additive.
    async fn commit_page(
        &self,
        load_type: LoadType,
        offset: i64,
        page_size: i64,
        page: ArticlePage,
    ) -> Result<(), DatabaseError> {
        // Sub-page offsets come from the append correction; their previous page is row 0
        let prev_key = (offset > 0).then(|| (offset - page_size).max(0));
        let next_key = (!page.items.is_empty()).then_some(offset + page_size);

        let articles: Vec<Article> = page
            .items
            .into_iter()
            .map(|item| item.into_article())
            .collect();
        let keys: Vec<RemoteKey> = articles
            .iter()
            .map(|article| RemoteKey {
                article_id: article.id,
                prev_key,
                next_key,
            })
            .collect();

        let mut tx = self.db.begin().await?;
        if load_type == LoadType::Refresh {
            let cleared_keys = tx.clear_remote_keys(&self.scope).await?;
            let cleared_articles = tx.clear_articles(&self.scope).await?;
            tracing::debug!(
                scope = %self.scope,
                cleared_keys,
                cleared_articles,
                "Cleared previous generation"
            );
        }
        tx.upsert_remote_keys(&self.scope, &keys).await?;
        tx.upsert_articles(&self.scope, &articles).await?;
        tx.commit().await?;

        tracing::info!(
            scope = %self.scope,
            load_type = ?load_type,
            offset,
            fetched = articles.len(),
            total_count = page.total_count,
            "Committed page"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paging::fake::{FakeFailure, FakeSource};
    use crate::paging::state::PagingConfig;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const PAGE: usize = 5;

    fn config() -> PagingConfig {
        PagingConfig {
            page_size: PAGE,
            prefetch_distance: 1,
        }
    }

    async fn setup(remote_count: usize) -> (Database, Arc<FakeSource>, ArticleMediator) {
        let db = Database::open(":memory:").await.unwrap();
        let source = Arc::new(FakeSource::with_articles(remote_count));
        let mediator = ArticleMediator::new(db.clone(), source.clone(), Scope::all());
        (db, source, mediator)
    }

    /// State holding every cached row for the scope, one page per `PAGE` rows.
    async fn cached_state(db: &Database, scope: &Scope) -> PagingState {
        let rows = db.paged_articles(scope, 0, 500).await.unwrap();
        let mut state = PagingState::new(config());
        state.pages = rows.chunks(PAGE).map(<[Article]>::to_vec).collect();
        state
    }

    fn article(id: i64) -> Article {
        Article {
            id,
            title: format!("Cached {id}"),
            url: String::new(),
            image_url: String::new(),
            news_site: String::new(),
            summary: String::new(),
            published_at: format!("2024-01-01T00:00:{:02}Z", 59 - id),
        }
    }

    #[tokio::test]
    async fn test_cold_start_refresh_writes_one_page() {
        let db = Database::open(":memory:").await.unwrap();
        let source = Arc::new(FakeSource::with_articles(3));
        let mediator = ArticleMediator::new(db.clone(), source.clone(), Scope::all());
        let state = PagingState::new(PagingConfig::default());

        let result = mediator.load(LoadType::Refresh, &state).await;

        assert_eq!(result, MediatorResult::success(false));
        assert_eq!(source.offsets(), vec![0]);
        assert_eq!(db.count_articles(&Scope::all()).await.unwrap(), 3);
        assert_eq!(db.count_remote_keys(&Scope::all()).await.unwrap(), 3);
        for id in 1..=3 {
            let key = db.remote_key_for(&Scope::all(), id).await.unwrap().unwrap();
            assert_eq!(key.prev_key, None);
            assert_eq!(key.next_key, Some(20));
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_previous_generation() {
        let (db, _source, mediator) = setup(3).await;
        let scope = Scope::all();
        db.upsert_articles(&scope, &[article(40), article(41)])
            .await
            .unwrap();

        mediator
            .load(LoadType::Refresh, &PagingState::new(config()))
            .await;

        let ids: Vec<i64> = db
            .paged_articles(&scope, 0, 50)
            .await
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_refresh_resumes_at_anchor_page() {
        let (db, source, mediator) = setup(30).await;
        let scope = Scope::all();
        db.upsert_articles(&scope, &[article(7)]).await.unwrap();
        db.upsert_remote_keys(
            &scope,
            &[RemoteKey {
                article_id: 7,
                prev_key: Some(10),
                next_key: Some(20),
            }],
        )
        .await
        .unwrap();

        let mut state = cached_state(&db, &scope).await;
        state.anchor_position = Some(3);
        let result = mediator.load(LoadType::Refresh, &state).await;

        assert_eq!(result, MediatorResult::success(false));
        assert_eq!(source.offsets(), vec![15]);
        let key = db.remote_key_for(&scope, 16).await.unwrap().unwrap();
        assert_eq!(key.prev_key, Some(10));
        assert_eq!(key.next_key, Some(20));
    }

    #[tokio::test]
    async fn test_refresh_with_empty_remote_ends_pagination() {
        let (db, _source, mediator) = setup(0).await;
        let scope = Scope::all();
        db.upsert_articles(&scope, &[article(1)]).await.unwrap();

        let result = mediator
            .load(LoadType::Refresh, &PagingState::new(config()))
            .await;

        assert_eq!(result, MediatorResult::success(true));
        assert_eq!(db.count_articles(&scope).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_prepend_and_append_without_keys_do_not_fetch() {
        let (db, source, mediator) = setup(10).await;
        db.upsert_articles(&Scope::all(), &[article(1)])
            .await
            .unwrap();
        let state = cached_state(&db, &Scope::all()).await;

        assert_eq!(
            mediator.load(LoadType::Prepend, &state).await,
            MediatorResult::success(false)
        );
        assert_eq!(
            mediator.load(LoadType::Append, &state).await,
            MediatorResult::success(false)
        );
        assert_eq!(source.page_calls(), 0);
    }

    #[tokio::test]
    async fn test_prepend_at_first_page_reports_end() {
        let (db, source, mediator) = setup(10).await;
        mediator
            .load(LoadType::Refresh, &PagingState::new(config()))
            .await;
        let state = cached_state(&db, &Scope::all()).await;

        let result = mediator.load(LoadType::Prepend, &state).await;

        assert_eq!(result, MediatorResult::success(true));
        assert_eq!(source.offsets(), vec![0]);
    }

    #[tokio::test]
    async fn test_prepend_fetches_previous_page_additively() {
        let (db, source, mediator) = setup(30).await;
        let scope = Scope::all();
        db.upsert_articles(&scope, &[article(11)]).await.unwrap();
        db.upsert_remote_keys(
            &scope,
            &[RemoteKey {
                article_id: 11,
                prev_key: Some(5),
                next_key: Some(15),
            }],
        )
        .await
        .unwrap();
        let state = cached_state(&db, &scope).await;

        let result = mediator.load(LoadType::Prepend, &state).await;

        assert_eq!(result, MediatorResult::success(false));
        assert_eq!(source.offsets(), vec![5]);
        // 5 fetched rows plus the pre-existing one
        assert_eq!(db.count_articles(&scope).await.unwrap(), 6);
        let key = db.remote_key_for(&scope, 6).await.unwrap().unwrap();
        assert_eq!(key.prev_key, Some(0));
        assert_eq!(key.next_key, Some(10));
    }

    #[tokio::test]
    async fn test_append_walks_every_page_once() {
        let pages = 3;
        let (db, source, mediator) = setup(pages * PAGE).await;
        let scope = Scope::all();

        let result = mediator
            .load(LoadType::Refresh, &PagingState::new(config()))
            .await;
        assert_eq!(result, MediatorResult::success(false));

        let mut appends = 0;
        loop {
            let state = cached_state(&db, &scope).await;
            appends += 1;
            match mediator.load(LoadType::Append, &state).await {
                MediatorResult::Success {
                    end_of_pagination_reached: true,
                } => break,
                MediatorResult::Success { .. } => {}
                MediatorResult::Error(err) => panic!("unexpected error: {err}"),
            }
            assert!(appends <= pages, "append never reported the end");
        }

        assert_eq!(appends, pages);
        assert_eq!(source.offsets(), vec![0, 5, 10, 15]);
        assert_eq!(db.count_articles(&scope).await.unwrap(), pages * PAGE);
    }

    #[tokio::test]
    async fn test_append_corrects_drifted_refresh_cursor() {
        let (db, source, mediator) = setup(40).await;
        let scope = Scope::all();
        let cached: Vec<Article> = (1..=7).map(article).collect();
        db.upsert_articles(&scope, &cached).await.unwrap();
        let keys: Vec<RemoteKey> = (1..=7)
            .map(|id| RemoteKey {
                article_id: id,
                prev_key: None,
                next_key: Some(PAGE as i64),
            })
            .collect();
        db.upsert_remote_keys(&scope, &keys).await.unwrap();
        let state = cached_state(&db, &scope).await;
        assert_eq!(state.loaded_count(), 7);

        mediator.load(LoadType::Append, &state).await;

        assert_eq!(source.offsets(), vec![7]);
    }

    #[tokio::test]
    async fn test_append_uses_stored_cursor_within_one_page() {
        let (db, source, mediator) = setup(40).await;
        mediator
            .load(LoadType::Refresh, &PagingState::new(config()))
            .await;
        let state = cached_state(&db, &Scope::all()).await;
        assert_eq!(state.loaded_count(), PAGE);

        mediator.load(LoadType::Append, &state).await;

        assert_eq!(source.offsets(), vec![0, 5]);
    }

    #[tokio::test]
    async fn test_sub_page_offset_links_back_to_first_page() {
        let (db, source, mediator) = setup(40).await;
        let scope = Scope::all();
        db.upsert_articles(&scope, &[article(7)]).await.unwrap();
        db.upsert_remote_keys(
            &scope,
            &[RemoteKey {
                article_id: 7,
                prev_key: None,
                next_key: Some(7),
            }],
        )
        .await
        .unwrap();
        let mut state = cached_state(&db, &scope).await;
        state.anchor_position = Some(0);

        mediator.load(LoadType::Refresh, &state).await;

        let key = db.remote_key_for(&scope, 3).await.unwrap().unwrap();
        assert_eq!(key.prev_key, Some(0));
        assert_eq!(key.next_key, Some(7));

        let state = cached_state(&db, &scope).await;
        let result = mediator.load(LoadType::Prepend, &state).await;

        assert_eq!(result, MediatorResult::success(false));
        assert_eq!(source.offsets(), vec![2, 0]);
        let first = db.remote_key_for(&scope, 1).await.unwrap().unwrap();
        assert_eq!(first.prev_key, None);
        assert_eq!(first.next_key, Some(5));
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_cache_untouched() {
        let (db, source, mediator) = setup(10).await;
        let scope = Scope::all();
        mediator
            .load(LoadType::Refresh, &PagingState::new(config()))
            .await;
        let state = cached_state(&db, &scope).await;

        source.fail_with(Some(FakeFailure::Status(503)));
        let refresh = mediator.load(LoadType::Refresh, &state).await;
        let append = mediator.load(LoadType::Append, &state).await;

        assert_eq!(refresh, MediatorResult::Error(ArticleError::Server(503)));
        assert_eq!(append, MediatorResult::Error(ArticleError::Server(503)));
        assert_eq!(db.count_articles(&scope).await.unwrap(), PAGE);
        assert_eq!(db.count_remote_keys(&scope).await.unwrap(), PAGE);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_network_error() {
        let (_db, source, mediator) = setup(10).await;
        source.fail_with(Some(FakeFailure::Timeout));

        let result = mediator
            .load(LoadType::Refresh, &PagingState::new(config()))
            .await;

        assert!(matches!(
            result,
            MediatorResult::Error(ArticleError::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_search_scope_forwards_filter() {
        let db = Database::open(":memory:").await.unwrap();
        let source = Arc::new(FakeSource::with_articles(30));
        let scope = Scope::from_query(Some("Article 2"));
        let mediator = ArticleMediator::new(db.clone(), source.clone(), scope.clone());

        mediator
            .load(LoadType::Refresh, &PagingState::new(config()))
            .await;

        assert_eq!(source.searches(), vec![Some("Article 2".to_string())]);
        assert!(db.count_articles(&scope).await.unwrap() > 0);
        assert_eq!(db.count_articles(&Scope::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_loads_on_one_instance_are_serialized() {
        let db = Database::open(":memory:").await.unwrap();
        let source = Arc::new(FakeSource::with_articles(20).with_delay(Duration::from_millis(20)));
        let mediator = Arc::new(ArticleMediator::new(db, source.clone(), Scope::all()));
        let state = PagingState::new(config());

        let loads = (0..4).map(|_| {
            let mediator = mediator.clone();
            let state = state.clone();
            tokio::spawn(async move { mediator.load(LoadType::Refresh, &state).await })
        });
        for handle in futures::future::join_all(loads).await {
            assert!(matches!(
                handle.unwrap(),
                MediatorResult::Success { .. }
            ));
        }

        assert_eq!(source.page_calls(), 4);
        assert_eq!(source.max_in_flight(), 1);
    }
}
