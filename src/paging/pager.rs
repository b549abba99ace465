use futures::stream::{self, Stream};
use std::sync::Arc;

use super::mediator::{ArticleMediator, LoadType, MediatorResult};
use super::state::{PagingConfig, PagingState};
use crate::error::ArticleError;
use crate::storage::{Article, Database, Scope};

/// Remote appends tried per call when none of them adds a visible row.
const MAX_HIDDEN_APPENDS: usize = 8;

/// Outcome of the most recent load in one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    NotLoading { end_of_pagination_reached: bool },
    Error(ArticleError),
}

impl Default for LoadState {
    fn default() -> Self {
        LoadState::NotLoading {
            end_of_pagination_reached: false,
        }
    }
}

impl LoadState {
    pub fn is_end(&self) -> bool {
        matches!(
            self,
            LoadState::NotLoading {
                end_of_pagination_reached: true
            }
        )
    }

    pub fn error(&self) -> Option<&ArticleError> {
        match self {
            LoadState::Error(err) => Some(err),
            LoadState::NotLoading { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStates {
    pub refresh: LoadState,
    pub prepend: LoadState,
    pub append: LoadState,
}

// ============================================================================
// Pager
// ============================================================================

/// Lazily paged view over the cached listing of one scope.
///
/// Pages are always read from the local cache. The mediator is consulted
/// only when the cached rows run out (append), when the window reaches the
/// first cached page (prepend), or on an explicit refresh. Mediator failures
/// are recorded in [`load_states`](Self::load_states) and never discard pages
/// already loaded.
pub struct ArticlePager {
    db: Database,
    mediator: Arc<ArticleMediator>,
    state: PagingState,
    load_states: LoadStates,
    remote_end: bool,
    remote_enabled: bool,
}

impl ArticlePager {
    pub fn new(db: Database, mediator: Arc<ArticleMediator>, config: PagingConfig) -> Self {
        Self {
            db,
            mediator,
            state: PagingState::new(config),
            load_states: LoadStates::default(),
            remote_end: false,
            remote_enabled: true,
        }
    }

    /// Serve only what is already cached; the remote source is never called.
    pub fn offline(mut self) -> Self {
        self.remote_enabled = false;
        self
    }

    pub fn scope(&self) -> &Scope {
        self.mediator.scope()
    }

    pub fn state(&self) -> &PagingState {
        &self.state
    }

    pub fn pages(&self) -> &[Vec<Article>] {
        &self.state.pages
    }

    pub fn items(&self) -> impl Iterator<Item = &Article> {
        self.state.items()
    }

    pub fn len(&self) -> usize {
        self.state.loaded_count()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn load_states(&self) -> &LoadStates {
        &self.load_states
    }

    /// Record `index` as the read anchor and return the item there.
    pub fn access(&mut self, index: usize) -> Option<&Article> {
        self.state.anchor_position = Some(index);
        self.state.items().nth(index)
    }

    /// Whether the anchor is within the prefetch distance of the tail.
    pub fn needs_append(&self) -> bool {
        let Some(anchor) = self.state.anchor_position else {
            return false;
        };
        !self.load_states.append.is_end()
            && anchor + self.state.config.prefetch_distance >= self.len()
    }

    /// Whether the anchor is within the prefetch distance of the head.
    pub fn needs_prepend(&self) -> bool {
        let Some(anchor) = self.state.anchor_position else {
            return false;
        };
        self.remote_enabled
            && !self.load_states.prepend.is_end()
            && anchor < self.state.config.prefetch_distance
    }

    /// Reload the window from the remote source around the current anchor.
    ///
    /// On failure the previously loaded pages stay in place; if nothing was
    /// loaded yet the first cached page is served instead.
    pub async fn refresh(&mut self) -> LoadState {
        if !self.remote_enabled {
            self.remote_end = true;
            self.load_states.refresh = match self.reload_window(self.page_size()).await {
                Ok(()) => LoadState::default(),
                Err(err) => LoadState::Error(err),
            };
            return self.load_states.refresh.clone();
        }

        match self.mediator.load(LoadType::Refresh, &self.state).await {
            MediatorResult::Success {
                end_of_pagination_reached,
            } => {
                self.remote_end = end_of_pagination_reached;
                self.load_states = LoadStates {
                    refresh: LoadState::NotLoading {
                        end_of_pagination_reached,
                    },
                    prepend: LoadState::default(),
                    append: LoadState::NotLoading {
                        end_of_pagination_reached,
                    },
                };
                if let Err(err) = self.reload_window(self.page_size()).await {
                    self.load_states.refresh = LoadState::Error(err);
                }
            }
            MediatorResult::Error(err) => {
                tracing::warn!(scope = %self.scope(), error = %err, "Refresh failed, serving cache");
                self.load_states.refresh = LoadState::Error(err);
                if self.is_empty() {
                    if let Err(err) = self.reload_window(self.page_size()).await {
                        tracing::warn!(scope = %self.scope(), error = %err, "Cache read failed");
                    }
                }
            }
        }

        self.load_states.refresh.clone()
    }

    /// Load the page after the last loaded row.
    pub async fn append(&mut self) -> LoadState {
        match self.append_inner().await {
            Ok(state) => self.load_states.append = state,
            Err(err) => self.load_states.append = LoadState::Error(err),
        }
        self.load_states.append.clone()
    }

    async fn append_inner(&mut self) -> Result<LoadState, ArticleError> {
        if self.push_local_page().await? {
            return Ok(LoadState::default());
        }
        if self.remote_end || !self.remote_enabled {
            return Ok(LoadState::NotLoading {
                end_of_pagination_reached: true,
            });
        }

        let mut cursor_state: Option<PagingState> = None;
        for _ in 0..MAX_HIDDEN_APPENDS {
            let state = cursor_state.as_ref().unwrap_or(&self.state);
            let end_of_pagination_reached =
                match self.mediator.load(LoadType::Append, state).await {
                    MediatorResult::Success {
                        end_of_pagination_reached,
                    } => end_of_pagination_reached,
                    MediatorResult::Error(err) => return Err(err),
                };
            self.remote_end = end_of_pagination_reached;
            if self.push_local_page().await? || end_of_pagination_reached {
                return Ok(LoadState::NotLoading {
                    end_of_pagination_reached,
                });
            }

            // Nothing new is visible: the fetched rows fail the local filter
            // or the tail row has no cursor
            tracing::debug!(scope = %self.scope(), "Append added no visible rows");
            match self.furthest_cursor_state().await? {
                Some(state) => cursor_state = Some(state),
                None => break,
            }
        }

        Ok(LoadState::default())
    }

    /// One-row state on the cached row whose cursor reaches furthest.
    async fn furthest_cursor_state(&self) -> Result<Option<PagingState>, ArticleError> {
        let Some(key) = self.db.furthest_remote_key(self.scope()).await? else {
            return Ok(None);
        };
        let Some(article) = self.db.article_by_id(key.article_id).await? else {
            return Ok(None);
        };
        let mut state = PagingState::new(self.state.config);
        state.pages = vec![vec![article]];
        Ok(Some(state))
    }

    /// Load the page before the first loaded row and re-read the window.
    pub async fn prepend(&mut self) -> LoadState {
        if !self.remote_enabled {
            self.load_states.prepend = LoadState::NotLoading {
                end_of_pagination_reached: true,
            };
            return self.load_states.prepend.clone();
        }

        self.load_states.prepend = match self.mediator.load(LoadType::Prepend, &self.state).await {
            MediatorResult::Success {
                end_of_pagination_reached,
            } => {
                let rows = self.len() + self.page_size();
                match self.reload_window(rows).await {
                    Ok(()) => LoadState::NotLoading {
                        end_of_pagination_reached,
                    },
                    Err(err) => LoadState::Error(err),
                }
            }
            MediatorResult::Error(err) => LoadState::Error(err),
        };
        self.load_states.prepend.clone()
    }

    /// Consume the pager as a stream of newly loaded pages.
    ///
    /// The first item is the refreshed window. Each later item is the rows
    /// added by one append. The stream ends once no more rows arrive, or
    /// right after yielding an error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<Article>, ArticleError>> {
        stream::unfold((self, Phase::Start), |(mut pager, phase)| async move {
            match phase {
                Phase::Done => None,
                Phase::Start => {
                    let state = pager.refresh().await;
                    if !pager.is_empty() {
                        let window = pager.items().cloned().collect();
                        Some((Ok(window), (pager, Phase::Appending)))
                    } else if let LoadState::Error(err) = state {
                        Some((Err(err), (pager, Phase::Done)))
                    } else {
                        None
                    }
                }
                Phase::Appending => {
                    let before = pager.len();
                    match pager.append().await {
                        LoadState::Error(err) => Some((Err(err), (pager, Phase::Done))),
                        LoadState::NotLoading { .. } => {
                            let added: Vec<Article> = pager.items().skip(before).cloned().collect();
                            if added.is_empty() {
                                None
                            } else {
                                Some((Ok(added), (pager, Phase::Appending)))
                            }
                        }
                    }
                }
            }
        })
    }

    fn page_size(&self) -> usize {
        self.state.config.page_size
    }

    /// Read the next cached page after the window. Returns whether rows were added.
    async fn push_local_page(&mut self) -> Result<bool, ArticleError> {
        let page = self
            .db
            .paged_articles(self.mediator.scope(), self.len(), self.page_size())
            .await?;
        if page.is_empty() {
            return Ok(false);
        }
        self.state.pages.push(page);
        Ok(true)
    }

    /// Replace the window with the first `rows` cached rows.
    async fn reload_window(&mut self, rows: usize) -> Result<(), ArticleError> {
        let page_size = self.page_size();
        let mut pages = Vec::new();
        let mut offset = 0;

        while offset < rows {
            let page = self
                .db
                .paged_articles(self.mediator.scope(), offset, page_size)
                .await?;
            let short = page.len() < page_size;
            offset += page.len();
            if !page.is_empty() {
                pages.push(page);
            }
            if short {
                break;
            }
        }

        self.state.pages = pages;
        Ok(())
    }
}

enum Phase {
    Start,
    Appending,
    Done,
}
