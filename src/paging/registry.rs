use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, Weak};

use super::mediator::ArticleMediator;
use crate::api::ArticleSource;
use crate::storage::{Database, Scope};

pub const DEFAULT_MAX_MEDIATORS: usize = 16;

struct Mediators {
    recent: LruCache<Scope, Arc<ArticleMediator>>,
    /// Every instance handed out, including ones evicted from `recent` but
    /// still held by a pager or an in-flight load
    live: HashMap<Scope, Weak<ArticleMediator>>,
}

/// Hands out one [`ArticleMediator`] per query scope.
///
/// Mediators are created lazily and kept in a bounded LRU. Eviction only
/// drops the registry's reference. While anything still holds the evicted
/// instance, requests for that scope get it back, so loads for one scope stay
/// serialized. Once it is gone, its cached rows and cursors are still in the
/// database and a fresh mediator picks up from them.
pub struct MediatorRegistry {
    db: Database,
    source: Arc<dyn ArticleSource>,
    mediators: Mutex<Mediators>,
}

impl MediatorRegistry {
    pub fn new(db: Database, source: Arc<dyn ArticleSource>, capacity: NonZeroUsize) -> Self {
        Self {
            db,
            source,
            mediators: Mutex::new(Mediators {
                recent: LruCache::new(capacity),
                live: HashMap::new(),
            }),
        }
    }

    /// Mediator for `query`. `None` and `Some("")` share the unfiltered scope.
    pub fn get(&self, query: Option<&str>) -> Arc<ArticleMediator> {
        let scope = Scope::from_query(query);
        let mut mediators = self.lock();

        if let Some(mediator) = mediators.recent.get(&scope) {
            return mediator.clone();
        }

        let mediator = match mediators.live.get(&scope).and_then(Weak::upgrade) {
            Some(mediator) => {
                tracing::debug!(scope = %scope, "Reusing evicted mediator");
                mediator
            }
            None => {
                tracing::debug!(scope = %scope, "Creating mediator");
                mediators.live.retain(|_, weak| weak.strong_count() > 0);
                let mediator = Arc::new(ArticleMediator::new(
                    self.db.clone(),
                    self.source.clone(),
                    scope.clone(),
                ));
                mediators
                    .live
                    .insert(scope.clone(), Arc::downgrade(&mediator));
                mediator
            }
        };

        mediators.recent.put(scope, mediator.clone());
        mediator
    }

    pub fn len(&self) -> usize {
        self.lock().recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().recent.is_empty()
    }

    /// Whether a mediator for `query` is currently held (does not touch LRU order).
    pub fn contains(&self, query: Option<&str>) -> bool {
        self.lock().recent.contains(&Scope::from_query(query))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Mediators> {
        self.mediators
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
