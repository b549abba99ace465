use crate::storage::Article;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_PREFETCH_DISTANCE: usize = 5;

/// Page sizing shared by the pager and the mediator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    /// Rows per local page and per remote request
    pub page_size: usize,
    /// How close to either edge of the loaded window an access must be to
    /// ask for the next page
    pub prefetch_distance: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            prefetch_distance: DEFAULT_PREFETCH_DISTANCE,
        }
    }
}

/// Snapshot of what the consumer currently has loaded.
///
/// The mediator derives its cursors from this: the first and last loaded
/// items for prepend/append, the item nearest the anchor for refresh, and the
/// total loaded row count for the append offset correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingState {
    pub pages: Vec<Vec<Article>>,
    /// Index (into the flattened pages) the consumer last accessed
    pub anchor_position: Option<usize>,
    pub config: PagingConfig,
}

impl PagingState {
    pub fn new(config: PagingConfig) -> Self {
        Self {
            pages: Vec::new(),
            anchor_position: None,
            config,
        }
    }

    pub fn first_item(&self) -> Option<&Article> {
        self.pages.iter().find(|page| !page.is_empty())?.first()
    }

    pub fn last_item(&self) -> Option<&Article> {
        self.pages.iter().rev().find(|page| !page.is_empty())?.last()
    }

    /// Total rows across all loaded pages.
    pub fn loaded_count(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded_count() == 0
    }

    /// Item at `position`, clamped into the loaded range.
    pub fn closest_item_to_position(&self, position: usize) -> Option<&Article> {
        let count = self.loaded_count();
        if count == 0 {
            return None;
        }
        self.items().nth(position.min(count - 1))
    }

    pub fn items(&self) -> impl Iterator<Item = &Article> {
        self.pages.iter().flatten()
    }
}
