//! Paginated cache synchronization.
//!
//! - [`ArticleMediator`] reconciles one query scope's cached pages with the
//!   remote listing (refresh, prepend, append)
//! - [`MediatorRegistry`] hands out one mediator per scope from a bounded LRU
//! - [`ArticlePager`] is the consumer side: it reads pages from the cache and
//!   asks the mediator for more when the cached rows run out

#[cfg(test)]
pub(crate) mod fake;
mod mediator;
mod pager;
mod registry;
mod state;

pub use mediator::{ArticleMediator, LoadType, MediatorResult};
pub use pager::{ArticlePager, LoadState, LoadStates};
pub use registry::{MediatorRegistry, DEFAULT_MAX_MEDIATORS};
pub use state::{PagingConfig, PagingState, DEFAULT_PAGE_SIZE, DEFAULT_PREFETCH_DISTANCE};
