use std::fmt;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of launchfeed appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) as rendered by sqlx.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Query Scope
// ============================================================================

/// The query context a set of cached rows belongs to.
///
/// `None` and the empty string both mean "all articles"; any other string is a
/// search term. Every row in the cache is tagged with the scope's [`key`],
/// so refreshing one search never clears another scope's pages.
///
/// [`key`]: Scope::key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Scope(String);

impl Scope {
    /// The unfiltered listing.
    pub fn all() -> Self {
        Self(String::new())
    }

    pub fn from_query(query: Option<&str>) -> Self {
        Self(query.unwrap_or_default().to_string())
    }

    /// The value stored in the `scope` column.
    pub fn key(&self) -> &str {
        &self.0
    }

    /// Search term for the local filter, `None` for the unfiltered listing.
    pub fn filter(&self) -> Option<&str> {
        if self.0.is_empty() {
            None
        } else {
            Some(&self.0)
        }
    }

    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.filter() {
            Some(query) => write!(f, "search:{query}"),
            None => f.write_str("all"),
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A cached news article.
///
/// All string fields are present; optional remote fields are normalized to an
/// empty string before they reach the cache.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub image_url: String,
    pub news_site: String,
    pub summary: String,
    /// ISO-8601 timestamp; the listing is ordered by this column descending.
    pub published_at: String,
}

/// Pagination cursor for one cached article.
///
/// `prev_key`/`next_key` are remote offsets (multiples of the page size).
/// `None` means there is nothing further in that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct RemoteKey {
    pub article_id: i64,
    pub prev_key: Option<i64>,
    pub next_key: Option<i64>,
}
