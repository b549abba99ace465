//! Domain error taxonomy shared by the pagination engine and the repository.
//!
//! Layer-specific errors ([`ApiError`], [`DatabaseError`]) are mapped into
//! [`ArticleError`] at the boundary so callers can branch on the kind of
//! failure without depending on `reqwest` or `sqlx`.
use thiserror::Error;

use crate::api::ApiError;
use crate::storage::DatabaseError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArticleError {
    /// No connectivity, timeout, or other transport-level failure
    #[error("Network unavailable: {0}")]
    Network(String),

    /// The API rejected the request (4xx)
    #[error("Request rejected by server: status {0}")]
    Client(u16),

    /// The API failed to serve the request (5xx)
    #[error("Server error: status {0}")]
    Server(u16),

    /// Point lookup missed the cache and the remote fallback failed.
    ///
    /// `cause` keeps the underlying failure so the caller can tell a genuinely
    /// missing article from an offline device.
    #[error("Article {id} not found")]
    NotFound {
        id: i64,
        cause: Option<Box<ArticleError>>,
    },

    /// The cache transaction failed and was rolled back
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ArticleError {
    pub fn not_found(id: i64, cause: ArticleError) -> Self {
        ArticleError::NotFound {
            id,
            cause: Some(Box::new(cause)),
        }
    }

    /// Underlying failure of a [`ArticleError::NotFound`], if recorded.
    pub fn cause(&self) -> Option<&ArticleError> {
        match self {
            ArticleError::NotFound { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }

    /// True for failures a later retry may fix (connectivity, 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            ArticleError::Network(_) | ArticleError::Server(_) => true,
            ArticleError::NotFound { cause, .. } => {
                cause.as_deref().is_some_and(ArticleError::is_transient)
            }
            ArticleError::Client(_) | ArticleError::Storage(_) | ArticleError::Unknown(_) => false,
        }
    }
}

impl From<ApiError> for ArticleError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(e) => ArticleError::Network(e.to_string()),
            ApiError::Timeout => ArticleError::Network("request timed out".to_string()),
            ApiError::Status(status @ 400..=499) => ArticleError::Client(status),
            ApiError::Status(status @ 500..=599) => ArticleError::Server(status),
            ApiError::Status(status) => ArticleError::Unknown(format!("unexpected status {status}")),
            ApiError::Decode(msg) => ArticleError::Unknown(msg),
            other @ (ApiError::ResponseTooLarge | ApiError::InvalidBaseUrl(_)) => {
                ArticleError::Unknown(other.to_string())
            }
        }
    }
}

impl From<DatabaseError> for ArticleError {
    fn from(err: DatabaseError) -> Self {
        ArticleError::Storage(err.to_string())
    }
}
