mod articles;
mod remote_keys;
mod schema;
mod transaction;
mod types;

pub use articles::MAX_PAGE_LIMIT;
pub use schema::Database;
pub use transaction::CacheTransaction;
pub use types::{Article, DatabaseError, RemoteKey, Scope};
