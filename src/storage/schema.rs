use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::{is_lock_message, DatabaseError};

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// `path` may be a file path or `:memory:`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InstanceLocked` if another process holds the
    /// database locked (SQLITE_BUSY, SQLITE_LOCKED, SQLITE_CANTOPEN).
    /// Returns `DatabaseError::Migration` if the schema could not be created.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: a reader arriving while a refresh commits waits for
        // the write lock instead of failing with SQLITE_BUSY.
        let mut options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000");
        // WAL lets readers keep serving the last committed generation while a
        // refresh transaction is open.
        if path != ":memory:" {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            if is_lock_message(&e.to_string()) {
                DatabaseError::InstanceLocked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;
        tracing::debug!(path = %path, "Article cache opened");
        Ok(db)
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                scope TEXT NOT NULL,
                id INTEGER NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                image_url TEXT NOT NULL DEFAULT '',
                news_site TEXT NOT NULL DEFAULT '',
                summary TEXT NOT NULL DEFAULT '',
                published_at TEXT NOT NULL,
                PRIMARY KEY (scope, id)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Paged listing filters by scope and sorts by published_at DESC
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_articles_scope_published ON articles(scope, published_at DESC, id DESC)",
        )
        .execute(&mut *tx)
        .await?;

        // Detail lookups are scope-independent
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_id ON articles(id)")
            .execute(&mut *tx)
            .await?;

        // article_id is a join key into articles, not a foreign key
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS remote_keys (
                scope TEXT NOT NULL,
                article_id INTEGER NOT NULL,
                prev_key INTEGER,
                next_key INTEGER,
                PRIMARY KEY (scope, article_id)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
