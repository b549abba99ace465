use sqlx::{QueryBuilder, SqliteConnection};

use super::schema::Database;
use super::types::{Article, DatabaseError, Scope};

/// Rows per multi-row INSERT: 8 columns * 100 = 800 binds, under SQLite's 999 limit.
const BATCH_SIZE: usize = 100;

/// Upper bound for a single paged read (OOM protection)
pub const MAX_PAGE_LIMIT: usize = 500;

// ============================================================================
// Connection-level writes (shared by Database and CacheTransaction)
// ============================================================================

/// Insert or fully replace articles by `(scope, id)`.
pub(crate) async fn upsert_articles_on(
    conn: &mut SqliteConnection,
    scope: &Scope,
    articles: &[Article],
) -> Result<(), sqlx::Error> {
    for chunk in articles.chunks(BATCH_SIZE) {
        let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "INSERT INTO articles (scope, id, title, url, image_url, news_site, summary, published_at) ",
        );

        builder.push_values(chunk, |mut b, article| {
            b.push_bind(scope.key())
                .push_bind(article.id)
                .push_bind(&article.title)
                .push_bind(&article.url)
                .push_bind(&article.image_url)
                .push_bind(&article.news_site)
                .push_bind(&article.summary)
                .push_bind(&article.published_at);
        });

        builder.push(
            " ON CONFLICT(scope, id) DO UPDATE SET \
             title = excluded.title, \
             url = excluded.url, \
             image_url = excluded.image_url, \
             news_site = excluded.news_site, \
             summary = excluded.summary, \
             published_at = excluded.published_at",
        );

        builder.build().execute(&mut *conn).await?;
    }
    Ok(())
}

pub(crate) async fn clear_articles_on(
    conn: &mut SqliteConnection,
    scope: &Scope,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM articles WHERE scope = ?")
        .bind(scope.key())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

impl Database {
    // ========================================================================
    // Article Operations
    // ========================================================================

    /// Upsert a batch of articles into `scope`.
    ///
    /// A row with an existing `(scope, id)` is replaced field by field. The
    /// batch runs in its own transaction, so either every row lands or none.
    pub async fn upsert_articles(
        &self,
        scope: &Scope,
        articles: &[Article],
    ) -> Result<(), DatabaseError> {
        if articles.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        upsert_articles_on(&mut *tx, scope, articles).await?;
        tx.commit().await?;

        tracing::debug!(scope = %scope, count = articles.len(), "Upserted articles");
        Ok(())
    }

    // ========================================================================
    // Article Queries
    // ========================================================================

    /// Get a single article by its ID, regardless of which scope cached it.
    ///
    /// The copy in the unfiltered listing wins when several scopes hold it.
    pub async fn article_by_id(&self, id: i64) -> Result<Option<Article>, DatabaseError> {
        let row = sqlx::query_as::<_, Article>(
            r#"
            SELECT id, title, url, image_url, news_site, summary, published_at
            FROM articles
            WHERE id = ?
            ORDER BY scope = '' DESC
            LIMIT 1
        "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Read one window of the cached listing for `scope`.
    ///
    /// Rows are ordered by `published_at` descending (ties by id). For a
    /// search scope only rows whose title or summary contains the search term
    /// are returned. The match is a case-sensitive substring test; `%` and `_`
    /// are matched literally.
    pub async fn paged_articles(
        &self,
        scope: &Scope,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Article>, DatabaseError> {
        let limit = limit.min(MAX_PAGE_LIMIT);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, Article>(
            r#"
            SELECT id, title, url, image_url, news_site, summary, published_at
            FROM articles
            WHERE scope = ?1
              AND (?2 IS NULL OR instr(title, ?2) > 0 OR instr(summary, ?2) > 0)
            ORDER BY published_at DESC, id DESC
            LIMIT ?3 OFFSET ?4
        "#,
        )
        .bind(scope.key())
        .bind(scope.filter())
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Number of rows the paged read for `scope` can return.
    pub async fn count_articles(&self, scope: &Scope) -> Result<usize, DatabaseError> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM articles
            WHERE scope = ?1
              AND (?2 IS NULL OR instr(title, ?2) > 0 OR instr(summary, ?2) > 0)
        "#,
        )
        .bind(scope.key())
        .bind(scope.filter())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0.max(0) as usize)
    }
}
