use sqlx::{QueryBuilder, SqliteConnection};

use super::schema::Database;
use super::types::{DatabaseError, RemoteKey, Scope};

/// 4 columns * 200 rows = 800 binds
const BATCH_SIZE: usize = 200;

pub(crate) async fn upsert_remote_keys_on(
    conn: &mut SqliteConnection,
    scope: &Scope,
    keys: &[RemoteKey],
) -> Result<(), sqlx::Error> {
    for chunk in keys.chunks(BATCH_SIZE) {
        let mut builder: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("INSERT INTO remote_keys (scope, article_id, prev_key, next_key) ");

        builder.push_values(chunk, |mut b, key| {
            b.push_bind(scope.key())
                .push_bind(key.article_id)
                .push_bind(key.prev_key)
                .push_bind(key.next_key);
        });

        builder.push(
            " ON CONFLICT(scope, article_id) DO UPDATE SET \
             prev_key = excluded.prev_key, \
             next_key = excluded.next_key",
        );

        builder.build().execute(&mut *conn).await?;
    }
    Ok(())
}

pub(crate) async fn clear_remote_keys_on(
    conn: &mut SqliteConnection,
    scope: &Scope,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM remote_keys WHERE scope = ?")
        .bind(scope.key())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

impl Database {
    // ========================================================================
    // Remote Key Operations
    // ========================================================================

    /// Upsert pagination cursors for `scope`, replacing by article id.
    pub async fn upsert_remote_keys(
        &self,
        scope: &Scope,
        keys: &[RemoteKey],
    ) -> Result<(), DatabaseError> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        upsert_remote_keys_on(&mut *tx, scope, keys).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Cursor recorded for `article_id` in `scope`, if any.
    pub async fn remote_key_for(
        &self,
        scope: &Scope,
        article_id: i64,
    ) -> Result<Option<RemoteKey>, DatabaseError> {
        let key = sqlx::query_as::<_, RemoteKey>(
            r#"
            SELECT article_id, prev_key, next_key
            FROM remote_keys
            WHERE scope = ? AND article_id = ?
        "#,
        )
        .bind(scope.key())
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    /// Cursor reaching furthest into the remote listing for `scope`.
    pub async fn furthest_remote_key(
        &self,
        scope: &Scope,
    ) -> Result<Option<RemoteKey>, DatabaseError> {
        let key = sqlx::query_as::<_, RemoteKey>(
            r#"
            SELECT article_id, prev_key, next_key
            FROM remote_keys
            WHERE scope = ? AND next_key IS NOT NULL
            ORDER BY next_key DESC, article_id DESC
            LIMIT 1
        "#,
        )
        .bind(scope.key())
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    pub async fn count_remote_keys(&self, scope: &Scope) -> Result<usize, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM remote_keys WHERE scope = ?")
            .bind(scope.key())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0.max(0) as usize)
    }
}
