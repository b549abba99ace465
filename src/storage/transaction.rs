use sqlx::{Sqlite, Transaction};

use super::articles::{clear_articles_on, upsert_articles_on};
use super::remote_keys::{clear_remote_keys_on, upsert_remote_keys_on};
use super::schema::Database;
use super::types::{Article, DatabaseError, RemoteKey, Scope};

/// A write transaction over the article cache.
///
/// Nothing written through it is visible to other connections until
/// [`commit`](CacheTransaction::commit). Dropping it without committing rolls
/// every write back, which is how a failed page commit leaves the previous
/// generation untouched.
pub struct CacheTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl Database {
    /// Begin a write transaction on the cache.
    pub async fn begin(&self) -> Result<CacheTransaction, DatabaseError> {
        let tx = self.pool.begin().await?;
        Ok(CacheTransaction { tx })
    }
}

impl CacheTransaction {
    pub async fn upsert_articles(
        &mut self,
        scope: &Scope,
        articles: &[Article],
    ) -> Result<(), DatabaseError> {
        upsert_articles_on(&mut *self.tx, scope, articles).await?;
        Ok(())
    }

    pub async fn upsert_remote_keys(
        &mut self,
        scope: &Scope,
        keys: &[RemoteKey],
    ) -> Result<(), DatabaseError> {
        upsert_remote_keys_on(&mut *self.tx, scope, keys).await?;
        Ok(())
    }

    /// Delete every article cached for `scope`, returning the row count.
    pub async fn clear_articles(&mut self, scope: &Scope) -> Result<u64, DatabaseError> {
        Ok(clear_articles_on(&mut *self.tx, scope).await?)
    }

    /// Delete every cursor stored for `scope`, returning the row count.
    pub async fn clear_remote_keys(&mut self, scope: &Scope) -> Result<u64, DatabaseError> {
        Ok(clear_remote_keys_on(&mut *self.tx, scope).await?)
    }

    pub async fn commit(self) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Explicitly discard all writes. Equivalent to dropping the transaction.
    pub async fn rollback(self) -> Result<(), DatabaseError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
