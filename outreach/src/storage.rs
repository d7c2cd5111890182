use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::Result;

/// Persistent date-keyed cache of generated newsletters.
#[async_trait]
pub trait NewsletterStore: Send + Sync {
    /// Create the backing table if needed. Safe to call repeatedly.
    async fn init(&self) -> Result<()>;

    /// Stored newsletter for `date_key` (`YYYY-MM-DD`), if any.
    async fn get(&self, date_key: &str) -> Result<Option<String>>;

    /// Insert or replace the newsletter for `date_key`. Last write wins.
    async fn put(&self, date_key: &str, content: &str) -> Result<()>;
}

/// `news_archive` table in a SQLite database.
#[derive(Clone)]
pub struct SqliteNewsletterStore {
    pool: SqlitePool,
}

impl SqliteNewsletterStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NewsletterStore for SqliteNewsletterStore {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS news_archive (
                date TEXT PRIMARY KEY,
                content TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        debug!("news_archive table ready");
        Ok(())
    }

    async fn get(&self, date_key: &str) -> Result<Option<String>> {
        let content = sqlx::query_scalar::<_, String>(
            "SELECT content FROM news_archive WHERE date = ?",
        )
        .bind(date_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(content)
    }

    async fn put(&self, date_key: &str, content: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO news_archive (date, content)
            VALUES (?, ?)
            "#,
        )
        .bind(date_key)
        .bind(content)
        .execute(&self.pool)
        .await?;

        info!(date = %date_key, bytes = content.len(), "stored newsletter");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutreachError;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        // One connection, otherwise every connection sees its own empty database
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool")
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let store = SqliteNewsletterStore::new(memory_pool().await);
        store.init().await.expect("first init");
        store.put("2024-01-15", "kept").await.expect("put");
        store.init().await.expect("second init");
        assert_eq!(store.get("2024-01-15").await.unwrap().as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn get_missing_date_is_none() {
        let store = SqliteNewsletterStore::new(memory_pool().await);
        store.init().await.unwrap();
        assert_eq!(store.get("2024-01-15").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_existing_record() {
        let store = SqliteNewsletterStore::new(memory_pool().await);
        store.init().await.unwrap();

        store.put("2024-01-15", "A").await.unwrap();
        store.put("2024-01-15", "B").await.unwrap();

        assert_eq!(store.get("2024-01-15").await.unwrap().as_deref(), Some("B"));
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news_archive")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn dates_are_independent() {
        let store = SqliteNewsletterStore::new(memory_pool().await);
        store.init().await.unwrap();

        store.put("2024-01-15", "monday").await.unwrap();
        store.put("2024-01-16", "tuesday").await.unwrap();

        assert_eq!(store.get("2024-01-15").await.unwrap().as_deref(), Some("monday"));
        assert_eq!(store.get("2024-01-16").await.unwrap().as_deref(), Some("tuesday"));
    }

    #[tokio::test]
    async fn missing_table_is_a_storage_error() {
        let store = SqliteNewsletterStore::new(memory_pool().await);
        let err = store.get("2024-01-15").await.unwrap_err();
        assert!(matches!(err, OutreachError::Storage(_)));
    }
}
