//! SQLite-backed article store.
//!
//! One row per article URL. Upserts are idempotent, concurrent upserts to
//! different URLs need no external locking, and a later partial write can
//! never regress a previously captured abstract to empty — `NULLIF` turns
//! empty strings into NULL so `COALESCE` keeps the stored value.

use crate::error::StorageError;
use crate::models::{Article, ArticleStatus, ExportRecord};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use std::path::Path;
use tracing::info;

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_url TEXT NOT NULL UNIQUE,
    search_url TEXT,
    title TEXT,
    journal TEXT,
    published_date TEXT,
    abstract_en TEXT,
    abstract_zh TEXT,
    abstract_en_hash TEXT,
    status TEXT NOT NULL DEFAULT 'discovered',
    crawled_at TEXT,
    translated_at TEXT
)";

const UPSERT: &str = "\
INSERT INTO articles (
    article_url, search_url, title, journal, published_date,
    abstract_en, abstract_zh, abstract_en_hash, status, crawled_at, translated_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
ON CONFLICT(article_url) DO UPDATE SET
    search_url       = COALESCE(NULLIF(excluded.search_url, ''), articles.search_url),
    title            = COALESCE(NULLIF(excluded.title, ''), articles.title),
    journal          = COALESCE(NULLIF(excluded.journal, ''), articles.journal),
    published_date   = COALESCE(NULLIF(excluded.published_date, ''), articles.published_date),
    abstract_en      = COALESCE(NULLIF(excluded.abstract_en, ''), articles.abstract_en),
    abstract_zh      = COALESCE(NULLIF(excluded.abstract_zh, ''), articles.abstract_zh),
    abstract_en_hash = COALESCE(NULLIF(excluded.abstract_en_hash, ''), articles.abstract_en_hash),
    status = CASE
        WHEN articles.status = 'translated' THEN articles.status
        ELSE excluded.status
    END,
    crawled_at       = COALESCE(NULLIF(excluded.crawled_at, ''), articles.crawled_at),
    translated_at    = COALESCE(NULLIF(excluded.translated_at, ''), articles.translated_at)";

impl Store {
    /// Open (creating if needed) the database at `db_path` and ensure the
    /// schema exists. Failure here is fatal for the run.
    pub async fn connect(db_path: &str) -> Result<Self, StorageError> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let url = format!("sqlite://{db_path}?mode=rwc");
        let pool = SqlitePool::connect(&url).await?;
        let store = Self { pool };
        store.init().await?;
        info!(db_path, "article store ready");
        Ok(store)
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, StorageError> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<(), StorageError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_hash ON articles(abstract_en_hash)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_status ON articles(status)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Create a row in `discovered` state when the URL is first seen.
    /// Existing rows — whatever their state — are left untouched.
    pub async fn insert_discovered(
        &self,
        article_url: &str,
        search_url: &str,
        crawled_at: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO articles (article_url, search_url, status, crawled_at)
             VALUES (?1, ?2, 'discovered', ?3)
             ON CONFLICT(article_url) DO NOTHING",
        )
        .bind(article_url)
        .bind(search_url)
        .bind(crawled_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert-or-update by `article_url`. Idempotent; never regresses a
    /// non-empty abstract or a `translated` status.
    pub async fn upsert(&self, article: &Article) -> Result<(), StorageError> {
        sqlx::query(UPSERT)
            .bind(&article.article_url)
            .bind(&article.search_url)
            .bind(&article.title)
            .bind(&article.journal)
            .bind(&article.published_date)
            .bind(&article.abstract_en)
            .bind(&article.abstract_zh)
            .bind(&article.abstract_en_hash)
            .bind(article.status.as_str())
            .bind(&article.crawled_at)
            .bind(&article.translated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_status(
        &self,
        article_url: &str,
        status: ArticleStatus,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE articles SET status = ?2 WHERE article_url = ?1")
            .bind(article_url)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Whether a non-empty English abstract is already stored for this URL.
    pub async fn has_abstract(&self, article_url: &str) -> Result<bool, StorageError> {
        let row = sqlx::query(
            "SELECT 1 FROM articles
             WHERE article_url = ?1 AND abstract_en IS NOT NULL AND abstract_en != ''
             LIMIT 1",
        )
        .bind(article_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    pub async fn get(&self, article_url: &str) -> Result<Option<Article>, StorageError> {
        let row = sqlx::query("SELECT * FROM articles WHERE article_url = ?1")
            .bind(article_url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_article))
    }

    /// Rows at `status` that still carry a non-empty English abstract, in
    /// insertion order.
    pub async fn list_pending(
        &self,
        status: ArticleStatus,
        limit: Option<usize>,
    ) -> Result<Vec<Article>, StorageError> {
        let base = "SELECT * FROM articles
             WHERE status = ?1 AND abstract_en IS NOT NULL AND abstract_en != ''
             ORDER BY id ASC";
        let rows = if let Some(limit) = limit {
            sqlx::query(&format!("{base} LIMIT ?2"))
                .bind(status.as_str())
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query(base)
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
        };
        Ok(rows.iter().map(row_to_article).collect())
    }

    /// An existing translation for an identical English abstract, if any row
    /// already carries one.
    pub async fn cached_translation(
        &self,
        abstract_en_hash: &str,
    ) -> Result<Option<String>, StorageError> {
        let row = sqlx::query(
            "SELECT abstract_zh FROM articles
             WHERE abstract_en_hash = ?1 AND abstract_zh IS NOT NULL AND abstract_zh != ''
             LIMIT 1",
        )
        .bind(abstract_en_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get("abstract_zh")))
    }

    /// Record a finished translation. Sets the abstract, the timestamp, and
    /// the `translated` status in one statement.
    pub async fn update_translation(
        &self,
        article_url: &str,
        abstract_zh: &str,
        translated_at: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE articles
             SET abstract_zh = ?2, translated_at = ?3, status = 'translated'
             WHERE article_url = ?1",
        )
        .bind(article_url)
        .bind(abstract_zh)
        .bind(translated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All records in the export shape, optionally restricted to one
    /// listing URL, in insertion order.
    pub async fn export_rows(
        &self,
        search_url: Option<&str>,
    ) -> Result<Vec<ExportRecord>, StorageError> {
        let rows = if let Some(search_url) = search_url {
            sqlx::query(
                "SELECT article_url, title, journal, published_date, abstract_en, abstract_zh
                 FROM articles WHERE search_url = ?1 ORDER BY id ASC",
            )
            .bind(search_url)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT article_url, title, journal, published_date, abstract_en, abstract_zh
                 FROM articles ORDER BY id ASC",
            )
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows
            .iter()
            .map(|row| ExportRecord {
                article_url: row.get("article_url"),
                title: row.get("title"),
                journal: row.get("journal"),
                published_date: row.get("published_date"),
                abstract_en: row.get("abstract_en"),
                abstract_zh: row.get("abstract_zh"),
            })
            .collect())
    }
}

fn row_to_article(row: &SqliteRow) -> Article {
    let status: String = row.get("status");
    Article {
        article_url: row.get("article_url"),
        search_url: row.get("search_url"),
        title: row.get("title"),
        journal: row.get("journal"),
        published_date: row.get("published_date"),
        abstract_en: row.get("abstract_en"),
        abstract_zh: row.get("abstract_zh"),
        abstract_en_hash: row.get("abstract_en_hash"),
        status: ArticleStatus::parse(&status).unwrap_or(ArticleStatus::Discovered),
        crawled_at: row.get("crawled_at"),
        translated_at: row.get("translated_at"),
    }
}
