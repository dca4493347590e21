//! Article records, lifecycle status, and run summaries.
//!
//! An [`Article`] is the persisted unit, keyed by its URL. [`ExportRecord`]
//! is the flat shape consumed by the exporter; the summaries are what a
//! finished run reports back to the caller.

use serde::{Deserialize, Serialize};

/// Lifecycle of an article row.
///
/// Created as `Discovered` when first seen in a listing page, moves to
/// `Fetched`/`FetchFailed` after one fetch attempt and to
/// `Translated`/`TranslateFailed` after one translation attempt. The Chinese
/// abstract is non-empty only on `Translated` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleStatus {
    Discovered,
    FetchFailed,
    Fetched,
    TranslateFailed,
    Translated,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Discovered => "discovered",
            ArticleStatus::FetchFailed => "fetch_failed",
            ArticleStatus::Fetched => "fetched",
            ArticleStatus::TranslateFailed => "translate_failed",
            ArticleStatus::Translated => "translated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "discovered" => Some(ArticleStatus::Discovered),
            "fetch_failed" => Some(ArticleStatus::FetchFailed),
            "fetched" => Some(ArticleStatus::Fetched),
            "translate_failed" => Some(ArticleStatus::TranslateFailed),
            "translated" => Some(ArticleStatus::Translated),
            _ => None,
        }
    }
}

/// Fields pulled out of one article page. Everything is optional; a missing
/// abstract downgrades the row, it does not fail the run.
#[derive(Debug, Default, Clone)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub journal: Option<String>,
    pub published_date: Option<String>,
    pub abstract_en: Option<String>,
}

/// A stored article row.
#[derive(Debug, Clone)]
pub struct Article {
    pub article_url: String,
    /// The listing URL this article was discovered from.
    pub search_url: Option<String>,
    pub title: Option<String>,
    pub journal: Option<String>,
    /// Loosely-typed date string, as published by the source.
    pub published_date: Option<String>,
    pub abstract_en: Option<String>,
    pub abstract_zh: Option<String>,
    /// SHA-256 of the cleaned English abstract, for translation reuse.
    pub abstract_en_hash: Option<String>,
    pub status: ArticleStatus,
    pub crawled_at: Option<String>,
    pub translated_at: Option<String>,
}

/// The record shape written by the exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRecord {
    pub article_url: String,
    pub title: Option<String>,
    pub journal: Option<String>,
    pub published_date: Option<String>,
    pub abstract_en: Option<String>,
    pub abstract_zh: Option<String>,
}

/// What a finished crawl reports. Partial success is the normal terminal
/// state: failed pages and articles are counted, not raised.
#[derive(Debug, Default)]
pub struct CrawlSummary {
    pub pages: usize,
    pub discovered: usize,
    pub fetched: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Set when traversal ended early on a listing-page failure; articles
    /// discovered before the failure were still processed.
    pub traversal_error: Option<String>,
}

/// What a finished translation run reports.
#[derive(Debug, Default)]
pub struct TranslateSummary {
    pub translated: usize,
    pub failed: usize,
    pub cache_hits: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            ArticleStatus::Discovered,
            ArticleStatus::FetchFailed,
            ArticleStatus::Fetched,
            ArticleStatus::TranslateFailed,
            ArticleStatus::Translated,
        ] {
            assert_eq!(ArticleStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ArticleStatus::parse("unknown"), None);
    }

    #[test]
    fn test_export_record_serialization() {
        let record = ExportRecord {
            article_url: "https://example.org/articles/1".to_string(),
            title: Some("Scaling laws revisited".to_string()),
            journal: Some("Nature".to_string()),
            published_date: Some("2025-03-01".to_string()),
            abstract_en: Some("We study scaling.".to_string()),
            abstract_zh: None,
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("Scaling laws revisited"));
        let back: ExportRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.article_url, record.article_url);
        assert_eq!(back.abstract_zh, None);
    }
}
