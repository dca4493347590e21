//! Pagination traversal and the bounded article fetch pool.
//!
//! Traversal walks listing pages through a site adapter until pagination is
//! exhausted, a page cap is hit, or a listing fetch fails — the failure ends
//! the walk but keeps everything discovered so far. The pool then fans the
//! deduplicated URLs out across `concurrency` workers; one article failing
//! never aborts the others.

use crate::error::{FetchError, StorageError};
use crate::extract::extract_fields;
use crate::fetch::FetchPage;
use crate::models::{Article, ArticleStatus, CrawlSummary};
use crate::sites::SiteKind;
use crate::store::Store;
use crate::utils::{now_iso, sha256_text};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};
use url::Url;

pub struct CrawlOptions {
    pub start_url: String,
    pub site: SiteKind,
    pub max_pages: Option<u32>,
    pub limit_articles: Option<usize>,
    pub concurrency: usize,
    /// Skip URLs whose abstract is already stored.
    pub resume: bool,
}

/// Walk listing pages from `start_url`, collecting article URLs in discovery
/// order. URLs repeated across pages are kept once. Restartable: the same
/// start URL reproduces the same sequence absent site-side changes.
pub async fn traverse<F: FetchPage>(
    fetcher: &F,
    site: SiteKind,
    start_url: &str,
    max_pages: Option<u32>,
) -> (Vec<String>, usize, Option<FetchError>) {
    let mut seen_pages: HashSet<String> = HashSet::new();
    let mut seen_articles: HashSet<String> = HashSet::new();
    let mut articles: Vec<String> = Vec::new();
    let mut pages = 0usize;
    let mut next = Some(start_url.to_string());

    while let Some(page_url) = next.take() {
        if !seen_pages.insert(page_url.clone()) {
            warn!(%page_url, "pagination looped back to a visited page; stopping");
            break;
        }
        if let Some(cap) = max_pages {
            if pages as u32 >= cap {
                break;
            }
        }
        let parsed = match Url::parse(&page_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(%page_url, error = %e, "unparseable listing URL; stopping traversal");
                return (articles, pages, Some(FetchError::InvalidUrl(page_url)));
            }
        };
        let html = match fetcher.fetch(&page_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(%page_url, error = %e, "listing page fetch failed; keeping articles discovered so far");
                return (articles, pages, Some(e));
            }
        };
        pages += 1;

        let mut found = 0usize;
        for link in site.extract_links(&html, &parsed) {
            if seen_articles.insert(link.clone()) {
                articles.push(link);
                found += 1;
            }
        }
        next = site.next_page(&html, &parsed);
        info!(%page_url, found, total = articles.len(), has_next = next.is_some(), "listing page traversed");
    }

    (articles, pages, None)
}

/// Crawl one listing: traverse, then fetch-extract-persist every discovered
/// article through a bounded worker pool.
pub async fn run_crawl<F>(
    fetcher: &F,
    store: &Store,
    opts: &CrawlOptions,
) -> Result<CrawlSummary, StorageError>
where
    F: FetchPage,
{
    let (mut urls, pages, traversal_error) =
        traverse(fetcher, opts.site, &opts.start_url, opts.max_pages).await;
    if let Some(limit) = opts.limit_articles {
        urls.truncate(limit);
    }

    let mut summary = CrawlSummary {
        pages,
        discovered: urls.len(),
        traversal_error: traversal_error.map(|e| e.to_string()),
        ..CrawlSummary::default()
    };

    for url in &urls {
        store
            .insert_discovered(url, &opts.start_url, &now_iso())
            .await?;
    }

    let outcomes = stream::iter(urls.iter())
        .map(|url| async move { process_article(fetcher, store, opts, url).await })
        .buffer_unordered(opts.concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    for outcome in outcomes {
        match outcome {
            FetchOutcome::Fetched => summary.fetched += 1,
            FetchOutcome::Failed => summary.failed += 1,
            FetchOutcome::Skipped => summary.skipped += 1,
        }
    }
    info!(
        pages = summary.pages,
        discovered = summary.discovered,
        fetched = summary.fetched,
        failed = summary.failed,
        skipped = summary.skipped,
        "crawl finished"
    );
    Ok(summary)
}

enum FetchOutcome {
    Fetched,
    Failed,
    Skipped,
}

async fn process_article<F: FetchPage>(
    fetcher: &F,
    store: &Store,
    opts: &CrawlOptions,
    url: &str,
) -> FetchOutcome {
    if opts.resume {
        match store.has_abstract(url).await {
            Ok(true) => {
                debug!(%url, "abstract already stored; skipping");
                return FetchOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => {
                error!(%url, error = %e, "resume lookup failed");
                return FetchOutcome::Failed;
            }
        }
    }

    let html = match fetcher.fetch(url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(%url, error = %e, "article fetch failed");
            if let Err(e) = store.set_status(url, ArticleStatus::FetchFailed).await {
                error!(%url, error = %e, "failed to record fetch failure");
            }
            return FetchOutcome::Failed;
        }
    };

    let fields = extract_fields(&html);
    let status = if fields.abstract_en.is_some() {
        ArticleStatus::Fetched
    } else {
        // Soft failure: keep whatever fields were found, mark the row.
        warn!(%url, "no abstract found on article page");
        ArticleStatus::FetchFailed
    };

    let article = Article {
        article_url: url.to_string(),
        search_url: Some(opts.start_url.clone()),
        title: fields.title,
        journal: fields.journal,
        published_date: fields.published_date,
        abstract_en_hash: fields.abstract_en.as_deref().map(sha256_text),
        abstract_en: fields.abstract_en,
        abstract_zh: None,
        status,
        crawled_at: Some(now_iso()),
        translated_at: None,
    };

    match store.upsert(&article).await {
        Ok(()) => match status {
            ArticleStatus::Fetched => FetchOutcome::Fetched,
            _ => FetchOutcome::Failed,
        },
        Err(e) => {
            error!(%url, error = %e, "failed to persist article");
            FetchOutcome::Failed
        }
    }
}
