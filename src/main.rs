//! # Paper Harvest
//!
//! A crawl-and-translate pipeline for academic article abstracts. It walks
//! paginated listing pages from a source site, fetches each article's
//! abstract and metadata through a bounded, rate-limited worker pool,
//! persists results idempotently in SQLite, and can then enrich stored
//! records with a Simplified-Chinese translation of the abstract.
//!
//! Translations enforce corpus-wide terminology consistency: a technical
//! term is annotated bilingually (`English（中文）`) only the first time it
//! appears across the whole dataset; later occurrences keep the English
//! term alone.
//!
//! ## Usage
//!
//! ```sh
//! paper_harvest crawl --search-url "https://www.nature.com/search?q=diffusion"
//! paper_harvest translate --model deepseek-chat
//! paper_harvest export --format csv --out abstracts.csv
//! ```
//!
//! ## Architecture
//!
//! The pipeline runs in two phases over one shared store:
//! 1. **Crawl**: listing pages → article URLs → concurrent fetch + extract → store
//! 2. **Translate**: pending rows → concurrent API calls coordinated through
//!    a shared glossary → store
//!
//! Per-article failures are counted, never fatal; partial success is the
//! normal terminal state of a run.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt as tfmt};
use url::Url;

mod cli;
mod crawl;
mod error;
mod export;
mod extract;
mod fetch;
mod glossary;
mod limiter;
mod models;
mod retry;
mod sites;
mod store;
mod translate;
mod utils;

use cli::{Cli, Command};
use crawl::CrawlOptions;
use fetch::HttpFetcher;
use glossary::Glossary;
use limiter::RateLimiter;
use retry::RetryPolicy;
use store::Store;
use translate::{ChatTranslator, HeuristicSegmenter, TranslateOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();

    match args.command {
        Command::Crawl {
            search_url,
            site,
            db,
            max_pages,
            limit_articles,
            concurrency,
            rate,
            timeout_secs,
            no_resume,
            export_format,
            export_path,
        } => {
            // A start URL that doesn't parse can't match any adapter; that is
            // the one crawl misconfiguration worth aborting for.
            Url::parse(&search_url)?;

            let store = Store::connect(&db).await?;
            let limiter = Arc::new(RateLimiter::new(rate));
            let retry = RetryPolicy::new(5, Duration::from_secs(1));
            let fetcher = HttpFetcher::new(limiter, retry, Duration::from_secs(timeout_secs))?;

            let opts = CrawlOptions {
                start_url: search_url.clone(),
                site,
                max_pages,
                limit_articles,
                concurrency,
                resume: !no_resume,
            };
            let summary = crawl::run_crawl(&fetcher, &store, &opts).await?;
            info!(
                discovered = summary.discovered,
                fetched = summary.fetched,
                failed = summary.failed,
                skipped = summary.skipped,
                traversal_error = summary.traversal_error.as_deref().unwrap_or("none"),
                "crawl complete"
            );

            if let Some(format) = export_format {
                let out =
                    export_path.unwrap_or_else(|| format!("export.{}", format.extension()));
                export::export(&store, format, &out, Some(&search_url)).await?;
            }
        }

        Command::Translate {
            db,
            model,
            base_url,
            api_key,
            max_items,
            concurrency,
            rate,
            timeout_secs,
        } => {
            let store = Store::connect(&db).await?;
            let limiter = Arc::new(RateLimiter::new(rate));
            let retry = RetryPolicy::new(5, Duration::from_secs(1));
            let translator = ChatTranslator::new(
                base_url,
                api_key,
                model,
                limiter,
                retry,
                Duration::from_secs(timeout_secs),
            )?;
            let glossary = Glossary::new();
            let segmenter = HeuristicSegmenter;

            let opts = TranslateOptions {
                concurrency,
                max_items,
            };
            let summary =
                translate::run_translate(&translator, &segmenter, &glossary, &store, &opts)
                    .await?;
            info!(
                translated = summary.translated,
                cache_hits = summary.cache_hits,
                failed = summary.failed,
                "translate complete"
            );
        }

        Command::Export {
            db,
            format,
            out,
            search_url,
        } => {
            let store = Store::connect(&db).await?;
            let count = export::export(&store, format, &out, search_url.as_deref()).await?;
            info!(count, path = %out, "export complete");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "execution complete"
    );
    Ok(())
}
