//! Command-line interface: crawl, translate, export.
//!
//! Subcommands mirror the pipeline phases. API credentials can come from
//! flags or from the `DEEPSEEK_BASE_URL` / `DEEPSEEK_API_KEY` environment
//! variables.

use crate::export::ExportFormat;
use crate::sites::SiteKind;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover articles from a paginated listing and store their abstracts
    Crawl {
        /// Listing URL to start pagination from
        #[arg(long)]
        search_url: String,

        /// Listing layout of the source site
        #[arg(long, value_enum, default_value = "search")]
        site: SiteKind,

        /// SQLite database path
        #[arg(long, default_value = "articles.sqlite")]
        db: String,

        /// Stop after this many listing pages
        #[arg(long)]
        max_pages: Option<u32>,

        /// Stop after this many articles
        #[arg(long)]
        limit_articles: Option<usize>,

        /// Concurrent article fetches
        #[arg(long, default_value_t = 3)]
        concurrency: usize,

        /// Outbound requests per second
        #[arg(long, default_value_t = 1.5)]
        rate: f64,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,

        /// Re-fetch articles even when an abstract is already stored
        #[arg(long)]
        no_resume: bool,

        /// Export a flat file when the crawl finishes
        #[arg(long, value_enum)]
        export_format: Option<ExportFormat>,

        /// Export file path (default: export.<format>)
        #[arg(long)]
        export_path: Option<String>,
    },

    /// Translate stored abstracts into Simplified Chinese
    Translate {
        /// SQLite database path
        #[arg(long, default_value = "articles.sqlite")]
        db: String,

        /// Chat model to translate with
        #[arg(long)]
        model: String,

        /// OpenAI-compatible API base URL
        #[arg(long, env = "DEEPSEEK_BASE_URL")]
        base_url: Option<String>,

        /// API key
        #[arg(long, env = "DEEPSEEK_API_KEY")]
        api_key: String,

        /// Translate at most this many pending abstracts
        #[arg(long)]
        max_items: Option<usize>,

        /// Concurrent translation calls
        #[arg(long, default_value_t = 3)]
        concurrency: usize,

        /// API requests per second
        #[arg(long, default_value_t = 1.5)]
        rate: f64,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },

    /// Write stored records to a flat file
    Export {
        /// SQLite database path
        #[arg(long, default_value = "articles.sqlite")]
        db: String,

        /// Output format
        #[arg(long, value_enum)]
        format: ExportFormat,

        /// Output file path
        #[arg(long)]
        out: String,

        /// Only records discovered from this listing URL
        #[arg(long)]
        search_url: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_defaults() {
        let cli = Cli::parse_from([
            "paper_harvest",
            "crawl",
            "--search-url",
            "https://www.nature.com/search?q=diffusion",
        ]);
        match cli.command {
            Command::Crawl {
                search_url,
                site,
                db,
                concurrency,
                rate,
                no_resume,
                max_pages,
                ..
            } => {
                assert_eq!(search_url, "https://www.nature.com/search?q=diffusion");
                assert_eq!(site, SiteKind::Search);
                assert_eq!(db, "articles.sqlite");
                assert_eq!(concurrency, 3);
                assert_eq!(rate, 1.5);
                assert!(!no_resume);
                assert_eq!(max_pages, None);
            }
            _ => panic!("expected crawl subcommand"),
        }
    }

    #[test]
    fn test_crawl_proceedings_site() {
        let cli = Cli::parse_from([
            "paper_harvest",
            "crawl",
            "--search-url",
            "https://proceedings.example.org/2025",
            "--site",
            "proceedings",
            "--max-pages",
            "2",
        ]);
        match cli.command {
            Command::Crawl {
                site, max_pages, ..
            } => {
                assert_eq!(site, SiteKind::Proceedings);
                assert_eq!(max_pages, Some(2));
            }
            _ => panic!("expected crawl subcommand"),
        }
    }

    #[test]
    fn test_translate_parsing() {
        let cli = Cli::parse_from([
            "paper_harvest",
            "translate",
            "--model",
            "deepseek-chat",
            "--api-key",
            "sk-test",
            "--max-items",
            "10",
        ]);
        match cli.command {
            Command::Translate {
                model,
                api_key,
                max_items,
                concurrency,
                ..
            } => {
                assert_eq!(model, "deepseek-chat");
                assert_eq!(api_key, "sk-test");
                assert_eq!(max_items, Some(10));
                assert_eq!(concurrency, 3);
            }
            _ => panic!("expected translate subcommand"),
        }
    }

    #[test]
    fn test_export_parsing() {
        let cli = Cli::parse_from([
            "paper_harvest",
            "export",
            "--format",
            "jsonl",
            "--out",
            "out/records.jsonl",
        ]);
        match cli.command {
            Command::Export { format, out, .. } => {
                assert_eq!(format, ExportFormat::Jsonl);
                assert_eq!(out, "out/records.jsonl");
            }
            _ => panic!("expected export subcommand"),
        }
    }
}
