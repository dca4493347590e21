//! Site adapters for the supported listing layouts.
//!
//! Each variant encapsulates exactly the page-layout knowledge for one kind
//! of source; adding a source means adding a variant here, never touching
//! traversal or fetch logic. Adapters do no network I/O — they read
//! already-fetched content, which keeps parsing testable with plain HTML
//! strings.
//!
//! # Supported layouts
//!
//! | Kind | Module | Article links | Next page |
//! |------|--------|---------------|-----------|
//! | Search | [`search`] | paths containing `/articles/` | `rel="next"` link or anchor, else a "next" label |
//! | Proceedings | [`proceedings`] | paths containing `/paper/` | `rel="next"` anchor, else a `page=N+1` link |

mod proceedings;
mod search;

use clap::ValueEnum;
use url::Url;

/// Which listing layout a crawl starts from. Declared up front by the caller;
/// an ambiguous pagination signal terminates traversal instead of guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SiteKind {
    /// Journal search-result listings (search-engine-style pagination).
    Search,
    /// Conference proceedings listings (numbered pagination).
    Proceedings,
}

impl SiteKind {
    /// Article detail URLs found on a listing page, resolved against the
    /// page's own URL, sorted and deduplicated.
    pub fn extract_links(&self, html: &str, page_url: &Url) -> Vec<String> {
        match self {
            SiteKind::Search => search::extract_links(html, page_url),
            SiteKind::Proceedings => proceedings::extract_links(html, page_url),
        }
    }

    /// The next listing page, or `None` when pagination is exhausted.
    pub fn next_page(&self, html: &str, page_url: &Url) -> Option<String> {
        match self {
            SiteKind::Search => search::next_page(html, page_url),
            SiteKind::Proceedings => proceedings::next_page(html, page_url),
        }
    }
}
