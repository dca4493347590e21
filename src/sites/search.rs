//! Search-engine-style listing adapter.
//!
//! Journal search results link articles under `/articles/` paths and
//! advertise pagination through `rel="next"` — as a `<link>` in the head on
//! well-behaved sites, as an anchor elsewhere, and occasionally only as a
//! "Next page" label.

use crate::utils::normalize_url;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use url::Url;

pub(super) fn extract_links(html: &str, page_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").unwrap();

    let mut urls = BTreeSet::new();
    for element in document.select(&anchors) {
        if let Some(href) = element.value().attr("href") {
            if let Some(resolved) = normalize_url(href, page_url) {
                if resolved.contains("/articles/") {
                    urls.insert(resolved);
                }
            }
        }
    }
    urls.into_iter().collect()
}

pub(super) fn next_page(html: &str, page_url: &Url) -> Option<String> {
    let document = Html::parse_document(html);

    for selector in ["link[rel=\"next\"]", "a[rel=\"next\"]"] {
        let sel = Selector::parse(selector).unwrap();
        if let Some(href) = document
            .select(&sel)
            .next()
            .and_then(|element| element.value().attr("href"))
        {
            return normalize_url(href, page_url);
        }
    }

    // Last resort: an anchor labeled "next".
    let anchors = Selector::parse("a[href]").unwrap();
    document.select(&anchors).find_map(|element| {
        let label = element.text().collect::<Vec<_>>().join(" ");
        let label = label.trim().to_lowercase();
        if label == "next" || label == "next page" {
            element
                .value()
                .attr("href")
                .and_then(|href| normalize_url(href, page_url))
        } else {
            None
        }
    })
}
