//! Conference-proceedings listing adapter.
//!
//! Proceedings sites link papers under `/paper/` paths and paginate with a
//! numbered `page` query parameter. Without a `rel="next"` anchor the next
//! page must be a link to `page=N+1` of the same path; anything else means
//! the pagination markup changed and traversal stops.

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
                if resolved.contains("/paper/") {
                    urls.insert(resolved);
                }
            }
        }
    }
    urls.into_iter().collect()
}

pub(super) fn next_page(html: &str, page_url: &Url) -> Option<String> {
    let document = Html::parse_document(html);

    let rel_next = Selector::parse("a[rel=\"next\"]").unwrap();
    if let Some(href) = document
        .select(&rel_next)
        .next()
        .and_then(|element| element.value().attr("href"))
    {
        return normalize_url(href, page_url);
    }

    // Numbered pagination: an anchor for page N+1 of the current path.
    let current = page_param(page_url).unwrap_or(1);
    let anchors = Selector::parse("a[href]").unwrap();
    for element in document.select(&anchors) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(resolved) = normalize_url(href, page_url) else {
            continue;
        };
        let Ok(candidate) = Url::parse(&resolved) else {
            continue;
        };
        if candidate.path() == page_url.path() && page_param(&candidate) == Some(current + 1) {
            return Some(resolved);
        }
    }
    None
}

fn page_param(url: &Url) -> Option<u32> {
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://proceedings.example.org/2025?page=1").unwrap()
    }

    #[test]
    fn test_extract_links_filters_and_sorts() {
        let html = r#"
            <html><body>
              <ul>
                <li><a href="/paper/2025/b-attention">B</a></li>
                <li><a href="/paper/2025/a-scaling">A</a></li>
                <li><a href="/paper/2025/a-scaling">A duplicate</a></li>
                <li><a href="/schedule">Schedule</a></li>
              </ul>
            </body></html>"#;

        let links = extract_links(html, &page_url());
        assert_eq!(
            links,
            vec![
                "https://proceedings.example.org/paper/2025/a-scaling",
                "https://proceedings.example.org/paper/2025/b-attention",
            ]
        );
    }

    #[test]
    fn test_next_page_prefers_rel_next() {
        let html = r#"<html><body>
            <a rel="next" href="/2025?page=2">›</a>
            </body></html>"#;
        assert_eq!(
            next_page(html, &page_url()),
            Some("https://proceedings.example.org/2025?page=2".to_string())
        );
    }

    #[test]
    fn test_next_page_from_numbered_pagination() {
        let html = r#"<html><body><nav>
            <a href="/2025?page=1">1</a>
            <a href="/2025?page=2">2</a>
            <a href="/2025?page=3">3</a>
            </nav></body></html>"#;
        assert_eq!(
            next_page(html, &page_url()),
            Some("https://proceedings.example.org/2025?page=2".to_string())
        );
    }

    #[test]
    fn test_numbered_pagination_ignores_other_paths() {
        let html = r#"<html><body>
            <a href="/other?page=2">elsewhere</a>
            </body></html>"#;
        assert_eq!(next_page(html, &page_url()), None);
    }

    #[test]
    fn test_last_page_terminates() {
        let last = Url::parse("https://proceedings.example.org/2025?page=3").unwrap();
        let html = r#"<html><body><nav>
            <a href="/2025?page=1">1</a>
            <a href="/2025?page=2">2</a>
            <a href="/2025?page=3">3</a>
            </nav></body></html>"#;
        assert_eq!(next_page(html, &last), None);
    }
}
