//! Field extraction from fetched article pages.
//!
//! Sources publish metadata three ways, tried in order of reliability:
//! JSON-LD blocks, citation meta tags, and finally the abstract section of
//! the visible DOM. A page without an abstract is a soft failure — the
//! caller records it and moves on.

use crate::models::ExtractedFields;
use crate::utils::clean_text;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

pub fn extract_fields(html: &str) -> ExtractedFields {
    let document = Html::parse_document(html);
    let objects = jsonld_objects(&document);
    let article = pick_article_object(&objects);

    let title = article
        .and_then(|o| text_field(o, "headline").or_else(|| text_field(o, "name")))
        .or_else(|| {
            let sel = Selector::parse("title").unwrap();
            document
                .select(&sel)
                .next()
                .map(|t| t.text().collect::<String>())
        })
        .and_then(|s| clean_text(Some(&s)));

    let journal = article
        .and_then(|o| o.get("isPartOf"))
        .and_then(|part| part.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| meta_content(&document, "meta[name=\"citation_journal_title\"]"))
        .and_then(|s| clean_text(Some(&s)));

    let published_date = article
        .and_then(|o| text_field(o, "datePublished").or_else(|| text_field(o, "dateCreated")))
        .or_else(|| meta_content(&document, "meta[property=\"article:published_time\"]"))
        .and_then(|s| clean_text(Some(&s)));

    let abstract_en = article
        .and_then(|o| text_field(o, "abstract").or_else(|| text_field(o, "description")))
        .or_else(|| meta_abstract(&document))
        .or_else(|| dom_abstract(&document))
        .and_then(|s| clean_text(Some(&s)));

    ExtractedFields {
        title,
        journal,
        published_date,
        abstract_en,
    }
}

/// All JSON-LD objects on the page, with `@graph` and `mainEntity` nesting
/// flattened out. Unparseable blocks are skipped.
fn jsonld_objects(document: &Html) -> Vec<Value> {
    let sel = Selector::parse("script[type=\"application/ld+json\"]").unwrap();
    let mut out = Vec::new();
    for script in document.select(&sel) {
        let raw = script.text().collect::<String>();
        if raw.trim().is_empty() {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<Value>(&raw) {
            collect_jsonld(&mut out, value);
        }
    }
    out
}

fn collect_jsonld(out: &mut Vec<Value>, value: Value) {
    match value {
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                collect_jsonld(out, graph);
                return;
            }
            let nested: Vec<Value> = ["mainEntity", "mainEntityOfPage"]
                .iter()
                .filter_map(|key| map.remove(*key))
                .collect();
            out.push(Value::Object(map));
            for value in nested {
                collect_jsonld(out, value);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_jsonld(out, item);
            }
        }
        _ => {}
    }
}

/// Prefer the object whose `@type` mentions Article; fall back to the first.
fn pick_article_object(objects: &[Value]) -> Option<&Value> {
    objects
        .iter()
        .find(|o| match o.get("@type") {
            Some(Value::String(t)) => t.contains("Article"),
            Some(Value::Array(types)) => types
                .iter()
                .any(|t| t.as_str().is_some_and(|t| t.contains("Article"))),
            _ => false,
        })
        .or_else(|| objects.first())
}

fn text_field(object: &Value, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).unwrap();
    document
        .select(&sel)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(str::to_string)
}

fn meta_abstract(document: &Html) -> Option<String> {
    [
        "meta[name=\"dc.description\"]",
        "meta[property=\"og:description\"]",
        "meta[name=\"description\"]",
    ]
    .iter()
    .find_map(|sel| meta_content(document, sel).and_then(|s| clean_text(Some(&s))))
}

/// Paragraphs following an "Abstract" heading, up to the next heading.
fn dom_abstract(document: &Html) -> Option<String> {
    let headings = Selector::parse("h1, h2, h3, h4").unwrap();
    let paragraphs = Selector::parse("p").unwrap();

    for heading in document.select(&headings) {
        let label = heading.text().collect::<String>().to_lowercase();
        if !label.contains("abstract") {
            continue;
        }

        let mut parts: Vec<String> = Vec::new();
        for sibling in heading.next_siblings() {
            let Some(element) = ElementRef::wrap(sibling) else {
                continue;
            };
            if matches!(element.value().name(), "h1" | "h2" | "h3" | "h4") {
                break;
            }
            if element.value().name() == "p" {
                push_text(&mut parts, &element);
            } else {
                for p in element.select(&paragraphs) {
                    push_text(&mut parts, &p);
                }
            }
        }
        if parts.is_empty() {
            // Some layouts nest the paragraphs in a sibling of the heading's parent.
            if let Some(parent) = heading.parent().and_then(ElementRef::wrap) {
                for p in parent.select(&paragraphs) {
                    push_text(&mut parts, &p);
                }
            }
        }
        if !parts.is_empty() {
            return Some(parts.join(" "));
        }
    }
    None
}

fn push_text(parts: &mut Vec<String>, element: &ElementRef) {
    if let Some(text) = clean_text(Some(&element.text().collect::<Vec<_>>().join(" "))) {
        parts.push(text);
    }
}
