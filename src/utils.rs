//! Text, URL, and hashing helpers shared across the pipeline.

use chrono::Utc;
use sha2::{Digest, Sha256};
use url::Url;

/// Collapse runs of whitespace into single spaces and trim.
///
/// Scraped fields arrive with newlines and indentation baked in; every field
/// passes through here before it is stored or compared.
///
/// # Returns
///
/// `None` when the input is absent or whitespace-only.
pub fn clean_text(s: Option<&str>) -> Option<String> {
    let s = s?;
    let cleaned = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

/// Resolve `href` against the page it appeared on and strip any fragment.
///
/// Listing pages mix absolute and relative links; fragments would otherwise
/// make the same article look like two different URLs.
pub fn normalize_url(href: &str, base: &Url) -> Option<String> {
    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// SHA-256 of a text, hex-encoded. Identifies identical abstracts so a
/// translation can be reused across rows.
pub fn sha256_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Current UTC time in RFC 3339, the timestamp format stored in the database.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Truncate a string for logging purposes.
///
/// Counts characters rather than bytes so multi-byte text (the translated
/// abstracts are Chinese) never splits mid-character.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", cut, total - max)
    }
}
