//! Corpus-wide terminology glossary.
//!
//! A technical term is annotated bilingually (`English（中文）`) the first
//! time it appears in any translated abstract; every later occurrence keeps
//! the English term alone. The check-and-register pass for a term must be
//! atomic across concurrently translating articles, so [`Glossary::reconcile`]
//! runs the whole rewrite of one abstract under a single lock acquisition.
//! The lock never spans a translation call.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// `English term（中文）` as produced by the translation prompt. The English
/// side is ASCII words with the separators common in model and method names.
static ANNOTATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z][A-Za-z0-9][A-Za-z0-9 \-+/&.]*)（([^（）]+)）").unwrap()
});

/// Canonical rendering of one registered term. Immutable for the run.
#[derive(Debug, Clone)]
pub struct GlossaryTerm {
    pub rendering: String,
    /// The article whose translation first introduced the term.
    pub first_seen: String,
}

/// Shared, mutation-guarded term map. One instance per translation run,
/// handed to every worker.
#[derive(Debug, Default)]
pub struct Glossary {
    terms: Mutex<HashMap<String, GlossaryTerm>>,
}

/// Case-insensitive, whitespace-collapsed term identity.
pub fn normalize_term(term: &str) -> String {
    term.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl Glossary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderings already fixed for any of `candidates`. Passed to the
    /// translation prompt so known terms come back unannotated.
    pub fn known_renderings(&self, candidates: &[String]) -> Vec<(String, String)> {
        let terms = self.terms.lock().expect("glossary lock poisoned");
        candidates
            .iter()
            .filter_map(|candidate| {
                terms
                    .get(&normalize_term(candidate))
                    .map(|term| (candidate.clone(), term.rendering.clone()))
            })
            .collect()
    }

    /// Rewrite a translated abstract so each bilingual annotation survives
    /// only for the article that registers its term first. A term already in
    /// the glossary — introduced by an earlier article, by a concurrent
    /// worker that won the race, or earlier in this same abstract — is
    /// stripped back to the bare English form.
    pub fn reconcile(&self, article_url: &str, translated: &str) -> String {
        let mut terms = self.terms.lock().expect("glossary lock poisoned");
        let mut out = String::with_capacity(translated.len());
        let mut last = 0usize;

        for caps in ANNOTATION.captures_iter(translated) {
            let whole = caps.get(0).expect("match group 0");
            let english = caps.get(1).expect("match group 1").as_str();
            let rendering = caps.get(2).expect("match group 2").as_str().trim();
            let norm = normalize_term(english);

            out.push_str(&translated[last..whole.start()]);
            if terms.contains_key(&norm) {
                out.push_str(english);
            } else {
                terms.insert(
                    norm.clone(),
                    GlossaryTerm {
                        rendering: rendering.to_string(),
                        first_seen: article_url.to_string(),
                    },
                );
                debug!(term = %norm, article = article_url, "registered glossary term");
                out.push_str(whole.as_str());
            }
            last = whole.end();
        }
        out.push_str(&translated[last..]);
        out
    }

    pub fn len(&self) -> usize {
        self.terms.lock().expect("glossary lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The registered rendering and first-seen article for a term, if any.
    pub fn get(&self, term: &str) -> Option<GlossaryTerm> {
        self.terms
            .lock()
            .expect("glossary lock poisoned")
            .get(&normalize_term(term))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_normalize_term() {
        assert_eq!(normalize_term("Diffusion   Model"), "diffusion model");
        assert_eq!(normalize_term(" GAN "), "gan");
    }

    #[test]
    fn test_first_occurrence_keeps_annotation() {
        let glossary = Glossary::new();
        let out = glossary.reconcile(
            "https://example.org/articles/1",
            "本文研究 diffusion model（扩散模型）的训练。",
        );
        assert_eq!(out, "本文研究 diffusion model（扩散模型）的训练。");
        assert_eq!(
            glossary.get("diffusion model").unwrap().rendering,
            "扩散模型"
        );
    }

    #[test]
    fn test_second_occurrence_is_stripped() {
        let glossary = Glossary::new();
        glossary.reconcile(
            "https://example.org/articles/1",
            "diffusion model（扩散模型）简介。",
        );
        let out = glossary.reconcile(
            "https://example.org/articles/2",
            "我们扩展 diffusion model（扩散模型）到视频。",
        );
        assert_eq!(out, "我们扩展 diffusion model 到视频。");
        // Attribution stays with the first article.
        assert_eq!(
            glossary.get("diffusion model").unwrap().first_seen,
            "https://example.org/articles/1"
        );
    }

    #[test]
    fn test_repeat_within_one_abstract_is_stripped() {
        let glossary = Glossary::new();
        let out = glossary.reconcile(
            "https://example.org/articles/1",
            "GAN（生成对抗网络）与 GAN（生成对抗网络）对比。",
        );
        assert_eq!(out, "GAN（生成对抗网络）与 GAN 对比。");
    }

    #[test]
    fn test_case_and_whitespace_insensitive_identity() {
        let glossary = Glossary::new();
        glossary.reconcile("a", "Diffusion Model（扩散模型）。");
        let out = glossary.reconcile("b", "研究 diffusion  model（扩散模型）。");
        assert_eq!(out, "研究 diffusion  model。");
    }

    #[test]
    fn test_unannotated_text_passes_through() {
        let glossary = Glossary::new();
        let text = "一段没有任何术语注释的摘要（括号里是中文）。";
        assert_eq!(glossary.reconcile("a", text), text);
        assert!(glossary.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_registration_exactly_one_bilingual() {
        let glossary = Arc::new(Glossary::new());
        let text_a = "第一篇讨论 diffusion model（扩散模型）。".to_string();
        let text_b = "第二篇也讨论 diffusion model（扩散模型）。".to_string();

        let ga = Arc::clone(&glossary);
        let gb = Arc::clone(&glossary);
        let ta = tokio::spawn(async move { ga.reconcile("https://example.org/articles/a", &text_a) });
        let tb = tokio::spawn(async move { gb.reconcile("https://example.org/articles/b", &text_b) });
        let (out_a, out_b) = (ta.await.unwrap(), tb.await.unwrap());

        let bilingual = |s: &str| s.contains("diffusion model（扩散模型）");
        assert!(
            bilingual(&out_a) ^ bilingual(&out_b),
            "exactly one abstract keeps the bilingual form: {out_a} / {out_b}"
        );
        assert_eq!(glossary.len(), 1);
    }
}
