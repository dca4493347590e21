//! Abstract translation through an OpenAI-compatible chat API.
//!
//! [`Translate`] is the capability seam, mirroring the fetcher: the pool
//! only sees the trait, so tests drive it with a stub. [`ChatTranslator`]
//! posts to a `chat/completions` endpoint, rate-limit-gated before every
//! attempt and retried on 429/5xx. The glossary keeps terminology consistent
//! across all concurrently translating workers.

use crate::error::{StorageError, TranslateError};
use crate::glossary::Glossary;
use crate::limiter::RateLimiter;
use crate::models::{Article, ArticleStatus, TranslateSummary};
use crate::retry::RetryPolicy;
use crate::store::Store;
use crate::utils::{clean_text, now_iso, sha256_text, truncate_for_log};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

/// Capability of translating one abstract. `known_terms` are glossary
/// entries already fixed elsewhere in the corpus; the translation should
/// leave them unannotated (the glossary strips any that slip through).
pub trait Translate {
    async fn translate(
        &self,
        abstract_en: &str,
        known_terms: &[(String, String)],
    ) -> Result<String, TranslateError>;
}

/// Candidate technical terms of an abstract, in occurrence order.
pub trait SegmentTerms {
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Acronyms, hyphenated compounds, and a few common technical heads. Good
/// enough to tell the prompt which glossary entries apply; a deployment can
/// swap in a real terminology service.
#[derive(Debug, Default)]
pub struct HeuristicSegmenter;

static TERM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:[A-Z]{2,}[A-Za-z0-9-]*|[A-Za-z]+(?:-[A-Za-z]+)+|[a-z]+ (?:model|models|network|networks|learning|transformer|transformers|dataset|datasets|embedding|embeddings|algorithm|algorithms))\b",
    )
    .unwrap()
});

impl SegmentTerms for HeuristicSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        for m in TERM.find_iter(text) {
            let term = m.as_str().to_string();
            if seen.insert(term.to_lowercase()) {
                terms.push(term);
            }
        }
        terms
    }
}

const SYSTEM_PROMPT: &str = "你是学术翻译助手，输出简体中文，忠实准确，风格正式。";

fn build_user_prompt(abstract_en: &str, known_terms: &[(String, String)]) -> String {
    let mut prompt = String::from(
        "请将下面英文摘要翻译为简体中文。\n\
         规则：\n\
         1) 关键术语首次出现采用：英文术语（中文翻译）；后续只保留英文术语，不再重复括号中文。\n\
         2) 模型名/方法名/数据集名/缩写：保留英文；必要时首次出现给出中文解释。\n\
         3) 不要添加原文没有的信息，不要扩写。\n",
    );
    if !known_terms.is_empty() {
        prompt.push_str("4) 以下术语此前已经介绍过，直接使用英文原词，不要加括号注释：");
        for (i, (term, _)) in known_terms.iter().enumerate() {
            if i > 0 {
                prompt.push('、');
            }
            prompt.push_str(term);
        }
        prompt.push('\n');
    }
    prompt.push_str("\n英文摘要：\n");
    prompt.push_str(abstract_en);
    prompt
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct ChatTranslator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl ChatTranslator {
    pub fn new(
        base_url: Option<String>,
        api_key: String,
        model: String,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TranslateError::from_reqwest)?;
        Ok(Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model,
            limiter,
            retry,
        })
    }

    async fn attempt(&self, prompt: &str) -> Result<String, TranslateError> {
        self.limiter.acquire().await;
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.2,
        };
        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(TranslateError::from_reqwest)?;

        match response.status().as_u16() {
            429 => return Err(TranslateError::RateLimited),
            status if status >= 500 => return Err(TranslateError::Server(status)),
            status if status >= 400 => return Err(TranslateError::Client(status)),
            _ => {}
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(TranslateError::from_reqwest)?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(TranslateError::Empty)
    }
}

impl Translate for ChatTranslator {
    async fn translate(
        &self,
        abstract_en: &str,
        known_terms: &[(String, String)],
    ) -> Result<String, TranslateError> {
        let prompt = build_user_prompt(abstract_en, known_terms);
        let translated = self
            .retry
            .run(|| self.attempt(&prompt), TranslateError::is_transient)
            .await?;
        debug!(
            preview = %truncate_for_log(&translated, 80),
            "received translation"
        );
        Ok(translated)
    }
}

pub struct TranslateOptions {
    pub concurrency: usize,
    /// Cap on how many pending abstracts are submitted to the pool.
    pub max_items: Option<usize>,
}

enum Outcome {
    Translated,
    CacheHit,
    Failed,
    Skipped,
}

/// Translate every pending abstract through `concurrency` workers. Per-item
/// failures mark the row `translate_failed` and the pool continues.
pub async fn run_translate<T, S>(
    translator: &T,
    segmenter: &S,
    glossary: &Glossary,
    store: &Store,
    opts: &TranslateOptions,
) -> Result<TranslateSummary, StorageError>
where
    T: Translate,
    S: SegmentTerms,
{
    let rows = store
        .list_pending(ArticleStatus::Fetched, opts.max_items)
        .await?;
    let total = rows.len();
    info!(total, "abstracts pending translation");

    let outcomes = stream::iter(rows.into_iter().enumerate())
        .map(|(i, article)| async move {
            process_article(translator, segmenter, glossary, store, i, total, article).await
        })
        .buffer_unordered(opts.concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    let mut summary = TranslateSummary::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Translated => summary.translated += 1,
            Outcome::CacheHit => {
                summary.translated += 1;
                summary.cache_hits += 1;
            }
            Outcome::Failed => summary.failed += 1,
            Outcome::Skipped => {}
        }
    }
    info!(
        translated = summary.translated,
        cache_hits = summary.cache_hits,
        failed = summary.failed,
        glossary_terms = glossary.len(),
        "translation run finished"
    );
    Ok(summary)
}

async fn process_article<T, S>(
    translator: &T,
    segmenter: &S,
    glossary: &Glossary,
    store: &Store,
    index: usize,
    total: usize,
    article: Article,
) -> Outcome
where
    T: Translate,
    S: SegmentTerms,
{
    let url = article.article_url;
    let Some(abstract_en) = article.abstract_en.as_deref().and_then(|s| clean_text(Some(s)))
    else {
        warn!(%url, "pending row without an abstract; skipping");
        return Outcome::Skipped;
    };
    let hash = article
        .abstract_en_hash
        .unwrap_or_else(|| sha256_text(&abstract_en));

    // An identical abstract may already carry a translation.
    match store.cached_translation(&hash).await {
        Ok(Some(cached)) => {
            let reconciled = glossary.reconcile(&url, &cached);
            return match store.update_translation(&url, &reconciled, &now_iso()).await {
                Ok(()) => {
                    info!(index = index + 1, total, %url, "translation reused");
                    Outcome::CacheHit
                }
                Err(e) => {
                    error!(%url, error = %e, "failed to persist reused translation");
                    Outcome::Failed
                }
            };
        }
        Ok(None) => {}
        Err(e) => warn!(%url, error = %e, "translation cache lookup failed"),
    }

    let candidates = segmenter.segment(&abstract_en);
    let known = glossary.known_renderings(&candidates);
    match translator.translate(&abstract_en, &known).await {
        Ok(raw) => {
            let reconciled = glossary.reconcile(&url, &raw);
            match store.update_translation(&url, &reconciled, &now_iso()).await {
                Ok(()) => {
                    info!(index = index + 1, total, %url, "translated");
                    Outcome::Translated
                }
                Err(e) => {
                    error!(%url, error = %e, "failed to persist translation");
                    Outcome::Failed
                }
            }
        }
        Err(e) => {
            warn!(%url, error = %e, "translation failed");
            if let Err(e) = store.set_status(&url, ArticleStatus::TranslateFailed).await {
                error!(%url, error = %e, "failed to record translation failure");
            }
            Outcome::Failed
        }
    }
}
