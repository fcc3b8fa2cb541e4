use super::{get_text, sanitize_html, ContentError, FifoCache};
use crate::net::{retry, RetryPolicy};
use crate::util::{normalize, title_path_segment};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

/// Bound on the article content cache; oldest entries age out FIFO.
pub const ARTICLE_CACHE_CAPACITY: usize = 100;

/// A fetched article: its display title and sanitized body HTML.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub title: String,
    pub sanitized_html: String,
}

/// Fetches article content through a three-leg fallback chain, each leg
/// independently wrapped in the retry executor:
///
/// 1. REST `page/html` (full parsed HTML)
/// 2. REST `page/mobile-html` (alternate full-HTML rendering)
/// 3. REST `page/summary` (JSON lead extract; better than nothing)
///
/// Results are cached (bounded, FIFO) under the normalized title. When all
/// three legs fail the caller gets [`ContentError::Unavailable`] and is
/// expected to substitute a replacement article.
pub struct ArticleFetcher {
    client: reqwest::Client,
    rest_base: String,
    policy: RetryPolicy,
    cache: Mutex<FifoCache<Article>>,
}

impl ArticleFetcher {
    pub fn new(client: reqwest::Client, rest_base: String, policy: RetryPolicy) -> Self {
        Self {
            client,
            rest_base,
            policy,
            cache: Mutex::new(FifoCache::new(ARTICLE_CACHE_CAPACITY)),
        }
    }

    pub async fn fetch(&self, title: &str) -> Result<Article, ContentError> {
        let key = normalize(title);
        if let Some(hit) = self.cache.lock().await.get(&key) {
            return Ok(hit.clone());
        }

        let article = self.fetch_uncached(title).await?;
        self.cache.lock().await.insert(key, article.clone());
        Ok(article)
    }

    async fn fetch_uncached(&self, title: &str) -> Result<Article, ContentError> {
        let segment = title_path_segment(title);

        for variant in ["html", "mobile-html"] {
            let url = format!("{}/page/{}/{}", self.rest_base, variant, segment);
            match retry(&self.policy, || get_text(&self.client, &url)).await {
                Ok(html) => {
                    return Ok(Article {
                        title: title.to_string(),
                        sanitized_html: sanitize_html(&html),
                    });
                }
                Err(e) => {
                    tracing::debug!(title = title, variant = variant, error = %e, "Content endpoint failed, falling back");
                }
            }
        }

        let url = format!("{}/page/summary/{}", self.rest_base, segment);
        match retry(&self.policy, || self.get_summary(&url, title)).await {
            Ok(article) => Ok(article),
            Err(e) => {
                tracing::warn!(title = title, error = %e, "All content endpoints exhausted");
                Err(ContentError::Unavailable)
            }
        }
    }

    /// Summary leg: a JSON body carrying the lead extract as HTML.
    async fn get_summary(&self, url: &str, fallback_title: &str) -> Result<Article, ContentError> {
        let body = get_text(&self.client, url).await?;
        let json: Value = serde_json::from_str(&body)
            .map_err(|e| ContentError::Malformed(format!("summary: {e}")))?;

        let extract = json
            .get("extract_html")
            .and_then(Value::as_str)
            .ok_or_else(|| ContentError::Malformed("summary missing extract_html".into()))?;
        let title = json
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(fallback_title);

        Ok(Article {
            title: title.to_string(),
            sanitized_html: sanitize_html(extract),
        })
    }
}
