use super::{get_text, ContentError, FifoCache};
use crate::net::{retry, RetryPolicy};
use crate::util::normalize;
use serde_json::Value;
use tokio::sync::Mutex;

/// Bound on the redirect cache; oldest entries age out FIFO.
pub const REDIRECT_CACHE_CAPACITY: usize = 200;

/// Outcome of a redirect resolution. The public contract is never-throw:
/// a failed lookup degrades to the literal title, but the tag lets callers
/// and tests tell the two paths apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Lookup succeeded; this is the canonical, properly capitalized title.
    Canonical(String),
    /// Lookup failed or carried no usable title; literal input preserved.
    Fallback(String),
}

impl Resolution {
    pub fn title(&self) -> &str {
        match self {
            Resolution::Canonical(t) | Resolution::Fallback(t) => t,
        }
    }

    pub fn into_title(self) -> String {
        match self {
            Resolution::Canonical(t) | Resolution::Fallback(t) => t,
        }
    }

    pub fn is_canonical(&self) -> bool {
        matches!(self, Resolution::Canonical(_))
    }
}

/// Resolves article titles to their canonical (redirect target) form via
/// the wiki action API, with a bounded FIFO cache keyed by normalized title.
///
/// Failed lookups are cached too, so a flaky endpoint is not re-queried for
/// the same title on every navigation.
pub struct RedirectResolver {
    client: reqwest::Client,
    api_base: String,
    policy: RetryPolicy,
    cache: Mutex<FifoCache<Resolution>>,
}

impl RedirectResolver {
    pub fn new(client: reqwest::Client, api_base: String, policy: RetryPolicy) -> Self {
        Self {
            client,
            api_base,
            policy,
            cache: Mutex::new(FifoCache::new(REDIRECT_CACHE_CAPACITY)),
        }
    }

    /// Resolves `title` to its canonical form. Never fails: any unresolved
    /// error after retries falls back to the literal input.
    ///
    /// Repeated calls with inputs sharing a normalized key hit the cache and
    /// make no further network calls.
    pub async fn resolve(&self, title: &str) -> Resolution {
        let key = normalize(title);
        if key.is_empty() {
            return Resolution::Fallback(title.to_string());
        }

        if let Some(hit) = self.cache.lock().await.get(&key) {
            return hit.clone();
        }

        let resolution = match self.lookup(title).await {
            Ok(Some(canonical)) => Resolution::Canonical(canonical),
            Ok(None) => {
                tracing::debug!(title = title, "No redirect info for title, using literal form");
                Resolution::Fallback(title.to_string())
            }
            Err(e) => {
                tracing::warn!(title = title, error = %e, "Redirect lookup failed, using literal title");
                Resolution::Fallback(title.to_string())
            }
        };

        self.cache.lock().await.insert(key, resolution.clone());
        resolution
    }

    async fn lookup(&self, title: &str) -> Result<Option<String>, ContentError> {
        let url = format!(
            "{}?action=query&format=json&redirects=1&titles={}",
            self.api_base,
            urlencoding::encode(title)
        );
        let body = retry(&self.policy, || get_text(&self.client, &url)).await?;
        let json: Value = serde_json::from_str(&body)
            .map_err(|e| ContentError::Malformed(format!("redirect lookup: {e}")))?;
        Ok(extract_canonical(&json))
    }
}

/// Pulls the canonical title out of an action-API query response, in
/// preference order: followed redirect, title normalization, page title.
fn extract_canonical(json: &Value) -> Option<String> {
    let query = json.get("query")?;

    for list in ["redirects", "normalized"] {
        if let Some(to) = query
            .get(list)
            .and_then(|entries| entries.get(0))
            .and_then(|entry| entry.get("to"))
            .and_then(Value::as_str)
        {
            return Some(to.to_string());
        }
    }

    query
        .get("pages")
        .and_then(Value::as_object)
        .and_then(|pages| pages.values().next())
        .and_then(|page| page.get("title"))
        .and_then(Value::as_str)
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver_for(server: &MockServer) -> RedirectResolver {
        RedirectResolver::new(
            reqwest::Client::new(),
            format!("{}/w/api.php", server.uri()),
            RetryPolicy {
                initial_delay: std::time::Duration::from_millis(1),
                max_delay: std::time::Duration::from_millis(2),
                ..RetryPolicy::default()
            },
        )
    }

    fn redirect_body(from: &str, to: &str) -> String {
        format!(r#"{{"query":{{"redirects":[{{"from":"{from}","to":"{to}"}}]}}}}"#)
    }

    #[tokio::test]
    async fn test_resolves_redirect_to_canonical() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("titles", "USA"))
            .respond_with(ResponseTemplate::new(200).set_body_string(redirect_body("USA", "United States")))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        let resolution = resolver.resolve("USA").await;
        assert_eq!(resolution, Resolution::Canonical("United States".into()));
    }

    #[tokio::test]
    async fn test_cache_hit_makes_no_second_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(redirect_body("USA", "United States")))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        let first = resolver.resolve("USA").await;
        // Different capitalization shares the normalized cache key
        let second = resolver.resolve("usa").await;
        assert_eq!(first.title(), "United States");
        assert_eq!(second.title(), "United States");
        // MockServer verifies expect(1) on drop
    }

    #[tokio::test]
    async fn test_already_canonical_title_returns_itself() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"query":{"pages":{"123":{"title":"United States"}}}}"#,
            ))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        let resolution = resolver.resolve("United States").await;
        assert_eq!(resolution, Resolution::Canonical("United States".into()));
    }

    #[tokio::test]
    async fn test_failure_falls_back_and_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        let first = resolver.resolve("Ghost Page").await;
        assert_eq!(first, Resolution::Fallback("Ghost Page".into()));

        // Second call must be served from cache (expect(1) above)
        let second = resolver.resolve("ghost page").await;
        assert_eq!(second.title(), "Ghost Page");
    }

    #[tokio::test]
    async fn test_empty_query_falls_back_to_literal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"query":{}}"#))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        let resolution = resolver.resolve("Plain Title").await;
        assert_eq!(resolution, Resolution::Fallback("Plain Title".into()));
    }

    #[tokio::test]
    async fn test_server_error_retries_then_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        let resolution = resolver.resolve("Flaky").await;
        assert!(!resolution.is_canonical());
    }

    #[test]
    fn test_extract_canonical_preference_order() {
        let with_redirect: Value = serde_json::from_str(
            r#"{"query":{"redirects":[{"from":"A","to":"B"}],"pages":{"1":{"title":"C"}}}}"#,
        )
        .unwrap();
        assert_eq!(extract_canonical(&with_redirect).as_deref(), Some("B"));

        let normalized_only: Value =
            serde_json::from_str(r#"{"query":{"normalized":[{"from":"a","to":"A"}]}}"#).unwrap();
        assert_eq!(extract_canonical(&normalized_only).as_deref(), Some("A"));

        let no_query: Value = serde_json::from_str("{}").unwrap();
        assert_eq!(extract_canonical(&no_query), None);
    }
}
