//! Rating lookup against Vivino with a multi-source fallback chain
//!
//! Primary source is a Bing search restricted to vivino.com; when it yields
//! nothing, Vivino's own search endpoint is queried through a single-flight
//! backoff gate that respects the site's aggressive rate limiting. Candidate
//! wine pages are then scraped for a plausible average rating.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};
use url::Url;

use super::cache::RatingCache;
use super::query::to_search_query;
use crate::domain::product::MatchResult;
use crate::infrastructure::config::{bing, defaults, vivino};
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::parsing::text::dedup_first_seen;

/// Absolute links into vivino.com inside search result markup
static SEARCH_RESULT_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a href="(https?://[^"]+vivino[^"]+)""#).expect("result link pattern"));

/// Site-relative wine links inside Vivino's own search markup
static WINE_PATH_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r##"href="(/wines/[^"#?]+)""##).expect("wine path pattern"));

/// Average rating inside Vivino's embedded structured data
static STRUCTURED_RATING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""rating"\s*:\s*\{[^}]*"average"\s*:\s*([0-9.]+)"#).expect("rating pattern")
});

/// Free-text "X.Y / 5" or "X.Y out of 5" rating
static TEXT_RATING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([3-5]\.[0-9])\s*(?:/|out of)?\s*5").expect("text rating pattern"));

/// Rating lookup service, memoized by the shared [`RatingCache`]
pub struct VivinoMatcher {
    http: Arc<HttpClient>,
    cache: Arc<RatingCache>,
    headers: HeaderMap,
    /// Only one fallback search may be in flight process-wide
    fallback_gate: Semaphore,
}

impl VivinoMatcher {
    pub fn new(http: Arc<HttpClient>, cache: Arc<RatingCache>) -> Self {
        Self {
            http,
            cache,
            headers: crate::infrastructure::config::vivino_headers(),
            fallback_gate: Semaphore::new(1),
        }
    }

    /// Look up the rating for a product name.
    ///
    /// The cache short-circuits both positive and negative prior outcomes
    /// with zero network activity. A fresh lookup that exhausts every
    /// candidate stores the permanent negative marker.
    pub async fn lookup(&self, name: &str) -> Option<MatchResult> {
        let key = name.trim();
        if let Some(cached) = self.cache.get(key).await {
            return cached;
        }

        let query = to_search_query(name);

        let mut candidates = self.bing_candidates(&query).await;
        if candidates.is_empty() {
            candidates = self.fallback_candidates(&query).await;
        }

        for candidate in candidates.iter().take(defaults::MAX_RATING_CANDIDATES) {
            let Some(page) = self
                .http
                .fetch_text(candidate, Some(&self.headers), &[], defaults::RATING_PAGE_JITTER)
                .await
            else {
                continue;
            };

            if let Some(rating) = extract_rating(&page) {
                let result = MatchResult {
                    vivino_url: candidate.clone(),
                    vivino_rating: round2(rating),
                };
                self.cache.insert(key, Some(result.clone())).await;
                return Some(result);
            }
        }

        self.cache.insert(key, None).await;
        None
    }

    /// Primary search: Bing restricted to the rating site's domain
    async fn bing_candidates(&self, query: &str) -> Vec<String> {
        let site_query = format!("site:vivino.com \"{query}\"");
        let params = [("q", site_query.as_str()), ("setlang", "en")];

        let Some(html) = self
            .http
            .fetch_text(
                bing::SEARCH_URL,
                Some(&self.headers),
                &params,
                defaults::SEARCH_JITTER,
            )
            .await
        else {
            return Vec::new();
        };

        let links = extract_search_result_links(&html);
        if !links.is_empty() {
            info!("[VIVINO] Bing hits for '{}': {}", truncate(query, 60), links.len());
        }
        links
    }

    /// Fallback search on Vivino itself, serialized through the gate
    async fn fallback_candidates(&self, query: &str) -> Vec<String> {
        // the permit is held across the whole backoff loop
        let Ok(_permit) = self.fallback_gate.acquire().await else {
            return Vec::new();
        };

        let Some(html) = self.fetch_fallback_with_backoff(query).await else {
            return Vec::new();
        };

        let links = extract_wine_path_links(&html);
        if !links.is_empty() {
            info!(
                "[VIVINO] fallback hits for '{}': {}",
                truncate(query, 60),
                links.len()
            );
        }
        links
    }

    /// Query the rate-limited search endpoint with exponential backoff.
    ///
    /// A 429 grows the delay aggressively with jitter; any other failure
    /// grows it more modestly. Exhausting the attempt budget degrades to a
    /// failed fetch.
    async fn fetch_fallback_with_backoff(&self, query: &str) -> Option<String> {
        let params = [("q", query)];
        let mut delay_secs = defaults::FALLBACK_INITIAL_DELAY_SECS;

        for attempt in 1..=defaults::FALLBACK_MAX_TRIES {
            if attempt > 1 {
                sleep(Duration::from_secs_f64(delay_secs)).await;
            }

            match self
                .http
                .get(vivino::FALLBACK_SEARCH_URL, Some(&self.headers), &params)
                .await
            {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    warn!(
                        "[VIVINO-429] backoff attempt {}, sleeping {:.1}s",
                        attempt, delay_secs
                    );
                    delay_secs *= 1.7 + fastrand::f64() * 0.3;
                }
                Ok(response) if response.status().is_success() => {
                    match response.text().await {
                        Ok(body) => return Some(body),
                        Err(e) => {
                            warn!("[HTTP-ERR] {} -> {}", vivino::FALLBACK_SEARCH_URL, e);
                            delay_secs *= 1.4;
                        }
                    }
                }
                Ok(response) => {
                    warn!(
                        "[HTTP-ERR] {} -> {}",
                        vivino::FALLBACK_SEARCH_URL,
                        response.status()
                    );
                    delay_secs *= 1.4;
                }
                Err(e) => {
                    warn!("[HTTP-ERR] {} -> {}", vivino::FALLBACK_SEARCH_URL, e);
                    delay_secs *= 1.4;
                }
            }
        }

        None
    }
}

/// Harvest wine-detail links from search engine result markup.
///
/// Search result pages are hostile to tree parsing (obfuscated markup,
/// wrapped redirects), so this scans anchors by regex, keeps those pointing
/// at the wine-detail path and canonicalizes them to scheme+host+path.
fn extract_search_result_links(html: &str) -> Vec<String> {
    let links = SEARCH_RESULT_LINK_RE
        .captures_iter(html)
        .map(|captures| captures[1].to_string())
        .filter(|link| link.contains(vivino::WINE_PATH))
        .map(|link| canonicalize(&link))
        .collect();
    dedup_first_seen(links)
}

/// Harvest site-relative wine links from Vivino's own search markup
fn extract_wine_path_links(html: &str) -> Vec<String> {
    let links = WINE_PATH_LINK_RE
        .captures_iter(html)
        .map(|captures| format!("{}{}", vivino::BASE_URL, &captures[1]))
        .collect();
    dedup_first_seen(links)
}

/// Strip query and fragment, keeping scheme + host + path
fn canonicalize(link: &str) -> String {
    match Url::parse(link) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => link.to_string(),
    }
}

/// Extract a plausible average rating from a wine page.
///
/// Tries the structured-data pattern first, then the free-text one; a value
/// outside the plausible range is discarded, never accepted.
fn extract_rating(html: &str) -> Option<f64> {
    let (min_rating, max_rating) = defaults::RATING_RANGE;
    let plausible = |value: f64| value >= min_rating && value <= max_rating;

    if let Some(captures) = STRUCTURED_RATING_RE.captures(html) {
        if let Ok(value) = captures[1].parse::<f64>() {
            if plausible(value) {
                return Some(value);
            }
        }
    }

    if let Some(captures) = TEXT_RATING_RE.captures(html) {
        if let Ok(value) = captures[1].parse::<f64>() {
            if plausible(value) {
                return Some(value);
            }
        }
    }

    None
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_rating_pattern_extracts_average() {
        let html = r#"<script>{"wine": {"rating": {"count": 120, "average": 4.3}}}</script>"#;
        assert_eq!(extract_rating(html), Some(4.3));
    }

    #[test]
    fn implausible_rating_is_discarded_not_accepted() {
        let html = r#"{"rating": {"average": 1.2}}"#;
        assert_eq!(extract_rating(html), None);
    }

    #[test]
    fn free_text_rating_as_fallback() {
        assert_eq!(extract_rating("rated 4.1/5 by the community"), Some(4.1));
        assert_eq!(extract_rating("scores 3.8 out of 5 overall"), Some(3.8));
    }

    #[test]
    fn rating_above_range_is_discarded() {
        let html = r#"{"rating": {"average": 5.4}}"#;
        assert_eq!(extract_rating(html), None);
    }

    #[test]
    fn rounding_keeps_two_decimals() {
        assert_eq!(round2(4.256), 4.26);
        assert_eq!(round2(4.3), 4.3);
    }

    #[test]
    fn search_result_links_filtered_and_canonicalized() {
        let html = r#"
            <a href="https://www.vivino.com/wines/123?ref=bing#reviews">wine</a>
            <a href="https://www.vivino.com/users/someone">user</a>
            <a href="https://www.vivino.com/wines/123?other=param">dup</a>
            <a href="https://www.vivino.com/wines/456">other wine</a>
            <a href="https://unrelated.example/page">noise</a>
        "#;

        assert_eq!(
            extract_search_result_links(html),
            vec![
                "https://www.vivino.com/wines/123".to_string(),
                "https://www.vivino.com/wines/456".to_string(),
            ]
        );
    }

    #[test]
    fn wine_path_links_join_the_site_base() {
        let html = r#"
            <a href="/wines/IL-red-999">hit</a>
            <a href="/wines/IL-red-999">dup</a>
            <a href="/users/profile">miss</a>
        "#;

        assert_eq!(
            extract_wine_path_links(html),
            vec!["https://www.vivino.com/wines/IL-red-999".to_string()]
        );
    }

    #[tokio::test]
    async fn cached_negative_short_circuits_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(RatingCache::load(dir.path().join("cache.json")).await);
        cache.insert("known miss", None).await;

        let matcher = VivinoMatcher::new(Arc::new(HttpClient::new().unwrap()), cache);
        // resolved from the cache without any network round-trip
        assert_eq!(matcher.lookup("known miss").await, None);
    }

    #[tokio::test]
    async fn cached_positive_short_circuits_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(RatingCache::load(dir.path().join("cache.json")).await);
        let rating = MatchResult {
            vivino_url: "https://www.vivino.com/wines/77".to_string(),
            vivino_rating: 4.2,
        };
        cache.insert("known hit", Some(rating.clone())).await;

        let matcher = VivinoMatcher::new(Arc::new(HttpClient::new().unwrap()), cache);
        assert_eq!(matcher.lookup("known hit").await, Some(rating));
    }
}
