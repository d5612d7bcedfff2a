//! Configuration infrastructure
//!
//! All tunables are fixed constants: endpoint addresses, concurrency limits,
//! timeouts and the request header profiles. There are no command-line flags
//! and no configuration files.

use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA, REFERER,
};

use crate::infrastructure::http_client::JitterWindow;

/// Browser-like user agent carried on every request
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Endpoints of the crawled shop
pub mod the_importer {
    /// Site root, also used to resolve relative links
    pub const BASE_URL: &str = "https://www.the-importer.co.il";

    /// Red wine category listing (first page; pages >= 2 add `?p=<n>`)
    pub const CATEGORY_URL: &str = "https://www.the-importer.co.il/יין/יין-אדום";

    /// Path fragments that mark obvious non-product routes
    pub const EXCLUDED_PATH_SEGMENTS: &[&str] = &[
        "/customer/",
        "/cart",
        "/checkout",
        "/search",
        "/account",
        "/login",
    ];
}

/// General-purpose search engine used for the primary rating lookup
pub mod bing {
    pub const SEARCH_URL: &str = "https://www.bing.com/search";
}

/// Target rating site
pub mod vivino {
    pub const BASE_URL: &str = "https://www.vivino.com";

    /// Vivino's own search endpoint, rate limited; see the fallback gate
    pub const FALLBACK_SEARCH_URL: &str = "https://www.vivino.com/search/wines";

    /// Wine detail pages live under this path
    pub const WINE_PATH: &str = "/wines/";
}

/// Fixed tunables for the whole run
pub mod defaults {
    use super::JitterWindow;

    /// Category pages walked per run
    pub const MAX_CATEGORY_PAGES: u32 = 10;

    /// Concurrent product detail extractions (also the chunk size)
    pub const MAX_CONCURRENT_DETAIL: usize = 6;

    /// Concurrent Vivino rating lookups
    pub const MAX_CONCURRENT_LOOKUPS: usize = 6;

    /// Overall per-request timeout
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 40;

    /// Standard bottle size assumed when a page does not state one
    pub const DEFAULT_BOTTLE_SIZE_ML: u32 = 750;

    /// Plausible bottle size range for bare-number extraction
    pub const BOTTLE_SIZE_RANGE_ML: (u32, u32) = (50, 3000);

    /// Plausible Vivino rating range
    pub const RATING_RANGE: (f64, f64) = (2.5, 5.0);

    /// Wine detail candidates scanned per lookup
    pub const MAX_RATING_CANDIDATES: usize = 3;

    /// Attempts against the rate-limited fallback search
    pub const FALLBACK_MAX_TRIES: u32 = 6;

    /// Initial fallback backoff delay in seconds
    pub const FALLBACK_INITIAL_DELAY_SECS: f64 = 2.0;

    /// Politeness jitter for category listing fetches
    pub const CATEGORY_JITTER: JitterWindow = JitterWindow::from_millis(200, 500);

    /// Politeness jitter for the first product page attempt
    pub const DETAIL_JITTER: JitterWindow = JitterWindow::from_millis(300, 800);

    /// Slower jitter for the second product page attempt; some anti-bot
    /// layers swap content based on timing
    pub const DETAIL_RETRY_JITTER: JitterWindow = JitterWindow::from_millis(1000, 1800);

    /// Jitter for search engine queries
    pub const SEARCH_JITTER: JitterWindow = JitterWindow::from_millis(400, 1000);

    /// Jitter for wine detail page scans
    pub const RATING_PAGE_JITTER: JitterWindow = JitterWindow::from_millis(600, 1200);
}

/// Output and cache file locations, relative to the working directory
pub mod output {
    pub const MATCHED_PATH: &str = "the_importer_matched.json";
    pub const UNMATCHED_PATH: &str = "the_importer_unmatched.json";
    pub const CACHE_PATH: &str = "vivino_cache.json";
}

/// Header profile for category listing fetches
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("he-IL,he;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(
        "Upgrade-Insecure-Requests",
        HeaderValue::from_static("1"),
    );
    headers
}

/// Header profile for product page fetches; carries a referer pointing at the
/// site root so the requests look like in-site navigation
pub fn product_page_headers() -> HeaderMap {
    let mut headers = default_headers();
    let referer = format!("{}/", the_importer::BASE_URL);
    if let Ok(value) = HeaderValue::from_str(&referer) {
        headers.insert(REFERER, value);
    }
    headers
}

/// Header profile for search engines and Vivino; prefers English content
pub fn vivino_headers() -> HeaderMap {
    let mut headers = default_headers();
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_page_headers_carry_site_referer() {
        let headers = product_page_headers();
        assert_eq!(
            headers.get(REFERER).unwrap(),
            "https://www.the-importer.co.il/"
        );
    }

    #[test]
    fn vivino_headers_prefer_english() {
        let headers = vivino_headers();
        assert_eq!(headers.get(ACCEPT_LANGUAGE).unwrap(), "en-US,en;q=0.9");
    }

    #[test]
    fn category_url_lives_under_base() {
        assert!(the_importer::CATEGORY_URL.starts_with(the_importer::BASE_URL));
    }
}
