//! Category listing parser
//!
//! Extracts candidate product links from category pages via CSS selectors,
//! with a raw-markup regex scan as the degraded-mode fallback when the
//! selector pass comes up empty.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::context::CategoryParseContext;
use super::text::dedup_first_seen;
use super::ContextualParser;
use crate::infrastructure::config::the_importer;
use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};

/// Anchor selectors known to wrap product links on the listing pages, in one
/// union so document order is preserved across the patterns
const PRODUCT_LINK_SELECTOR: &str = "a.product-item-link, h2 a, h3 a, a[href*='-']";

static RAW_ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a[^>]+href="([^"]+)""#).expect("anchor pattern"));

/// Parser for extracting product page links from category listings
pub struct CategoryParser {
    link_selector: Selector,
}

impl CategoryParser {
    /// Create a new category parser with the default link selectors
    pub fn new() -> ParsingResult<Self> {
        let link_selector = Selector::parse(PRODUCT_LINK_SELECTOR).map_err(|e| {
            ParsingError::InvalidSelector {
                selector: PRODUCT_LINK_SELECTOR.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self { link_selector })
    }

    /// Extract candidate product URLs from raw category page markup.
    ///
    /// Runs the selector pass first; if it finds nothing (markup too broken
    /// for tree parsing), falls back to a raw anchor-href scan. The result is
    /// absolute, on-site, deduplicated in first-seen order.
    pub fn extract_product_urls(&self, markup: &str, context: &CategoryParseContext) -> Vec<String> {
        let html = Html::parse_document(markup);
        let mut urls = self
            .parse_with_context(&html, context)
            .unwrap_or_default();

        if urls.is_empty() {
            debug!(
                "page {}: selector pass empty, scanning raw markup",
                context.page_number
            );
            urls = Self::scan_raw_markup(markup, &context.base_url);
        }

        urls
    }

    /// Degraded-mode extraction: regex over the raw markup
    pub fn scan_raw_markup(markup: &str, base_url: &str) -> Vec<String> {
        let urls = RAW_ANCHOR_RE
            .captures_iter(markup)
            .filter_map(|captures| accept_href(&captures[1], base_url))
            .collect();
        dedup_first_seen(urls)
    }
}

impl ContextualParser for CategoryParser {
    type Output = Vec<String>;
    type Context = CategoryParseContext;

    fn parse_with_context(
        &self,
        html: &Html,
        context: &Self::Context,
    ) -> ParsingResult<Self::Output> {
        let urls = html
            .select(&self.link_selector)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| accept_href(href, &context.base_url))
            .collect();

        Ok(dedup_first_seen(urls))
    }
}

/// Resolve an href to an absolute on-site URL, or reject it.
///
/// Filters links pointing off-domain and the obvious non-product routes
/// (cart, checkout, account and friends).
fn accept_href(href: &str, base_url: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }

    let absolute = if href.starts_with('/') {
        match Url::parse(base_url).and_then(|base| base.join(href)) {
            Ok(joined) => joined.to_string(),
            Err(e) => {
                warn!("failed to resolve '{}' against '{}': {}", href, base_url, e);
                return None;
            }
        }
    } else {
        href.to_string()
    };

    if !absolute.contains(base_url) {
        return None;
    }
    if the_importer::EXCLUDED_PATH_SEGMENTS
        .iter()
        .any(|segment| absolute.contains(segment))
    {
        return None;
    }

    Some(absolute)
}
