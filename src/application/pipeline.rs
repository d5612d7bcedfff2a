//! Crawl pipeline - 4-stage orchestration
//!
//! Drives the full run: category crawl, product extraction, rating matching
//! and output writing. Each stage has its own concurrency bound; failures
//! inside a stage degrade to dropped items, never to an aborted run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use reqwest::header::HeaderMap;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::domain::product::{MatchResult, MatchedProduct, ProductRecord, UnmatchedProduct};
use crate::infrastructure::config::{self, defaults, output, the_importer};
use crate::infrastructure::http_client::{HttpClient, JitterWindow};
use crate::infrastructure::parsing::text::dedup_first_seen;
use crate::infrastructure::parsing::{CategoryParseContext, CategoryParser, ProductDetailParser};
use crate::infrastructure::vivino::{RatingCache, VivinoMatcher};

/// Fixed reason attached to products whose rating lookup failed
const UNMATCHED_REASON: &str = "No Vivino candidates / rating extract failed";

/// Pipeline tunables; defaults come from the fixed configuration constants
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_category_pages: u32,
    pub max_concurrent_detail: usize,
    pub max_concurrent_lookups: usize,
    pub matched_path: PathBuf,
    pub unmatched_path: PathBuf,
    pub cache_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_category_pages: defaults::MAX_CATEGORY_PAGES,
            max_concurrent_detail: defaults::MAX_CONCURRENT_DETAIL,
            max_concurrent_lookups: defaults::MAX_CONCURRENT_LOOKUPS,
            matched_path: PathBuf::from(output::MATCHED_PATH),
            unmatched_path: PathBuf::from(output::UNMATCHED_PATH),
            cache_path: PathBuf::from(output::CACHE_PATH),
        }
    }
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub product_urls: usize,
    pub extracted: usize,
    pub matched: usize,
    pub unmatched: usize,
}

/// 4-stage crawl pipeline
pub struct CrawlPipeline {
    http: Arc<HttpClient>,
    category_parser: CategoryParser,
    detail_parser: ProductDetailParser,
    config: PipelineConfig,
}

impl CrawlPipeline {
    /// Build the pipeline with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(PipelineConfig::default())
    }

    /// Build the pipeline with a custom configuration
    pub fn with_config(config: PipelineConfig) -> Result<Self> {
        Ok(Self {
            http: Arc::new(HttpClient::new()?),
            category_parser: CategoryParser::new()?,
            detail_parser: ProductDetailParser::new()?,
            config,
        })
    }

    /// Execute the full run
    pub async fn execute(&self) -> Result<RunSummary> {
        info!("[OUT] Matched -> {}", self.config.matched_path.display());
        info!("[OUT] Unmatched -> {}", self.config.unmatched_path.display());

        let cache = Arc::new(RatingCache::load(&self.config.cache_path).await);

        let urls = self.stage1_collect_product_urls().await;
        let products = self.stage2_extract_products(&urls).await;
        let extracted = products.len();

        let (matched, unmatched) = self.stage3_match_ratings(products, Arc::clone(&cache)).await;
        self.stage4_write_outputs(&matched, &unmatched).await?;
        cache.save().await;

        Ok(RunSummary {
            product_urls: urls.len(),
            extracted,
            matched: matched.len(),
            unmatched: unmatched.len(),
        })
    }

    /// Stage 1: crawl every category page concurrently and aggregate the
    /// discovered product URLs in page-number order, deduplicated globally
    async fn stage1_collect_product_urls(&self) -> Vec<String> {
        let total_pages = self.config.max_category_pages;
        info!("Stage 1: crawling {} category pages", total_pages);

        let headers = config::default_headers();
        let page_tasks = (1..=total_pages).map(|page| {
            let headers = &headers;
            async move {
                let url = category_page_url(page);
                let markup = self
                    .http
                    .fetch_text(&url, Some(headers), &[], defaults::CATEGORY_JITTER)
                    .await;

                let context = CategoryParseContext::new(page, the_importer::BASE_URL);
                let urls = markup
                    .map(|markup| self.category_parser.extract_product_urls(&markup, &context))
                    .unwrap_or_default();

                info!("[PARSE] page {}: collected {} product URLs", page, urls.len());
                urls
            }
        });

        // join_all preserves input order, so aggregation is page-number order
        let per_page = join_all(page_tasks).await;
        let unique = dedup_first_seen(per_page.into_iter().flatten().collect());
        info!("[PARSE] total unique product URLs: {}", unique.len());
        unique
    }

    /// Stage 2: extract product pages in fixed-size chunks, each chunk fully
    /// awaited before the next starts
    async fn stage2_extract_products(&self, urls: &[String]) -> Vec<ProductRecord> {
        info!("Stage 2: extracting {} product pages", urls.len());

        let chunk_size = self.config.max_concurrent_detail.max(1);
        let semaphore = Arc::new(Semaphore::new(chunk_size));
        let headers = config::product_page_headers();

        let mut products = Vec::new();
        let mut done = 0usize;

        for chunk in urls.chunks(chunk_size) {
            let chunk_tasks = chunk.iter().map(|url| {
                let semaphore = Arc::clone(&semaphore);
                let headers = &headers;
                async move {
                    match semaphore.acquire().await {
                        Ok(_permit) => self.extract_product(url, headers).await,
                        Err(_) => None,
                    }
                }
            });

            let chunk_results = join_all(chunk_tasks).await;
            products.extend(chunk_results.into_iter().flatten());

            done += chunk.len();
            info!("[PDP] parsed {}/{} ... kept {}", done, urls.len(), products.len());
        }

        info!("[PDP] done: kept {} / {}", products.len(), urls.len());
        products
    }

    /// Fetch and parse one product page, retrying once with slower pacing;
    /// some anti-bot layers serve different content based on timing
    async fn extract_product(&self, url: &str, headers: &HeaderMap) -> Option<ProductRecord> {
        let mut record = self.fetch_and_parse(url, headers, defaults::DETAIL_JITTER).await;
        if record.is_none() {
            record = self
                .fetch_and_parse(url, headers, defaults::DETAIL_RETRY_JITTER)
                .await;
        }

        match &record {
            Some(record) => info!(
                "[PDP] ok: {}  ₪{}  {}ml",
                record.name, record.price_value, record.bottle_size_ml
            ),
            None => warn!("[PDP-ERR] {} -> (parse failed)", url),
        }
        record
    }

    async fn fetch_and_parse(
        &self,
        url: &str,
        headers: &HeaderMap,
        jitter: JitterWindow,
    ) -> Option<ProductRecord> {
        let markup = self.http.fetch_text(url, Some(headers), &[], jitter).await?;
        self.detail_parser
            .parse(&markup, url)
            .map_err(|e| debug!("[PDP] {} rejected: {}", url, e))
            .ok()
    }

    /// Stage 3: look up ratings under their own concurrency bound and
    /// partition the products by outcome.
    ///
    /// Lookups are dispatched once per distinct product name, so two
    /// products sharing a name can never race the same cache entry; they
    /// both receive the single outcome.
    async fn stage3_match_ratings(
        &self,
        products: Vec<ProductRecord>,
        cache: Arc<RatingCache>,
    ) -> (Vec<MatchedProduct>, Vec<UnmatchedProduct>) {
        info!("Stage 3: matching {} products against Vivino", products.len());

        let matcher = Arc::new(VivinoMatcher::new(Arc::clone(&self.http), cache));
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_lookups.max(1)));

        let names = dedup_first_seen(products.iter().map(|p| p.name.clone()).collect());
        let lookup_tasks = names.iter().map(|name| {
            let matcher = Arc::clone(&matcher);
            let semaphore = Arc::clone(&semaphore);
            async move {
                match semaphore.acquire().await {
                    Ok(_permit) => matcher.lookup(name).await,
                    Err(_) => None,
                }
            }
        });
        let outcomes = join_all(lookup_tasks).await;

        let by_name: HashMap<String, Option<MatchResult>> =
            names.into_iter().zip(outcomes).collect();

        let mut matched = Vec::new();
        let mut unmatched = Vec::new();
        for product in products {
            match by_name.get(&product.name).cloned().flatten() {
                Some(rating) => matched.push(MatchedProduct { product, rating }),
                None => unmatched.push(UnmatchedProduct {
                    product,
                    reason: UNMATCHED_REASON.to_string(),
                }),
            }
        }

        info!(
            "Stage 3 completed: {} matched, {} unmatched",
            matched.len(),
            unmatched.len()
        );
        (matched, unmatched)
    }

    /// Stage 4: write both output partitions, empty arrays included
    async fn stage4_write_outputs(
        &self,
        matched: &[MatchedProduct],
        unmatched: &[UnmatchedProduct],
    ) -> Result<()> {
        write_json_array(&self.config.matched_path, matched).await?;
        write_json_array(&self.config.unmatched_path, unmatched).await?;
        Ok(())
    }
}

fn category_page_url(page: u32) -> String {
    if page == 1 {
        the_importer::CATEGORY_URL.to_string()
    } else {
        format!("{}?p={}", the_importer::CATEGORY_URL, page)
    }
}

async fn write_json_array<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(items)
        .with_context(|| format!("serializing {}", path.display()))?;
    tokio::fs::write(path, &json)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    info!(
        "[WRITE] {} ({} bytes) - items: {}",
        path.display(),
        json.len(),
        items.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_category_page_is_unparameterized() {
        assert_eq!(category_page_url(1), the_importer::CATEGORY_URL);
        assert_eq!(
            category_page_url(3),
            format!("{}?p=3", the_importer::CATEGORY_URL)
        );
    }

    #[test]
    fn pipeline_builds_with_default_config() {
        assert!(CrawlPipeline::new().is_ok());
    }

    #[tokio::test]
    async fn outputs_are_written_even_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            matched_path: dir.path().join("matched.json"),
            unmatched_path: dir.path().join("unmatched.json"),
            ..PipelineConfig::default()
        };
        let pipeline = CrawlPipeline::with_config(config.clone()).unwrap();

        pipeline.stage4_write_outputs(&[], &[]).await.unwrap();

        let matched = tokio::fs::read_to_string(&config.matched_path).await.unwrap();
        let unmatched = tokio::fs::read_to_string(&config.unmatched_path).await.unwrap();
        assert_eq!(matched.trim(), "[]");
        assert_eq!(unmatched.trim(), "[]");
    }
}
