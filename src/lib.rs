//! Importer Wine Crawler - wine catalog crawling with Vivino rating enrichment
//!
//! This application crawls the red wine category of the-importer.co.il,
//! extracts structured product records from the product detail pages and
//! enriches every record with a community rating scraped from vivino.com.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

use anyhow::Result;
use tracing::info;

use crate::application::pipeline::CrawlPipeline;

/// Build the pipeline and drive a full crawl run.
///
/// An interrupt (ctrl-c) is observed only here, at the top level; whatever is
/// in flight is abandoned and the process exits without touching the output
/// files.
pub async fn run() -> Result<()> {
    infrastructure::logging::init_logging()?;

    let pipeline = CrawlPipeline::new()?;

    tokio::select! {
        result = pipeline.execute() => {
            let summary = result?;
            println!(
                "Done. Matched: {} | Unmatched: {}",
                summary.matched, summary.unmatched
            );
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, exiting");
        }
    }

    Ok(())
}
