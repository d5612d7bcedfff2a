//! Application layer module
//!
//! Contains the pipeline that drives a full crawl-extract-match run.

pub mod pipeline;

pub use pipeline::{CrawlPipeline, PipelineConfig, RunSummary};
