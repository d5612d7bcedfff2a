//! Infrastructure layer for HTTP, HTML parsing and the Vivino integration
//!
//! Provides the shared HTTP client, the category/product-page parsers and the
//! rating lookup subsystem with its persistent cache.

pub mod config;
pub mod http_client;
pub mod logging;
pub mod parsing;
pub mod parsing_error;
pub mod vivino;

// Re-export commonly used types
pub use http_client::{HttpClient, JitterWindow};
pub use parsing::{CategoryParser, ProductDetailParser};
pub use parsing_error::{ParsingError, ParsingResult};
pub use vivino::{RatingCache, VivinoMatcher};
