//! HTML parsing infrastructure
//!
//! Trait-based parsing architecture with pre-compiled selector strategies,
//! regex fallbacks and per-page error reporting.

pub mod category_parser;
pub mod context;
pub mod product_detail_parser;
pub mod text;

// Re-export public types
pub use category_parser::CategoryParser;
pub use context::{CategoryParseContext, DetailParseContext};
pub use product_detail_parser::ProductDetailParser;

use scraper::Html;

use crate::infrastructure::parsing_error::ParsingResult;

/// Parser trait with context support
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse HTML with contextual information
    fn parse_with_context(&self, html: &Html, context: &Self::Context)
        -> ParsingResult<Self::Output>;
}
