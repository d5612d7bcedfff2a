//! Parsing error types for HTML extraction
//!
//! Every variant describes a recoverable, per-page condition: the pipeline
//! logs it and drops the page rather than aborting the run.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParsingError {
    #[error("Required field '{field}' not found in HTML")]
    RequiredFieldMissing {
        field: String,
        context: Option<String>,
    },

    #[error("Not a product page: {url}")]
    NotAProductPage { url: String },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed { url: String, reason: String },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },
}

impl ParsingError {
    /// Create a required field missing error with context
    pub fn required_field_missing(field: &str, context: Option<&str>) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            context: context.map(|s| s.to_string()),
        }
    }

    /// Create a page classification rejection
    pub fn not_a_product_page(url: &str) -> Self {
        Self::NotAProductPage {
            url: url.to_string(),
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
