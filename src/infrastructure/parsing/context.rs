//! Parsing context objects for HTML extraction

/// Context for category listing pages
#[derive(Debug, Clone)]
pub struct CategoryParseContext {
    /// 1-based category page number
    pub page_number: u32,

    /// Base URL for resolving relative links
    pub base_url: String,
}

impl CategoryParseContext {
    pub fn new(page_number: u32, base_url: impl Into<String>) -> Self {
        Self {
            page_number,
            base_url: base_url.into(),
        }
    }
}

/// Context for product detail pages
#[derive(Debug, Clone)]
pub struct DetailParseContext {
    /// Product URL being parsed
    pub url: String,
}

impl DetailParseContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}
