use serde::{Deserialize, Serialize};

/// Product information extracted from a product detail page
///
/// Immutable once built; the extractor guarantees a non-empty name and a
/// resolved price, and falls back to the standard 750ml bottle when the page
/// does not state a size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Normalized display name (entities decoded, whitespace collapsed)
    pub name: String,
    /// Price in the shop's local currency (NIS)
    pub price_value: f64,
    /// Bottle size in milliliters, defaults to 750 when unresolved
    pub bottle_size_ml: u32,
    /// Canonical product page address
    pub url: String,
}

/// Rating looked up on Vivino for a product name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Address of the matched wine detail page
    pub vivino_url: String,
    /// Average community rating, constrained to [2.5, 5.0], 2 decimals
    pub vivino_rating: f64,
}

/// Output entry for a product whose rating was found
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedProduct {
    #[serde(flatten)]
    pub product: ProductRecord,
    #[serde(flatten)]
    pub rating: MatchResult,
}

/// Output entry for a product whose rating lookup failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnmatchedProduct {
    #[serde(flatten)]
    pub product: ProductRecord,
    /// Fixed failure description for downstream inspection
    pub reason: String,
}
