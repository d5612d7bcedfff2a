//! Vivino rating lookup subsystem
//!
//! Translates localized product names into search-friendly queries, walks a
//! Bing-then-Vivino fallback chain for candidate wine pages, scrapes a
//! plausible rating and memoizes every outcome in a persistent cache.

pub mod cache;
pub mod matcher;
pub mod query;

pub use cache::RatingCache;
pub use matcher::VivinoMatcher;
