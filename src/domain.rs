//! Domain module - core entities of the crawl
//!
//! Contains the product record extracted from the shop and the rating data
//! attached to it from Vivino.

pub mod product;

pub use product::{MatchResult, MatchedProduct, ProductRecord, UnmatchedProduct};
