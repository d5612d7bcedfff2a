//! Product detail page parser
//!
//! Classifies a fetched page as a real product page, then merges three
//! independent extraction strategies (JSON-LD structured data, social meta
//! tags, DOM heuristics) into one record, with a raw-markup regex salvage
//! for the price as the last resort.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use super::context::DetailParseContext;
use super::text::{extract_ml, normalize_name, parse_price};
use super::ContextualParser;
use crate::domain::product::ProductRecord;
use crate::infrastructure::config::defaults::DEFAULT_BOTTLE_SIZE_ML;
use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};

/// Price-looking number next to a shekel sign, scanned over raw markup when
/// every structured strategy failed
static SHEKEL_PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"₪\s*([0-9]+(?:[.,][0-9]+)?)").expect("shekel price pattern"));

/// Partial record produced by a single extraction strategy.
///
/// Never leaves this module; strategies stay independent and side-effect
/// free so they can be unit tested in isolation.
#[derive(Debug, Default, PartialEq)]
struct ProductChunk {
    name: Option<String>,
    price_value: Option<f64>,
    bottle_size_ml: Option<u32>,
}

impl ProductChunk {
    /// First-present-wins merge: fields already set are never overwritten
    fn fill_missing(&mut self, other: ProductChunk) {
        if self.name.is_none() {
            self.name = other.name.filter(|n| !n.is_empty());
        }
        if self.price_value.is_none() {
            self.price_value = other.price_value;
        }
        if self.bottle_size_ml.is_none() {
            self.bottle_size_ml = other.bottle_size_ml;
        }
    }
}

/// Parser for extracting product records from product detail pages
pub struct ProductDetailParser {
    json_ld_selector: Selector,
    og_type_selector: Selector,
    og_title_selector: Selector,
    og_description_selector: Selector,
    price_meta_selectors: Vec<Selector>,
    heading_selectors: Vec<Selector>,
    price_selectors: Vec<Selector>,
    blob_selectors: Vec<Selector>,
    attribute_table_selector: Selector,
}

impl ProductDetailParser {
    /// Create a new product detail parser with the default selectors
    pub fn new() -> ParsingResult<Self> {
        Ok(Self {
            json_ld_selector: compile(r#"script[type="application/ld+json"]"#)?,
            og_type_selector: compile(r#"meta[property="og:type"]"#)?,
            og_title_selector: compile(r#"meta[property="og:title"]"#)?,
            og_description_selector: compile(r#"meta[property="og:description"]"#)?,
            // ordered: first present wins
            price_meta_selectors: vec![
                compile(r#"meta[itemprop="price"]"#)?,
                compile(r#"meta[property="product:price:amount"]"#)?,
                compile(r#"meta[name="twitter:data1"]"#)?,
            ],
            heading_selectors: vec![
                compile("h1.page-title .base")?,
                compile("h1 .base")?,
                compile("h1.product-name")?,
                compile("h1")?,
            ],
            price_selectors: vec![
                compile("span.price[data-price-amount]")?,
                compile(".price-wrapper .price")?,
                compile("span.price")?,
            ],
            blob_selectors: vec![
                compile("#description")?,
                compile(".product.attribute.description")?,
                compile(".product-short-description")?,
                compile(".product-info-main")?,
            ],
            attribute_table_selector: compile("table, .additional-attributes-wrapper")?,
        })
    }

    /// Classification gate: product-type page marker or structured product
    /// data with a name. Everything else (category shells, error pages,
    /// JavaScript placeholders) is rejected before extraction.
    pub fn is_product_page(&self, html: &Html) -> bool {
        if let Some(meta) = html.select(&self.og_type_selector).next() {
            if let Some(content) = meta.value().attr("content") {
                if content.to_lowercase().contains("product") {
                    return true;
                }
            }
        }
        self.from_json_ld(html).name.is_some()
    }

    /// Parse raw product page markup into a record.
    ///
    /// Convenience wrapper over [`parse_with_context`] that also runs the
    /// raw-markup price salvage, which needs the original markup rather
    /// than the parsed tree.
    ///
    /// [`parse_with_context`]: ContextualParser::parse_with_context
    pub fn parse(&self, markup: &str, url: &str) -> ParsingResult<ProductRecord> {
        let html = Html::parse_document(markup);
        let context = DetailParseContext::new(url);
        self.parse_document(&html, markup, &context)
    }

    fn parse_document(
        &self,
        html: &Html,
        markup: &str,
        context: &DetailParseContext,
    ) -> ParsingResult<ProductRecord> {
        if !self.is_product_page(html) {
            return Err(ParsingError::not_a_product_page(&context.url));
        }

        let mut chunk = ProductChunk::default();
        // priority: JSON-LD -> meta tags -> DOM heuristics
        let strategies: [fn(&Self, &Html) -> ProductChunk; 3] = [
            Self::from_json_ld,
            Self::from_meta_tags,
            Self::from_dom_selectors,
        ];
        for strategy in strategies {
            chunk.fill_missing(strategy(self, html));
        }

        let name = normalize_name(chunk.name.as_deref().unwrap_or(""));
        if name.is_empty() {
            return Err(ParsingError::required_field_missing(
                "name",
                Some(&context.url),
            ));
        }

        let price = chunk.price_value.or_else(|| salvage_price(markup));
        let Some(price) = price else {
            return Err(ParsingError::required_field_missing(
                "price_value",
                Some(&context.url),
            ));
        };

        let bottle_size_ml = chunk.bottle_size_ml.unwrap_or(DEFAULT_BOTTLE_SIZE_ML);

        debug!(
            "extracted '{}' at {} ({}ml) from {}",
            name, price, bottle_size_ml, context.url
        );

        Ok(ProductRecord {
            name,
            price_value: price,
            bottle_size_ml,
            url: context.url.clone(),
        })
    }

    /// Highest priority strategy: embedded JSON-LD product blocks
    fn from_json_ld(&self, html: &Html) -> ProductChunk {
        let mut chunk = ProductChunk::default();

        for script in html.select(&self.json_ld_selector) {
            let payload = script.text().collect::<String>();
            let Ok(value) = serde_json::from_str::<Value>(payload.trim()) else {
                continue;
            };

            // sometimes an array of things
            let candidates: Vec<&Value> = match &value {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };

            for object in candidates {
                if !is_product_typed(object) {
                    continue;
                }

                if chunk.name.is_none() {
                    if let Some(name) = object.get("name").and_then(Value::as_str) {
                        let normalized = normalize_name(name);
                        if !normalized.is_empty() {
                            chunk.name = Some(normalized);
                        }
                    }
                }

                if chunk.price_value.is_none() {
                    chunk.price_value = offer_price(object);
                }

                if chunk.bottle_size_ml.is_none() {
                    let description = text_of(object.get("description"));
                    let name = text_of(object.get("name"));
                    chunk.bottle_size_ml = extract_ml(&format!("{description} {name}"));
                }
            }
        }

        chunk
    }

    /// Second priority: social preview meta tags
    fn from_meta_tags(&self, html: &Html) -> ProductChunk {
        let mut chunk = ProductChunk::default();

        if let Some(meta) = html.select(&self.og_title_selector).next() {
            if let Some(content) = meta.value().attr("content") {
                let normalized = normalize_name(content);
                if !normalized.is_empty() {
                    chunk.name = Some(normalized);
                }
            }
        }

        for selector in &self.price_meta_selectors {
            if chunk.price_value.is_some() {
                break;
            }
            if let Some(meta) = html.select(selector).next() {
                let raw = meta
                    .value()
                    .attr("content")
                    .filter(|c| !c.is_empty())
                    .or_else(|| meta.value().attr("value"))
                    .unwrap_or("");
                chunk.price_value = parse_price(raw);
            }
        }

        if let Some(meta) = html.select(&self.og_description_selector).next() {
            if let Some(content) = meta.value().attr("content") {
                chunk.bottle_size_ml = extract_ml(content);
            }
        }

        chunk
    }

    /// Lowest priority: DOM heuristics over the visible page
    fn from_dom_selectors(&self, html: &Html) -> ProductChunk {
        let mut chunk = ProductChunk::default();

        let heading = self
            .heading_selectors
            .iter()
            .find_map(|selector| html.select(selector).next());
        if let Some(heading) = heading {
            let text = normalize_name(&element_text(&heading));
            if !text.is_empty() {
                chunk.name = Some(text);
            }
        }

        let price_element = self
            .price_selectors
            .iter()
            .find_map(|selector| html.select(selector).next());
        if let Some(element) = price_element {
            // prefer the machine-readable amount over display text
            let raw = element
                .value()
                .attr("data-price-amount")
                .map(str::to_string)
                .unwrap_or_else(|| element_text(&element));
            chunk.price_value = parse_price(&raw);
        }

        let mut blobs: Vec<String> = self
            .blob_selectors
            .iter()
            .filter_map(|selector| html.select(selector).next())
            .map(|element| element_text(&element))
            .collect();
        if let Some(heading) = heading {
            blobs.push(element_text(&heading));
        }
        for table in html.select(&self.attribute_table_selector) {
            blobs.push(element_text(&table));
        }
        let blob = blobs.join(" | ");
        if !blob.is_empty() {
            chunk.bottle_size_ml = extract_ml(&blob);
        }

        chunk
    }
}

impl ContextualParser for ProductDetailParser {
    type Output = ProductRecord;
    type Context = DetailParseContext;

    fn parse_with_context(
        &self,
        html: &Html,
        context: &Self::Context,
    ) -> ParsingResult<Self::Output> {
        // the raw markup is re-serialized here only for the price salvage
        let markup = html.html();
        self.parse_document(html, &markup, context)
    }
}

fn compile(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Whole-element text with single-space joints, trimmed
fn element_text(element: &scraper::ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `@type` equal to "Product", either as a string or inside an array
fn is_product_typed(object: &Value) -> bool {
    match object.get("@type") {
        Some(Value::String(t)) => t == "Product",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("Product")),
        _ => false,
    }
}

/// Offer price from `offers.price` or `offers.priceSpecification.price`
fn offer_price(object: &Value) -> Option<f64> {
    let offers = object.get("offers")?;
    let price = offers
        .get("price")
        .or_else(|| offers.get("priceSpecification").and_then(|s| s.get("price")))?;
    match price {
        Value::String(s) => parse_price(s),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// String or stringified scalar, empty for anything else
fn text_of(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Last-resort price: currency-symbol-adjacent number in the raw markup
fn salvage_price(markup: &str) -> Option<f64> {
    let captures = SHEKEL_PRICE_RE.captures(markup)?;
    captures[1].replace(',', "").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ProductDetailParser {
        ProductDetailParser::new().unwrap()
    }

    const URL: &str = "https://www.the-importer.co.il/wine/test-wine";

    #[test]
    fn test_parser_creation() {
        assert!(ProductDetailParser::new().is_ok());
    }

    #[test]
    fn json_ld_only_page_extracts_fully() {
        // structured data alone passes the classification gate
        let markup = r#"<html><head>
            <script type="application/ld+json">
            {"@type": "Product", "name": "יין אדום",
             "offers": {"price": "120.00"},
             "description": "750 ml"}
            </script>
        </head><body></body></html>"#;

        let record = parser().parse(markup, URL).unwrap();
        assert_eq!(record.name, "יין אדום");
        assert_eq!(record.price_value, 120.0);
        assert_eq!(record.bottle_size_ml, 750);
        assert_eq!(record.url, URL);
    }

    #[test]
    fn json_ld_array_and_price_specification() {
        let markup = r#"<html><head>
            <script type="application/ld+json">
            [{"@type": "BreadcrumbList"},
             {"@type": ["Product"], "name": "Gamla Merlot",
              "offers": {"priceSpecification": {"price": "89.90"}}}]
            </script>
        </head></html>"#;

        let record = parser().parse(markup, URL).unwrap();
        assert_eq!(record.name, "Gamla Merlot");
        assert_eq!(record.price_value, 89.9);
        // no size anywhere: standard bottle default
        assert_eq!(record.bottle_size_ml, 750);
    }

    #[test]
    fn classification_gate_rejects_plain_pages() {
        // heading and price-looking text are not enough without a product
        // marker or structured data
        let markup = r#"<html><body>
            <h1>Our store</h1>
            <span class="price">₪120</span>
        </body></html>"#;

        let result = parser().parse(markup, URL);
        assert!(matches!(result, Err(ParsingError::NotAProductPage { .. })));
    }

    #[test]
    fn meta_tag_page_with_locale_price() {
        let markup = r#"<html><head>
            <meta property="og:type" content="product">
            <meta property="og:title" content="Cabernet Sauvignon 2019">
            <meta itemprop="price" content="89,90">
        </head><body></body></html>"#;

        let record = parser().parse(markup, URL).unwrap();
        assert_eq!(record.name, "Cabernet Sauvignon 2019");
        // comma treated as thousands separator by the decided convention
        assert_eq!(record.price_value, 8990.0);
        assert_eq!(record.bottle_size_ml, 750);
    }

    #[test]
    fn json_ld_name_beats_meta_title() {
        let markup = r#"<html><head>
            <script type="application/ld+json">
            {"@type": "Product", "name": "Structured Name",
             "offers": {"price": "50"}}
            </script>
            <meta property="og:title" content="Meta Name">
        </head></html>"#;

        let record = parser().parse(markup, URL).unwrap();
        assert_eq!(record.name, "Structured Name");
    }

    #[test]
    fn price_meta_order_first_present_wins() {
        let markup = r#"<html><head>
            <meta property="og:type" content="product">
            <meta property="og:title" content="Wine">
            <meta property="product:price:amount" content="77">
            <meta name="twitter:data1" content="999">
        </head></html>"#;

        let record = parser().parse(markup, URL).unwrap();
        assert_eq!(record.price_value, 77.0);
    }

    #[test]
    fn dom_price_prefers_data_attribute() {
        let markup = r#"<html><head>
            <meta property="og:type" content="product">
        </head><body>
            <h1 class="page-title"><span class="base">Dalton Estate</span></h1>
            <span class="price" data-price-amount="105.5">₪999 display</span>
        </body></html>"#;

        let record = parser().parse(markup, URL).unwrap();
        assert_eq!(record.name, "Dalton Estate");
        assert_eq!(record.price_value, 105.5);
    }

    #[test]
    fn dom_blob_yields_bottle_size() {
        let markup = r#"<html><head>
            <meta property="og:type" content="product">
        </head><body>
            <h1>Recanati Shiraz</h1>
            <span class="price">₪95</span>
            <div id="description">Full bodied red, 1,500 ml magnum.</div>
        </body></html>"#;

        let record = parser().parse(markup, URL).unwrap();
        assert_eq!(record.bottle_size_ml, 1500);
    }

    #[test]
    fn shekel_salvage_is_the_last_resort() {
        let markup = r#"<html><head>
            <meta property="og:type" content="product">
            <meta property="og:title" content="Mystery Wine">
        </head><body>
            <div>special offer ₪ 1,234.50 only this week</div>
        </body></html>"#;

        let record = parser().parse(markup, URL).unwrap();
        assert_eq!(record.price_value, 1234.5);
    }

    #[test]
    fn missing_price_rejects_the_page() {
        let markup = r#"<html><head>
            <meta property="og:type" content="product">
            <meta property="og:title" content="Priceless Wine">
        </head><body></body></html>"#;

        let result = parser().parse(markup, URL);
        assert!(matches!(
            result,
            Err(ParsingError::RequiredFieldMissing { ref field, .. }) if field == "price_value"
        ));
    }

    #[test]
    fn missing_name_rejects_the_page() {
        let markup = r#"<html><head>
            <meta property="og:type" content="product">
        </head><body>
            <span class="price">₪100</span>
        </body></html>"#;

        let result = parser().parse(markup, URL);
        assert!(matches!(
            result,
            Err(ParsingError::RequiredFieldMissing { ref field, .. }) if field == "name"
        ));
    }
}
