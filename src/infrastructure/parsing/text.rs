//! Text-level extraction helpers: prices, bottle sizes, name normalization
//!
//! These are the regex fallback layer shared by every extraction strategy.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::infrastructure::config::defaults::BOTTLE_SIZE_RANGE_ML;

static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+(?:[.,][0-9]+)?)").expect("price pattern"));

/// Number immediately followed by a volume unit token (ml or its Hebrew
/// spellings), accepted without range checking
static ML_UNIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{2,5})\s*(?:ml|מ״ל|מל)\b").expect("ml unit pattern"));

static ML_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{2,5})").expect("ml number pattern"));

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Parse a price from arbitrary text, ignoring currency symbols.
///
/// Commas are stripped unconditionally before the numeric capture: the shop
/// prints prices with the comma only as a thousands separator, so "1,234.50"
/// parses as 1234.5 and "89,90" as 8990. A locale using decimal commas would
/// need a different convention here.
pub fn parse_price(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    let cleaned = text.replace(',', "");
    let captures = PRICE_RE.captures(&cleaned)?;
    captures.get(1)?.as_str().parse::<f64>().ok()
}

/// Extract a bottle size in milliliters from text.
///
/// Thousands separators are removed first so "1,500 ml" parses as 1500
/// rather than 500. A number with an explicit unit token is accepted as-is;
/// a bare number only when it falls in the plausible bottle range, which
/// filters out vintages and percentages.
pub fn extract_ml(text: &str) -> Option<u32> {
    if text.is_empty() {
        return None;
    }
    let cleaned = text.replace(',', "");

    if let Some(captures) = ML_UNIT_RE.captures(&cleaned) {
        if let Ok(ml) = captures[1].parse::<u32>() {
            return Some(ml);
        }
    }

    let (min_ml, max_ml) = BOTTLE_SIZE_RANGE_ML;
    if let Some(captures) = ML_NUMBER_RE.captures(&cleaned) {
        if let Ok(ml) = captures[1].parse::<u32>() {
            if (min_ml..=max_ml).contains(&ml) {
                return Some(ml);
            }
        }
    }
    None
}

/// Normalize a display name: decode HTML entities, collapse whitespace, trim
pub fn normalize_name(name: &str) -> String {
    let decoded = html_escape::decode_html_entities(name);
    WHITESPACE_RE.replace_all(decoded.as_ref(), " ").trim().to_string()
}

/// Deduplicate while preserving first-seen order
pub fn dedup_first_seen(urls: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_ignores_currency_symbols_and_separators() {
        assert_eq!(parse_price("₪1,234.50"), Some(1234.5));
        assert_eq!(parse_price("120.00"), Some(120.0));
        assert_eq!(parse_price("  89 NIS"), Some(89.0));
    }

    #[test]
    fn price_comma_is_a_thousands_separator() {
        // decided convention: "89,90" is eight-nine-ninety, not 89.90
        assert_eq!(parse_price("89,90"), Some(8990.0));
    }

    #[test]
    fn price_absent_on_empty_or_nonnumeric() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("call us"), None);
    }

    #[test]
    fn ml_handles_thousands_separator_before_unit() {
        assert_eq!(extract_ml("1,500 ml"), Some(1500));
    }

    #[test]
    fn ml_unit_token_wins_without_range_check() {
        assert_eq!(extract_ml("5000 ml magnum case"), Some(5000));
        assert_eq!(extract_ml("750 מל"), Some(750));
        assert_eq!(extract_ml("בקבוק 375 מ״ל"), Some(375));
    }

    #[test]
    fn bare_number_is_range_checked() {
        assert_eq!(extract_ml("Classic red 750"), Some(750));
        // below the plausible bottle range
        assert_eq!(extract_ml("aged 15 months"), None);
        assert_eq!(extract_ml(""), None);
    }

    #[test]
    fn name_normalization_decodes_and_collapses() {
        assert_eq!(normalize_name("Smith &amp; Sons\n  Winery "), "Smith & Sons Winery");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn dedup_preserves_first_seen_order() {
        let urls = vec!["A", "B", "A", "C", "B"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(dedup_first_seen(urls), vec!["A", "B", "C"]);
    }
}
