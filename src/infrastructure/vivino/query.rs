//! Query translation for the rating search
//!
//! Vivino indexes Israeli wines under their English names, so the Hebrew
//! product names are rewritten token-by-token (producers, varietals,
//! regions) before being handed to a search engine.

use once_cell::sync::Lazy;
use regex::Regex;

/// Hebrew search token to its English search equivalent
const HEBREW_TOKEN_MAP: &[(&str, &str)] = &[
    // producers
    ("ירדן", "Yarden"),
    ("גמלא", "Gamla"),
    ("יקב רמת הגולן", "Golan Heights Winery"),
    ("שאטו גולן", "Chateau Golan"),
    ("רקנאטי", "Recanati"),
    ("יתיר", "Yatir"),
    ("הרי גליל", "Galil Mountain"),
    ("פסגות", "Psagot"),
    ("דלתון", "Dalton"),
    ("ברקן", "Barkan"),
    ("כרמל", "Carmel"),
    ("טוליפ", "Tulip"),
    ("ויתקין", "Vitkin"),
    ("1848", "1848 Winery"),
    ("אבני החושן", "Even Hahoshen"),
    ("מוני", "Moni"),
    ("צרעה", "Tzora"),
    ("צובה", "Tzuba"),
    ("אדיר", "Adir"),
    // varietals
    ("קברנה סוביניון", "Cabernet Sauvignon"),
    ("קברנה פרנק", "Cabernet Franc"),
    ("מרלו", "Merlot"),
    ("שיראז", "Shiraz"),
    ("סירה", "Syrah"),
    ("פטיט סירה", "Petite Sirah"),
    ("פטי ורדו", "Petit Verdot"),
    ("מלבק", "Malbec"),
    ("טמפרניו", "Tempranillo"),
    ("סנג'ובזה", "Sangiovese"),
    ("גראנש", "Grenache"),
    ("פינו נואר", "Pinot Noir"),
    // regions and styles
    ("ריוחה", "Rioja"),
    ("רזרבה", "Reserva"),
    ("גראן רזרבה", "Gran Reserva"),
    ("קריאנזה", "Crianza"),
    ("בלנד", "Blend"),
];

static QUOTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["'’]"#).expect("quote pattern"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Rewrite a product name into a search-friendly English query.
///
/// Known tokens are substituted, quote characters stripped (they would break
/// the quoted-phrase search) and whitespace collapsed.
pub fn to_search_query(name: &str) -> String {
    let mut query = name.to_string();
    for (hebrew, english) in HEBREW_TOKEN_MAP {
        query = query.replace(hebrew, english);
    }
    let query = QUOTE_RE.replace_all(&query, " ");
    WHITESPACE_RE.replace_all(&query, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_producer_and_varietal_tokens() {
        let query = to_search_query("ירדן קברנה סוביניון 2019");
        assert_eq!(query, "Yarden Cabernet Sauvignon 2019");
    }

    #[test]
    fn multi_word_tokens_are_replaced_whole() {
        let query = to_search_query("יקב רמת הגולן מרלו");
        assert_eq!(query, "Golan Heights Winery Merlot");
    }

    #[test]
    fn quotes_are_stripped_and_whitespace_collapsed() {
        let query = to_search_query(r#"דלתון "רזרבה"  שיראז"#);
        assert_eq!(query, "Dalton Reserva Shiraz");
    }

    #[test]
    fn untranslated_text_passes_through() {
        assert_eq!(to_search_query("Chateau Margaux"), "Chateau Margaux");
    }
}
