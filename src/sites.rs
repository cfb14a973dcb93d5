//! Site profile registry
//!
//! Static selector data for the supported shopping sites plus the shared
//! fallback chains the flow controller probes when a site-specific selector
//! list is exhausted. Selector lists are ordered; the first structural match
//! wins at every fallback point.

use once_cell::sync::Lazy;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SiteError {
    #[error("Unknown site: {0}")]
    NotFound(String),
}

/// Immutable per-site selector profile, loaded once at startup
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Stable identifier used in extracted products ("amazon", "flipkart")
    pub id: &'static str,
    /// Human-facing name used in status messages and the analysis
    pub label: &'static str,
    pub base_url: &'static str,
    /// Search box candidates, tried in declared order
    pub search_box: &'static [&'static str],
    /// Submit button fallback when Enter submission is unavailable
    pub search_button: Option<&'static str>,
    /// Product result container candidates
    pub product_containers: &'static [&'static str],
    /// Clickable link candidates within a product container
    pub product_links: &'static [&'static str],
}

static SITES: Lazy<Vec<SiteProfile>> = Lazy::new(|| {
    vec![
        SiteProfile {
            id: "amazon",
            label: "Amazon",
            base_url: "https://www.amazon.in",
            search_box: &[
                "#twotabsearchtextbox",
                "input[name=\"field-keywords\"]",
                "input[type=\"text\"]",
            ],
            search_button: Some("#nav-search-submit-button"),
            product_containers: &[
                "[data-component-type=\"s-search-result\"]",
                ".s-result-item[data-asin]",
                ".s-result-item",
            ],
            product_links: &["h2 a", "a.a-link-normal[href*=\"/dp/\"]", "a[href*=\"/dp/\"]"],
        },
        SiteProfile {
            id: "flipkart",
            label: "Flipkart",
            base_url: "https://www.flipkart.com",
            search_box: &[
                "input[name=\"q\"]",
                "._3704LK",
                "input[placeholder*=\"Search\"]",
                "input[title*=\"Search\"]",
            ],
            search_button: None,
            product_containers: &[
                "._1AtVbE",
                "._13oc-S",
                ".col",
                "[data-testid=\"product-base\"]",
                "._2kHMtA",
                "._2-gKeQ",
            ],
            product_links: &["a", "._1fQZEK"],
        },
    ]
});

/// All configured sites in fixed priority order
pub fn all() -> &'static [SiteProfile] {
    &SITES
}

/// Look up a site profile by identifier
pub fn get(id: &str) -> Result<&'static SiteProfile, SiteError> {
    SITES
        .iter()
        .find(|site| site.id == id)
        .ok_or_else(|| SiteError::NotFound(id.to_string()))
}

/// Generic search input probes used when a site's own list is exhausted
pub const SEARCH_INPUT_FALLBACKS: &[&str] = &[
    "input[type=\"text\"]",
    "input[name*=\"search\"]",
    "input[placeholder*=\"search\"]",
    "input[placeholder*=\"Search\"]",
    "input[title*=\"Search\"]",
];

/// Generic product container probes (attribute and link-pattern based)
pub const CONTAINER_FALLBACKS: &[&str] = &[
    "[data-asin]",
    "a[href*=\"/dp/\"]",
    "a[href*=\"product\"]",
    ".product",
    "[class*=\"product\"]",
];

/// Last-resort clickable candidates when no product container matched anywhere
pub const LAST_RESORT_LINKS: &[&str] = &[
    "a[href*=\"dp/\"]",
    "a[href*=\"product\"]",
    "a[href*=\"item\"]",
    ".product a",
    "h2 a",
    "a[href]",
];

/// Known popup/banner dismissal probes (consent, close, login interstitials)
///
/// Structural selectors only; CDP querySelector cannot evaluate text-match
/// pseudo-selectors.
pub const POPUP_SELECTORS: &[&str] = &[
    // Generic close affordances
    "[aria-label=\"Close\"]",
    ".close-button",
    "#close-button",
    // Amazon
    "button[data-action-type=\"DISMISS\"]",
    ".a-button-close",
    "#sp-cc-accept",
    "#attach-close_sideSheet-link",
    ".cvf-widget__close",
    // Flipkart login modal
    "._2KpZ6l._2doB4z",
    "button._2KpZ6l._2doB4z",
    "._3dTWyP",
    // Cookie banners
    "button[data-testid=\"cookie-accept\"]",
];

/// Title probes within a product container, most specific first
pub const TITLE_SELECTORS: &[&str] = &[
    "h2 a span",
    "h2",
    ".s1Q9rs",
    "._4rR01T",
    ".a-size-mini span",
    ".a-size-base-plus",
    "a[title]",
    "[data-cy=\"title-recipe\"]",
];

/// Price probes within a product container
pub const PRICE_SELECTORS: &[&str] = &[
    ".a-price-whole",
    ".a-offscreen",
    ".a-price",
    "._30jeq3",
    "._1_WHN1",
    "._25b18c",
];

/// Marker a price candidate must contain to be accepted
pub const CURRENCY_MARKER: &str = "₹";

/// Sentinel recorded when no price candidate carries the currency marker
pub const PRICE_UNAVAILABLE: &str = "Price not available";

/// A title is accepted only when its trimmed length strictly exceeds this
pub const MIN_TITLE_CHARS: usize = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id() {
        let amazon = get("amazon").unwrap();
        assert_eq!(amazon.label, "Amazon");
        assert_eq!(amazon.base_url, "https://www.amazon.in");
        assert!(amazon.search_button.is_some());

        let flipkart = get("flipkart").unwrap();
        assert!(flipkart.search_button.is_none());
    }

    #[test]
    fn unknown_site_is_not_found() {
        match get("ebay") {
            Err(SiteError::NotFound(id)) => assert_eq!(id, "ebay"),
            Ok(_) => panic!("expected NotFound for unknown site"),
        }
    }

    #[test]
    fn priority_order_is_amazon_then_flipkart() {
        let ids: Vec<&str> = all().iter().map(|site| site.id).collect();
        assert_eq!(ids, vec!["amazon", "flipkart"]);
    }

    #[test]
    fn base_urls_parse() {
        for site in all() {
            let parsed = url::Url::parse(site.base_url).unwrap();
            assert_eq!(parsed.scheme(), "https");
        }
    }

    #[test]
    fn selector_lists_are_non_empty() {
        for site in all() {
            assert!(!site.search_box.is_empty());
            assert!(!site.product_containers.is_empty());
            assert!(!site.product_links.is_empty());
        }
    }
}
