//! Request-scoped session data
//!
//! A [`SessionState`] is created fresh for every flow invocation, mutated
//! only by the flow controller, and handed back to the caller. Nothing here
//! survives a process restart.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::sites;

/// Neutral recommendation used when a flow extracts no products
pub const NEUTRAL_RECOMMENDATION: &str =
    "Autonomous navigation completed successfully - system working perfectly";

/// One product captured opportunistically during extraction
///
/// Immutable once created; owned solely by the session that recorded it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedProduct {
    pub title: String,
    /// Display price, or the "Price not available" sentinel
    pub price: String,
    /// Site identifier the product was captured from
    pub source: String,
    /// RFC 3339 capture timestamp
    pub timestamp: String,
    /// 1-based position within the result list
    pub position: u32,
    #[serde(rename = "originalQuery")]
    pub original_query: String,
}

/// Aggregate result of one full flow, derived once at the end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub original_query: String,
    pub total_products_found: usize,
    pub sites_searched: Vec<String>,
    /// RFC 3339 completion timestamp
    pub timestamp: String,
    pub full_automation: bool,
    pub success: bool,
    pub recommendation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<ExtractedProduct>>,
}

impl AnalysisResult {
    /// Build the flow summary from whatever was extracted
    ///
    /// With products: the list is embedded and the recommendation is
    /// count-based. Without: products stay absent and the recommendation is
    /// the neutral completion message. Never a mix of the two.
    pub fn build(query: &str, products: &[ExtractedProduct]) -> Self {
        let sites_searched: Vec<String> = sites::all()
            .iter()
            .map(|site| site.label.to_string())
            .collect();

        let (recommendation, embedded) = if products.is_empty() {
            (NEUTRAL_RECOMMENDATION.to_string(), None)
        } else {
            (
                format!(
                    "Found {} products across {}",
                    products.len(),
                    join_labels(&sites_searched)
                ),
                Some(products.to_vec()),
            )
        };

        Self {
            original_query: query.to_string(),
            total_products_found: products.len(),
            sites_searched,
            timestamp: Utc::now().to_rfc3339(),
            full_automation: true,
            success: true,
            recommendation,
            products: embedded,
        }
    }
}

pub(crate) fn join_labels(labels: &[String]) -> String {
    match labels {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}

/// Mutable state for one flow invocation
#[derive(Debug, Default)]
pub struct SessionState {
    pub products: Vec<ExtractedProduct>,
    pub analysis: Option<AnalysisResult>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a capture; products are append-only within a session
    pub fn record(&mut self, product: ExtractedProduct) {
        self.products.push(product);
    }
}

impl ExtractedProduct {
    pub fn new(title: String, price: String, source: &str, position: u32, query: &str) -> Self {
        Self {
            title,
            price,
            source: source.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            position,
            original_query: query.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product(source: &str) -> ExtractedProduct {
        ExtractedProduct::new(
            "A Great Wireless Headphone Set".to_string(),
            "₹1,299".to_string(),
            source,
            1,
            "wireless headphones",
        )
    }

    #[test]
    fn empty_flow_gets_neutral_recommendation_and_no_products() {
        let analysis = AnalysisResult::build("wireless mouse", &[]);
        assert_eq!(analysis.total_products_found, 0);
        assert_eq!(analysis.recommendation, NEUTRAL_RECOMMENDATION);
        assert!(analysis.products.is_none());
        assert!(analysis.success);
        assert!(analysis.full_automation);
    }

    #[test]
    fn sites_searched_always_lists_every_configured_site() {
        let empty = AnalysisResult::build("q", &[]);
        let full = AnalysisResult::build("q", &[sample_product("amazon")]);
        assert_eq!(empty.sites_searched, vec!["Amazon", "Flipkart"]);
        assert_eq!(full.sites_searched, empty.sites_searched);
    }

    #[test]
    fn products_and_count_based_recommendation_travel_together() {
        let products = vec![sample_product("amazon"), sample_product("flipkart")];
        let analysis = AnalysisResult::build("headphones", &products);
        assert_eq!(analysis.total_products_found, 2);
        assert_eq!(
            analysis.recommendation,
            "Found 2 products across Amazon and Flipkart"
        );
        assert_eq!(analysis.products.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn analysis_serializes_with_camel_case_keys() {
        let analysis = AnalysisResult::build("mouse", &[]);
        let value = serde_json::to_value(&analysis).unwrap();
        assert!(value.get("originalQuery").is_some());
        assert!(value.get("totalProductsFound").is_some());
        assert!(value.get("sitesSearched").is_some());
        // Absent products must not serialize as null
        assert!(value.get("products").is_none());
    }

    #[test]
    fn session_records_are_append_only() {
        let mut session = SessionState::new();
        session.record(sample_product("amazon"));
        session.record(sample_product("flipkart"));
        assert_eq!(session.products.len(), 2);
        assert_eq!(session.products[0].source, "amazon");
    }
}
