use shopflow::flow::{acceptable_price, acceptable_title};
use shopflow::session::{AnalysisResult, ExtractedProduct, NEUTRAL_RECOMMENDATION};
use shopflow::{ClientCommand, CommandError, Notification, sites};

// Selector acceptance rules

#[cfg(test)]
mod acceptance {
    use super::*;

    #[test]
    fn title_candidates_resolve_in_declared_order() {
        let candidates = ["Buy", "A Great Wireless Headphone Set"];
        let chosen = candidates.iter().find(|c| acceptable_title(c));
        assert_eq!(chosen, Some(&"A Great Wireless Headphone Set"));
    }

    #[test]
    fn whitespace_does_not_count_toward_title_length() {
        assert!(!acceptable_title("   Buy now   "));
    }

    #[test]
    fn price_requires_currency_marker() {
        let candidates = ["Out of stock", "₹1,299"];
        let chosen = candidates.iter().find(|c| acceptable_price(c));
        assert_eq!(chosen, Some(&"₹1,299"));
    }

    #[test]
    fn price_sentinel_is_the_documented_string() {
        assert_eq!(sites::PRICE_UNAVAILABLE, "Price not available");
    }
}

// Analysis derivation

#[cfg(test)]
mod analysis {
    use super::*;

    fn product() -> ExtractedProduct {
        ExtractedProduct::new(
            "A Great Wireless Headphone Set".to_string(),
            "₹1,299".to_string(),
            "amazon",
            1,
            "wireless mouse",
        )
    }

    #[test]
    fn empty_run_is_neutral_and_successful() {
        let analysis = AnalysisResult::build("wireless mouse", &[]);
        assert_eq!(analysis.total_products_found, 0);
        assert!(analysis.success);
        assert_eq!(analysis.recommendation, NEUTRAL_RECOMMENDATION);
        assert!(analysis.products.is_none());
    }

    #[test]
    fn sites_searched_covers_every_configured_site() {
        let analysis = AnalysisResult::build("wireless mouse", &[]);
        assert_eq!(analysis.sites_searched.len(), sites::all().len());
        for site in sites::all() {
            assert!(analysis.sites_searched.contains(&site.label.to_string()));
        }
    }

    #[test]
    fn non_empty_run_embeds_products_with_count_recommendation() {
        let analysis = AnalysisResult::build("wireless mouse", &[product()]);
        assert_eq!(analysis.total_products_found, 1);
        assert!(analysis.recommendation.starts_with("Found 1 products"));
        assert!(analysis.products.is_some());
    }
}

// Inbound command surface

#[cfg(test)]
mod commands {
    use super::*;

    #[test]
    fn start_search_round_trips_the_query() {
        let command =
            ClientCommand::parse(r#"{"type":"start_universal_search","query":"wireless mouse"}"#)
                .unwrap();
        let ClientCommand::StartUniversalSearch { query } = command;
        assert_eq!(query, "wireless mouse");
    }

    #[test]
    fn unsupported_kinds_report_the_kind() {
        let err = ClientCommand::parse(r#"{"type":"cancel_flow"}"#).unwrap_err();
        assert_eq!(err, CommandError::UnknownType("cancel_flow".to_string()));
        assert_eq!(err.to_string(), "Unknown message type: cancel_flow");
    }

    #[test]
    fn garbage_payloads_are_malformed() {
        for raw in ["", "{}", "[1,2,3]", "{\"query\":\"x\"}", "plainly not json"] {
            assert_eq!(ClientCommand::parse(raw), Err(CommandError::Malformed), "{raw}");
        }
    }
}

// Outbound wire contract

#[cfg(test)]
mod notifications {
    use super::*;

    #[test]
    fn every_kind_carries_its_tag() {
        let analysis = AnalysisResult::build("q", &[]);
        let cases = vec![
            (
                Notification::Status {
                    message: "m".to_string(),
                },
                "status",
            ),
            (
                Notification::VoicePrompt {
                    message: "m".to_string(),
                },
                "voice_prompt",
            ),
            (
                Notification::Products { products: vec![] },
                "products",
            ),
            (Notification::Analysis { analysis }, "analysis"),
            (
                Notification::Error {
                    message: "m".to_string(),
                },
                "error",
            ),
        ];

        for (notification, tag) in cases {
            let json = serde_json::to_value(&notification).unwrap();
            assert_eq!(json["type"], tag);
        }
    }

    #[test]
    fn analysis_payload_uses_camel_case_fields() {
        let json = serde_json::to_value(Notification::Analysis {
            analysis: AnalysisResult::build("wireless mouse", &[]),
        })
        .unwrap();
        assert_eq!(json["analysis"]["originalQuery"], "wireless mouse");
        assert_eq!(json["analysis"]["totalProductsFound"], 0);
        assert_eq!(json["analysis"]["success"], true);
    }
}
