//! Autonomous flow controller
//!
//! Sequences the per-site phases (navigate, settle, dismiss interstitials,
//! search, reveal results, locate, extract, click-through) for every
//! configured site in priority order, then derives the run analysis.
//!
//! The controller never propagates hard errors: each phase failure is caught,
//! logged with its site and phase, degraded to a status notification, and the
//! flow continues. The externally observable contract is that `run_flow`
//! always returns an [`AnalysisResult`].

use std::time::Duration;

use anyhow::Result;
use chromiumoxide::Page;
use chromiumoxide::element::Element;
use chromiumoxide_cdp::cdp::js_protocol::runtime::{CallArgument, CallFunctionOnParams};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::channel::StatusChannel;
use crate::session::{AnalysisResult, ExtractedProduct, SessionState, join_labels};
use crate::sites::{self, SiteProfile};
use crate::utils::constants::RESULTS_VIEW_OFFSET_PX;
use crate::utils::{human_delay, wait_for_element};
use crate::{PacingConfig, TimeoutConfig};

/// Internal phase failure classification
///
/// Surfaced only in logs; the public contract degrades every variant to a
/// status notification.
#[derive(Error, Debug)]
pub enum PhaseError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("no search input found on {site}")]
    SearchBoxNotFound { site: String },

    #[error("search interaction on {site} failed: {reason}")]
    Search { site: String, reason: String },
}

/// Drives one browser page through the full search-and-extract run
///
/// Holds the single shared page by reference; only one controller may be
/// driving it at a time (enforced by the host's processing guard).
pub struct FlowController<'a> {
    page: &'a Page,
    channel: &'a StatusChannel,
    pacing: &'a PacingConfig,
    timeouts: &'a TimeoutConfig,
}

impl<'a> FlowController<'a> {
    pub fn new(
        page: &'a Page,
        channel: &'a StatusChannel,
        pacing: &'a PacingConfig,
        timeouts: &'a TimeoutConfig,
    ) -> Self {
        Self {
            page,
            channel,
            pacing,
            timeouts,
        }
    }

    /// Run the full flow for one query and derive the analysis
    ///
    /// Sites are processed strictly sequentially; they share one page. Every
    /// per-site failure is degraded and the remaining sites still run, so the
    /// analysis always lists every configured site.
    pub async fn run_flow(&self, query: &str) -> AnalysisResult {
        let mut session = SessionState::new();

        self.channel
            .status(format!("Starting fully autonomous flow for: \"{query}\""))
            .await;
        self.channel
            .voice(format!(
                "I'm now executing a fully autonomous shopping search for \"{query}\". \
                 I'll work through each site automatically."
            ))
            .await;

        let site_list = sites::all();
        for (index, site) in site_list.iter().enumerate() {
            self.channel
                .status(format!("Phase {}: Opening {}...", index + 1, site.label))
                .await;
            if index == 0 {
                self.channel
                    .voice(format!(
                        "Starting with {} - opening the website now.",
                        site.label
                    ))
                    .await;
            } else {
                self.channel
                    .voice(format!("Now moving to {} in the same window.", site.label))
                    .await;
            }

            match self.run_site(site, query, &mut session).await {
                Ok(()) => {
                    self.channel
                        .status(format!("{} phase completed", site.label))
                        .await;
                }
                Err(e) => {
                    warn!(site = site.id, error = %e, "site flow degraded");
                    self.channel
                        .status(format!(
                            "{} flow encountered issues, continuing...",
                            site.label
                        ))
                        .await;
                }
            }

            if index + 1 < site_list.len() {
                human_delay(self.pacing.settle_min_ms, self.pacing.settle_max_ms).await;
            }
        }

        self.channel
            .status("Generating comprehensive analysis...")
            .await;
        let analysis = AnalysisResult::build(query, &session.products);
        session.analysis = Some(analysis.clone());

        self.channel.analysis(&analysis).await;
        self.channel
            .voice(narrate_run(query, &session.products))
            .await;

        analysis
    }

    /// One site's phase sequence
    ///
    /// Navigation and search failures abandon the site; everything after the
    /// search degrades in place.
    async fn run_site(
        &self,
        site: &SiteProfile,
        query: &str,
        session: &mut SessionState,
    ) -> Result<(), PhaseError> {
        self.navigate(site).await?;
        human_delay(self.pacing.settle_min_ms, self.pacing.settle_max_ms).await;
        self.dismiss_interstitials().await;

        self.search(site, query).await?;
        self.reveal_results(site).await;

        let Some(container) = self.locate_first_product(site).await else {
            self.channel
                .status(format!(
                    "No products found on {}, trying alternative approach...",
                    site.label
                ))
                .await;
            self.click_any_available_link(site).await;
            return Ok(());
        };

        if let Some(product) = self.extract_product(&container, site, query).await {
            self.channel.products(vec![product.clone()]).await;
            session.record(product);
        }

        self.click_through(&container, site).await;
        Ok(())
    }

    /// Load the site's base URL, bounded by the navigation timeout
    async fn navigate(&self, site: &SiteProfile) -> Result<(), PhaseError> {
        let timeout = Duration::from_millis(self.timeouts.navigation_ms);

        match tokio::time::timeout(timeout, self.page.goto(site.base_url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(PhaseError::Navigation {
                    url: site.base_url.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(PhaseError::Navigation {
                    url: site.base_url.to_string(),
                    reason: format!("timeout after {}ms", timeout.as_millis()),
                });
            }
        }

        // Let the page lifecycle settle, bounded by the same budget
        let _ = tokio::time::timeout(timeout, self.page.wait_for_navigation()).await;
        Ok(())
    }

    /// Probe the known popup/banner selectors and click the first match
    ///
    /// Absence of any match is not an error. Remaining overlays are hidden
    /// via script, best effort.
    async fn dismiss_interstitials(&self) {
        let probe = Duration::from_millis(self.timeouts.popup_probe_ms);

        for selector in sites::POPUP_SELECTORS {
            if let Ok(element) = wait_for_element(self.page, selector, probe).await {
                if self.click_element(&element).await.is_ok() {
                    human_delay(500, 1000).await;
                    self.channel.status("Closed popup/banner").await;
                    break;
                }
            }
        }

        let hide_overlays = "document.querySelectorAll('[role=\"dialog\"], .notification, \
                             .toast, .modal').forEach(el => { if (el.style) el.style.display = 'none'; })";
        if let Err(e) = self.page.evaluate(hide_overlays).await {
            debug!(error = %e, "overlay hiding script failed");
        }
    }

    /// Locate a search input, type the exact query, and submit
    async fn search(&self, site: &SiteProfile, query: &str) -> Result<(), PhaseError> {
        self.channel
            .status(format!(
                "Searching {} for: \"{}\"",
                site.label.to_uppercase(),
                query
            ))
            .await;

        let per_selector = Duration::from_millis(self.timeouts.selector_ms);
        let mut search_box = None;

        for selector in site.search_box {
            match wait_for_element(self.page, selector, per_selector).await {
                Ok(element) => {
                    debug!(selector, "found search box");
                    search_box = Some(element);
                    break;
                }
                Err(_) => debug!(selector, "search box selector not found"),
            }
        }

        if search_box.is_none() {
            for selector in sites::SEARCH_INPUT_FALLBACKS {
                if let Ok(element) = self.page.find_element(*selector).await {
                    debug!(selector, "found search box with fallback");
                    search_box = Some(element);
                    break;
                }
            }
        }

        let search_box = search_box.ok_or_else(|| PhaseError::SearchBoxNotFound {
            site: site.id.to_string(),
        })?;
        let interaction_error = |e: anyhow::Error| PhaseError::Search {
            site: site.id.to_string(),
            reason: e.to_string(),
        };

        // Focus, clear any existing content, then type the exact query
        self.click_element(&search_box)
            .await
            .map_err(interaction_error)?;
        human_delay(500, 800).await;

        search_box
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(|e| PhaseError::Search {
                site: site.id.to_string(),
                reason: e.to_string(),
            })?;
        human_delay(300, 500).await;

        self.channel
            .status(format!("Typing exactly: \"{query}\""))
            .await;
        self.type_query(&search_box, query)
            .await
            .map_err(interaction_error)?;
        human_delay(1000, 1500).await;

        // Submit via Enter; fall back to the configured search button
        match search_box.press_key("Enter").await {
            Ok(_) => self.channel.status("Search submitted").await,
            Err(e) => {
                debug!(error = %e, "Enter submission unavailable");
                if let Some(button_selector) = site.search_button {
                    if let Ok(button) = self.page.find_element(button_selector).await {
                        if self.click_element(&button).await.is_ok() {
                            self.channel.status("Search button clicked").await;
                        }
                    }
                }
            }
        }

        // Wait for the result page to settle or the timeout, whichever first
        let settle = Duration::from_millis(self.timeouts.network_settle_ms);
        let _ = tokio::time::timeout(settle, self.page.wait_for_navigation()).await;
        human_delay(self.pacing.settle_min_ms, self.pacing.settle_max_ms).await;

        Ok(())
    }

    /// Character-by-character typing with the configured inter-character delay
    async fn type_query(&self, element: &Element, query: &str) -> Result<()> {
        let mut buf = [0u8; 4];
        for ch in query.chars() {
            element.type_str(ch.encode_utf8(&mut buf)).await?;
            tokio::time::sleep(Duration::from_millis(self.pacing.type_char_delay_ms)).await;
        }
        Ok(())
    }

    /// Incremental scrolls to load results, then back up so the first
    /// results are visible. Purely cosmetic; no failure path.
    async fn reveal_results(&self, site: &SiteProfile) {
        self.channel
            .status(format!(
                "Scrolling {} to load products...",
                site.label.to_uppercase()
            ))
            .await;

        for _ in 0..self.pacing.scroll_passes {
            if let Err(e) = self
                .page
                .evaluate("window.scrollBy(0, window.innerHeight * 0.8)")
                .await
            {
                debug!(error = %e, "incremental scroll failed");
            }
            human_delay(self.pacing.scroll_min_ms, self.pacing.scroll_max_ms).await;
        }

        if let Err(e) = self.scroll_to_offset(RESULTS_VIEW_OFFSET_PX).await {
            debug!(error = %e, "scroll back to results failed");
        }
        human_delay(1000, 1500).await;

        self.channel
            .status(format!("Products loaded on {}", site.label.to_uppercase()))
            .await;
    }

    /// Try the site's container selectors, then the generic fallbacks;
    /// first selector yielding one or more matches wins.
    async fn locate_first_product(&self, site: &SiteProfile) -> Option<Element> {
        self.channel
            .status(format!(
                "Finding first product on {}...",
                site.label.to_uppercase()
            ))
            .await;

        for selector in site
            .product_containers
            .iter()
            .chain(sites::CONTAINER_FALLBACKS)
        {
            match self.page.find_elements(*selector).await {
                Ok(elements) if !elements.is_empty() => {
                    info!(selector, count = elements.len(), "found product containers");
                    self.channel
                        .voice(format!(
                            "Found {} products on {}. Clicking the first one now.",
                            elements.len(),
                            site.label
                        ))
                        .await;
                    return elements.into_iter().next();
                }
                _ => {}
            }
        }

        None
    }

    /// Last resort when no container matched anywhere: click the first
    /// available link on the page and end the site sequence early.
    async fn click_any_available_link(&self, site: &SiteProfile) {
        self.channel
            .status(format!(
                "Looking for any clickable items on {}...",
                site.label.to_uppercase()
            ))
            .await;

        for selector in sites::LAST_RESORT_LINKS {
            if let Ok(elements) = self.page.find_elements(*selector).await {
                if let Some(first) = elements.into_iter().next() {
                    self.channel
                        .status("Found clickable items, clicking first one...")
                        .await;
                    if self.click_element(&first).await.is_ok() {
                        human_delay(self.pacing.settle_min_ms, self.pacing.settle_max_ms).await;
                        return;
                    }
                }
            }
        }

        self.channel
            .status(format!(
                "Navigation completed on {}",
                site.label.to_uppercase()
            ))
            .await;
    }

    /// Read title and price from the first product container
    ///
    /// A missing or too-short title yields nothing; a missing price degrades
    /// to the sentinel.
    async fn extract_product(
        &self,
        container: &Element,
        site: &SiteProfile,
        query: &str,
    ) -> Option<ExtractedProduct> {
        let mut title = None;
        for selector in sites::TITLE_SELECTORS {
            if let Ok(element) = container.find_element(*selector).await {
                if let Ok(Some(text)) = element.inner_text().await {
                    if acceptable_title(&text) {
                        title = Some(text.trim().to_string());
                        break;
                    }
                }
            }
        }
        let title = title?;

        let mut price = None;
        for selector in sites::PRICE_SELECTORS {
            if let Ok(element) = container.find_element(*selector).await {
                if let Ok(Some(text)) = element.inner_text().await {
                    if acceptable_price(&text) {
                        price = Some(text.trim().to_string());
                        break;
                    }
                }
            }
        }

        Some(ExtractedProduct::new(
            title,
            price.unwrap_or_else(|| sites::PRICE_UNAVAILABLE.to_string()),
            site.id,
            1,
            query,
        ))
    }

    /// Click into the first product and settle on the destination page
    async fn click_through(&self, container: &Element, site: &SiteProfile) {
        let mut link = None;
        for selector in site.product_links {
            if let Ok(element) = container.find_element(*selector).await {
                link = Some(element);
                break;
            }
        }

        self.channel
            .status(format!(
                "Clicking first product on {}...",
                site.label.to_uppercase()
            ))
            .await;

        // No dedicated link found: the container itself is the click target
        let target = link.as_ref().unwrap_or(container);
        if let Err(e) = self.click_element(target).await {
            debug!(site = site.id, error = %e, "product click failed");
            self.channel
                .status(format!(
                    "Product interaction completed on {}",
                    site.label.to_uppercase()
                ))
                .await;
            return;
        }

        let nav = Duration::from_millis(self.timeouts.click_nav_ms);
        let _ = tokio::time::timeout(nav, self.page.wait_for_navigation()).await;
        human_delay(self.pacing.settle_min_ms, self.pacing.settle_max_ms).await;

        // One cosmetic scroll on the destination page
        if let Err(e) = self
            .page
            .evaluate("window.scrollBy(0, window.innerHeight * 0.6)")
            .await
        {
            debug!(error = %e, "destination scroll failed");
        }
        human_delay(1500, 2000).await;

        self.channel
            .voice(format!(
                "Successfully clicked and analyzed the first product on {}.",
                site.label
            ))
            .await;
    }

    /// Scroll into view, resolve the clickable point, click through the page
    async fn click_element(&self, element: &Element) -> Result<()> {
        element.scroll_into_view().await?;
        let point = element.clickable_point().await?;
        self.page.click(point).await?;
        Ok(())
    }

    /// Absolute scroll via parameterized evaluation
    async fn scroll_to_offset(&self, y: i64) -> Result<()> {
        let call = CallFunctionOnParams::builder()
            .function_declaration("(y) => window.scrollTo(0, y)")
            .argument(CallArgument::builder().value(json!(y)).build())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build scroll params: {}", e))?;

        self.page.evaluate_function(call).await?;
        Ok(())
    }
}

/// A title candidate is accepted only when its trimmed length strictly
/// exceeds the minimum
pub fn acceptable_title(text: &str) -> bool {
    text.trim().chars().count() > sites::MIN_TITLE_CHARS
}

/// A price candidate is accepted only when it carries the currency marker
pub fn acceptable_price(text: &str) -> bool {
    text.contains(sites::CURRENCY_MARKER)
}

/// Closing narration pushed with the final analysis
fn narrate_run(query: &str, products: &[ExtractedProduct]) -> String {
    let labels: Vec<String> = sites::all()
        .iter()
        .map(|site| site.label.to_string())
        .collect();

    let mut summary = format!(
        "Fully autonomous shopping search completed! I searched for \"{}\" on {} automatically. ",
        query,
        join_labels(&labels)
    );

    if !products.is_empty() {
        summary.push_str(&format!(
            "Found and analyzed {} products. I clicked on the first product from each platform \
             and gathered all the information. ",
            products.len()
        ));
    }

    summary.push_str(
        "The entire process was fully autonomous: the sites were opened, your exact input was \
         typed, results were scrolled through, and products were clicked without any human \
         intervention.",
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_long_enough_title_is_chosen() {
        let candidates = ["Buy", "A Great Wireless Headphone Set", "Another Long Title"];
        let chosen = candidates.iter().find(|c| acceptable_title(c));
        assert_eq!(chosen, Some(&"A Great Wireless Headphone Set"));
    }

    #[test]
    fn title_length_boundary_is_strict() {
        // Exactly 10 trimmed characters is rejected
        assert!(!acceptable_title("  abcdefghij  "));
        assert!(acceptable_title("abcdefghijk"));
    }

    #[test]
    fn first_currency_marked_price_is_chosen() {
        let candidates = ["Out of stock", "₹1,299", "₹999"];
        let chosen = candidates.iter().find(|c| acceptable_price(c));
        assert_eq!(chosen, Some(&"₹1,299"));
    }

    #[test]
    fn no_currency_marker_means_no_price() {
        let candidates = ["Out of stock", "Sold out", "Free delivery"];
        assert!(candidates.iter().find(|c| acceptable_price(c)).is_none());
    }

    #[test]
    fn narration_mentions_query_and_product_count() {
        let products = vec![ExtractedProduct::new(
            "A Great Wireless Headphone Set".to_string(),
            "₹1,299".to_string(),
            "amazon",
            1,
            "headphones",
        )];
        let narration = narrate_run("headphones", &products);
        assert!(narration.contains("\"headphones\""));
        assert!(narration.contains("1 products"));

        let empty_narration = narrate_run("headphones", &[]);
        assert!(!empty_narration.contains("Found and analyzed"));
    }
}
