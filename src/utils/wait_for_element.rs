//! Element polling
//!
//! Polls for DOM elements with exponential backoff. SPAs render elements via
//! JavaScript after the initial page load event fires, so a single
//! `find_element` probe is not enough.

use std::time::Duration;

use anyhow::Result;
use chromiumoxide::Page;
use chromiumoxide::element::Element;

/// Wait for an element to appear in the DOM using exponential backoff polling
///
/// # Polling Strategy
/// - Starts at 100ms intervals
/// - Doubles each retry (exponential backoff)
/// - Caps at 1 second maximum interval
/// - Total duration limited by the timeout parameter
pub async fn wait_for_element(page: &Page, selector: &str, timeout: Duration) -> Result<Element> {
    let start = std::time::Instant::now();
    let mut poll_interval = Duration::from_millis(100);
    let max_interval = Duration::from_secs(1);

    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Ok(element);
        }

        if start.elapsed() >= timeout {
            return Err(anyhow::anyhow!(
                "Element not found (timeout after {}ms): '{}'",
                timeout.as_millis(),
                selector
            ));
        }

        tokio::time::sleep(poll_interval).await;

        poll_interval = (poll_interval * 2).min(max_interval);
    }
}
