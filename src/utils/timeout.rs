//! Timeout validation for browser operations

use anyhow::{Result, bail};
use std::time::Duration;

/// Maximum timeout for browser navigation operations (5 minutes)
/// Covers slow-loading sites, heavy SPAs, and network delays
pub const MAX_NAVIGATION_TIMEOUT_MS: u64 = 300_000;

/// Maximum timeout for element interaction operations (30 seconds)
/// Covers dynamic element loading and animations
pub const MAX_INTERACTION_TIMEOUT_MS: u64 = 30_000;

/// Validate a configured navigation timeout against the hard cap
pub fn validate_navigation_timeout(timeout_ms: u64) -> Result<Duration> {
    if timeout_ms > MAX_NAVIGATION_TIMEOUT_MS {
        bail!(
            "Navigation timeout cannot exceed {}ms ({} minutes). Received: {}ms",
            MAX_NAVIGATION_TIMEOUT_MS,
            MAX_NAVIGATION_TIMEOUT_MS / 60_000,
            timeout_ms
        );
    }

    Ok(Duration::from_millis(timeout_ms))
}

/// Validate a configured interaction timeout against the hard cap
pub fn validate_interaction_timeout(timeout_ms: u64) -> Result<Duration> {
    if timeout_ms > MAX_INTERACTION_TIMEOUT_MS {
        bail!(
            "Interaction timeout cannot exceed {}ms ({} seconds). Received: {}ms",
            MAX_INTERACTION_TIMEOUT_MS,
            MAX_INTERACTION_TIMEOUT_MS / 1000,
            timeout_ms
        );
    }

    Ok(Duration::from_millis(timeout_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_timeouts_under_the_caps() {
        assert_eq!(
            validate_navigation_timeout(30_000).unwrap(),
            Duration::from_millis(30_000)
        );
        assert_eq!(
            validate_interaction_timeout(3_000).unwrap(),
            Duration::from_millis(3_000)
        );
    }

    #[test]
    fn rejects_timeouts_over_the_caps() {
        assert!(validate_navigation_timeout(MAX_NAVIGATION_TIMEOUT_MS + 1).is_err());
        assert!(validate_interaction_timeout(MAX_INTERACTION_TIMEOUT_MS + 1).is_err());
    }
}
