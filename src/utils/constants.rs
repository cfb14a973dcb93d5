//! Shared configuration constants
//!
//! Default values used throughout the codebase to ensure consistency and
//! avoid magic numbers.

/// Chrome user agent string presented by the automation browser
///
/// Chrome releases new stable versions ~every 4 weeks; update quarterly to
/// stay within a reasonable version window.
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Offset scrolled back to after the incremental result scrolls, so the
/// first results are visible
pub const RESULTS_VIEW_OFFSET_PX: i64 = 500;
