//! Autonomous shopping-search automation over a controlled browser
//!
//! Drives a single Chromium instance through scripted searches on the
//! configured shopping sites, extracts rudimentary product data, and pushes
//! progress to a connected WebSocket client.

mod browser;
pub mod browser_setup;
pub mod channel;
pub mod flow;
pub mod host;
mod manager;
pub mod session;
pub mod sites;
mod utils;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub pacing: PacingConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// HTTP/WebSocket listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the combined HTTP + WebSocket listener binds to
    #[serde(default = "default_listen")]
    pub listen: String,
}

/// Browser security and launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Disable web security features (Same-Origin Policy, etc.)
    /// WARNING: Only enable for trusted content
    #[serde(default = "default_disable_security")]
    pub disable_security: bool,

    /// Window dimensions
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

/// Human-pacing windows for the automation flow
///
/// Every randomized delay in the system is a single uniform draw over one of
/// these inclusive millisecond windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Settle window after a page load
    #[serde(default = "default_settle_min_ms")]
    pub settle_min_ms: u64,
    #[serde(default = "default_settle_max_ms")]
    pub settle_max_ms: u64,

    /// Fixed delay between typed characters
    #[serde(default = "default_type_char_delay_ms")]
    pub type_char_delay_ms: u64,

    /// Pause window between incremental result scrolls
    #[serde(default = "default_scroll_min_ms")]
    pub scroll_min_ms: u64,
    #[serde(default = "default_scroll_max_ms")]
    pub scroll_max_ms: u64,

    /// Number of incremental scroll passes over a result page
    #[serde(default = "default_scroll_passes")]
    pub scroll_passes: u32,
}

/// Per-operation timeout bounds
///
/// These are the only bounding mechanism against indefinite suspension; there
/// is no flow-level timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Page-load timeout for site navigation
    #[serde(default = "default_navigation_ms")]
    pub navigation_ms: u64,

    /// Per-selector wait while probing for a search box
    #[serde(default = "default_selector_ms")]
    pub selector_ms: u64,

    /// Per-selector wait while probing popup/banner dismissals
    #[serde(default = "default_popup_probe_ms")]
    pub popup_probe_ms: u64,

    /// Wait for the result page to settle after submitting a search
    #[serde(default = "default_network_settle_ms")]
    pub network_settle_ms: u64,

    /// Wait for navigation triggered by a product click
    #[serde(default = "default_click_nav_ms")]
    pub click_nav_ms: u64,
}

fn default_listen() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_disable_security() -> bool {
    false // SECURE BY DEFAULT
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_settle_min_ms() -> u64 {
    2000
}

fn default_settle_max_ms() -> u64 {
    3000
}

fn default_type_char_delay_ms() -> u64 {
    50
}

fn default_scroll_min_ms() -> u64 {
    1500
}

fn default_scroll_max_ms() -> u64 {
    2500
}

fn default_scroll_passes() -> u32 {
    3
}

fn default_navigation_ms() -> u64 {
    30_000
}

fn default_selector_ms() -> u64 {
    3_000
}

fn default_popup_probe_ms() -> u64 {
    1_500
}

fn default_network_settle_ms() -> u64 {
    15_000
}

fn default_click_nav_ms() -> u64 {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            browser: BrowserConfig::default(),
            pacing: PacingConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            disable_security: default_disable_security(),
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            settle_min_ms: default_settle_min_ms(),
            settle_max_ms: default_settle_max_ms(),
            type_char_delay_ms: default_type_char_delay_ms(),
            scroll_min_ms: default_scroll_min_ms(),
            scroll_max_ms: default_scroll_max_ms(),
            scroll_passes: default_scroll_passes(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_ms: default_navigation_ms(),
            selector_ms: default_selector_ms(),
            popup_probe_ms: default_popup_probe_ms(),
            network_settle_ms: default_network_settle_ms(),
            click_nav_ms: default_click_nav_ms(),
        }
    }
}

/// Load config from config.yaml in the working directory
///
/// A missing file yields the defaults; a malformed file is an error.
pub fn load_yaml_config() -> anyhow::Result<Config> {
    let config_path = PathBuf::from("config.yaml");

    if config_path.exists() {
        let contents = fs::read_to_string(&config_path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

pub use browser::{BrowserError, BrowserResult, BrowserWrapper, launch_browser};
pub use channel::{Notification, StatusChannel};
pub use flow::FlowController;
pub use host::{ClientCommand, CommandError, ProcessHost};
pub use manager::BrowserManager;
pub use session::{AnalysisResult, ExtractedProduct, SessionState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_windows() {
        let config = Config::default();
        assert_eq!(config.pacing.settle_min_ms, 2000);
        assert_eq!(config.pacing.settle_max_ms, 3000);
        assert_eq!(config.pacing.type_char_delay_ms, 50);
        assert_eq!(config.pacing.scroll_passes, 3);
        assert_eq!(config.timeouts.navigation_ms, 30_000);
        assert_eq!(config.timeouts.network_settle_ms, 15_000);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config: Config = serde_yaml::from_str("pacing:\n  settle_min_ms: 500\n").unwrap();
        assert_eq!(config.pacing.settle_min_ms, 500);
        assert_eq!(config.pacing.settle_max_ms, 3000);
        assert_eq!(config.server.listen, "127.0.0.1:3000");
    }
}
