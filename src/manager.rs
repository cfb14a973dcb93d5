//! Browser instance manager
//!
//! Ensures only one browser runs for the process, lazily launched on first
//! use and shared by the host and the flow controller.
//!
//! # Async Lock Requirements
//!
//! Must use `tokio::sync::Mutex`, NOT a sync lock: browser operations are
//! async and locks are held across `.await` points.

use anyhow::Result;
use chromiumoxide::page::Page;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::BrowserConfig;
use crate::browser::{BrowserWrapper, active_page, launch_browser};

/// Manager for the single shared browser instance
///
/// - Lazy launch on first use (~2-3s first call, instant after)
/// - Health check on every access to detect crashes
/// - Automatic crash recovery, transparent to callers
/// - Proper cleanup on shutdown
pub struct BrowserManager {
    browser: Arc<Mutex<Option<BrowserWrapper>>>,
    config: BrowserConfig,
}

impl BrowserManager {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            browser: Arc::new(Mutex::new(None)),
            config,
        }
    }

    /// Get or launch the shared browser instance with health checking and auto-recovery
    ///
    /// If a browser exists its health is verified via the `version()` CDP
    /// command; a crashed instance is cleaned up and replaced.
    pub async fn get_or_launch(&self) -> Result<Arc<Mutex<Option<BrowserWrapper>>>> {
        let mut guard = self.browser.lock().await;

        if let Some(wrapper) = guard.as_ref() {
            match wrapper.browser().version().await {
                Ok(_) => {
                    tracing::debug!("Browser health check passed, reusing existing browser");
                    drop(guard);
                    return Ok(self.browser.clone());
                }
                Err(e) => {
                    tracing::warn!("Browser health check failed: {}. Triggering recovery...", e);

                    if let Some(mut crashed_wrapper) = guard.take() {
                        // Best-effort cleanup (process may already be dead)
                        let _ = crashed_wrapper.browser_mut().close().await;
                        let _ = crashed_wrapper.browser_mut().wait().await;
                        crashed_wrapper.cleanup_temp_dir();
                    }

                    tracing::info!("Crashed browser cleaned up, launching new instance");
                }
            }
        }

        info!("Launching browser (first time or after recovery)");
        let (browser, handler, user_data_dir) = launch_browser(&self.config).await?;
        let wrapper = BrowserWrapper::new(browser, handler, user_data_dir);
        *guard = Some(wrapper);
        drop(guard);

        Ok(self.browser.clone())
    }

    /// Get the single active page, launching the browser if needed
    ///
    /// The flow controller drives the whole run through this one page.
    pub async fn page(&self) -> Result<Page> {
        let browser_arc = self.get_or_launch().await?;
        let guard = browser_arc.lock().await;
        let wrapper = guard
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Browser not available"))?;

        Ok(active_page(wrapper).await?)
    }

    /// Shutdown the browser if running
    ///
    /// Safe to call multiple times (subsequent calls are no-ops). Both
    /// `close()` and `wait()` are required: dropping the wrapper only aborts
    /// the handler task, and without an explicit close the Chrome process
    /// becomes a zombie.
    pub async fn shutdown(&self) -> Result<()> {
        let mut guard = self.browser.lock().await;

        if let Some(mut wrapper) = guard.take() {
            info!("Shutting down browser");

            if let Err(e) = wrapper.browser_mut().close().await {
                tracing::warn!("Failed to close browser cleanly: {}", e);
            }

            if let Err(e) = wrapper.browser_mut().wait().await {
                tracing::warn!("Failed to wait for browser exit: {}", e);
            }

            wrapper.cleanup_temp_dir();

            drop(wrapper);
        }

        Ok(())
    }

    /// Non-blocking check of browser state
    pub async fn is_browser_running(&self) -> bool {
        self.browser.lock().await.is_some()
    }
}
