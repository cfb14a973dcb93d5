//! Browser lifecycle management
//!
//! Wraps the chromiumoxide browser together with its CDP event handler task
//! and the temporary profile directory it runs against.

use anyhow::Result;
use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::info;

use crate::BrowserConfig;

/// Wrapper for Browser and its event handler task
///
/// Ensures the handler is properly cleaned up when the browser is dropped.
/// The handler MUST be aborted to prevent it running indefinitely after the
/// browser is closed.
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserWrapper {
    pub(crate) fn new(browser: Browser, handler: JoinHandle<()>, user_data_dir: PathBuf) -> Self {
        Self {
            browser,
            handler,
            user_data_dir: Some(user_data_dir),
        }
    }

    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    pub(crate) fn browser_mut(&mut self) -> &mut Browser {
        &mut self.browser
    }

    /// Clean up the temp profile directory (blocking operation)
    ///
    /// MUST be called AFTER `browser.wait()` completes so Chrome has released
    /// all file handles; Windows will fail to remove locked files.
    pub fn cleanup_temp_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take() {
            info!("Cleaning up temp directory: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                tracing::warn!(
                    "Failed to clean up temp directory {}: {}. Manual cleanup may be required.",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();
        // Browser::drop() kills the Chrome process itself

        if self.user_data_dir.is_some() {
            tracing::warn!(
                "BrowserWrapper dropped without explicit cleanup. \
                Temp directory will be orphaned: {}. \
                Call BrowserManager::shutdown() before dropping to ensure proper cleanup.",
                self.user_data_dir.as_ref().unwrap().display()
            );
        }
    }
}

/// Launch a new browser instance for the automation flow
///
/// Returns tuple of (Browser, JoinHandle, PathBuf) where PathBuf is the
/// temp profile directory that MUST be cleaned up after browser shutdown.
pub async fn launch_browser(config: &BrowserConfig) -> Result<(Browser, JoinHandle<()>, PathBuf)> {
    info!("Launching automation browser instance");

    let user_data_dir =
        std::env::temp_dir().join(format!("shopflow_browser_{}", std::process::id()));

    let (browser, handler) =
        crate::browser_setup::launch_browser_process(config, Some(user_data_dir.clone())).await?;

    Ok((browser, handler, user_data_dir))
}

/// Get the active page, creating a blank one when the browser has none
///
/// The whole flow runs against a single page ("same window" model); callers
/// never hold more than one page at a time.
pub async fn active_page(wrapper: &BrowserWrapper) -> super::BrowserResult<Page> {
    let pages = wrapper
        .browser()
        .pages()
        .await
        .map_err(|e| super::BrowserError::PageCreationFailed(e.to_string()))?;

    if let Some(page) = pages.into_iter().next() {
        return Ok(page);
    }

    wrapper
        .browser()
        .new_page("about:blank")
        .await
        .map_err(|e| super::BrowserError::PageCreationFailed(e.to_string()))
}
