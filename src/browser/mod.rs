//! Browser lifecycle: launching a Chromium instance or attaching to a
//! running one over its DevTools websocket.

mod setup;

pub use setup::{find_browser_executable, launch_browser};

use anyhow::{Context, Result};
use chromiumoxide::browser::Browser;
use chromiumoxide::handler::Handler;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::task::{self, JoinHandle};
use tracing::{error, info, trace};

/// Wrapper for a Browser and its CDP event handler task.
///
/// The handler MUST be aborted when the wrapper goes away or it keeps
/// running after the browser is gone. `owns_process` distinguishes a
/// browser we launched (closed on shutdown) from one we attached to
/// (left running, only the connection is dropped).
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
    owns_process: bool,
}

impl BrowserWrapper {
    pub(crate) fn new(
        browser: Browser,
        handler: JoinHandle<()>,
        user_data_dir: Option<PathBuf>,
        owns_process: bool,
    ) -> Self {
        Self {
            browser,
            handler,
            user_data_dir,
            owns_process,
        }
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Get the current/active page.
    ///
    /// In attached mode this is the page the user already has open; in
    /// launched mode a blank page is created if none exists yet.
    pub async fn current_page(&self) -> Result<Page> {
        let pages = self
            .browser
            .pages()
            .await
            .context("Failed to list browser pages")?;

        if let Some(page) = pages.into_iter().next() {
            return Ok(page);
        }

        self.browser
            .new_page("about:blank")
            .await
            .context("Failed to create page")
    }

    /// Shut the session down.
    ///
    /// For a launched browser this closes the process and waits for it to
    /// exit before removing the temp profile directory (Chrome must release
    /// its file handles first). For an attached browser only the websocket
    /// connection is dropped.
    pub async fn shutdown(mut self) -> Result<()> {
        if self.owns_process {
            info!("Shutting down browser");
            if let Err(e) = self.browser.close().await {
                tracing::warn!("Failed to close browser cleanly: {}", e);
            }
            if let Err(e) = self.browser.wait().await {
                tracing::warn!("Failed to wait for browser exit: {}", e);
            }
        } else {
            info!("Detaching from browser (process left running)");
        }

        if let Some(path) = self.user_data_dir.take() {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                tracing::warn!(
                    "Failed to clean up temp profile {}: {}. Manual cleanup may be required.",
                    path.display(),
                    e
                );
            }
        }

        Ok(())
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();

        if self.user_data_dir.is_some() {
            tracing::warn!(
                "BrowserWrapper dropped without explicit shutdown. \
                 Temp profile will be orphaned: {}",
                self.user_data_dir
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            );
        }
    }
}

/// Attach to an already-running browser over its DevTools websocket.
///
/// Used when the target page is already rendered in the user's own browser
/// (started with `--remote-debugging-port`). The process is not owned by us
/// and is never closed on shutdown.
pub async fn connect_browser(ws_url: &str) -> Result<BrowserWrapper> {
    info!("Attaching to browser at {}", ws_url);

    let (browser, handler) = Browser::connect(ws_url)
        .await
        .with_context(|| format!("Failed to connect to browser at {ws_url}"))?;

    let handler_task = spawn_handler(handler);
    Ok(BrowserWrapper::new(browser, handler_task, None, false))
}

/// Drive the CDP event stream on a background task.
///
/// Known-benign deserialization errors (Chrome sending events chromiumoxide
/// doesn't model, see chromiumoxide#167/#229) are suppressed to trace level.
pub(crate) fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    task::spawn(async move {
        while let Some(h) = handler.next().await {
            if let Err(e) = h {
                let msg = e.to_string();
                let benign = msg.contains("data did not match any variant of untagged enum Message")
                    || msg.contains("Failed to deserialize WS response");
                if benign {
                    trace!("Suppressed benign CDP serialization error: {}", msg);
                } else {
                    error!("Browser handler error: {:?}", e);
                }
            }
        }
        info!("Browser handler task completed");
    })
}
