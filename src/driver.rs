//! The page seam: everything the controller needs from a live page, behind
//! a trait so the run loop is testable without a browser.

use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::Page;

use crate::Config;
use crate::error::{ScrapeError, ScrapeResult};
use crate::extract;
use crate::sections::{self, FilterControl};
use crate::stability::{self, Settle, SettleConfig};
use crate::status::StatusSink;

/// Page operations the controller drives, one section at a time.
#[async_trait]
pub trait PageDriver {
    /// Discover the filter controls; returns their labels in sorted order.
    async fn discover(&mut self) -> ScrapeResult<Vec<char>>;

    /// Scroll the i-th control into view and click it.
    async fn activate(&mut self, index: usize) -> ScrapeResult<()>;

    /// Wait for the page to settle after an activation.
    async fn wait_settled(&mut self) -> ScrapeResult<Settle>;

    /// Extract the full page body as cleaned lines.
    async fn extract(&mut self) -> ScrapeResult<Vec<String>>;
}

/// Production driver over a chromiumoxide page.
pub struct CdpDriver {
    page: Page,
    header_title: String,
    settle: SettleConfig,
    sink: Arc<dyn StatusSink>,
    controls: Vec<FilterControl>,
}

impl CdpDriver {
    pub fn new(page: Page, config: &Config, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            page,
            header_title: config.header_title.clone(),
            settle: config.settle_config(),
            sink,
            controls: Vec::new(),
        }
    }
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn discover(&mut self) -> ScrapeResult<Vec<char>> {
        self.controls =
            sections::discover(&self.page, &self.header_title, self.sink.as_ref()).await?;
        Ok(self.controls.iter().map(|c| c.label).collect())
    }

    async fn activate(&mut self, index: usize) -> ScrapeResult<()> {
        let control = self
            .controls
            .get(index)
            .ok_or_else(|| ScrapeError::Section(format!("no control at index {index}")))?;

        control.element.scroll_into_view().await?;

        // Click via clickable point rather than element.click(): bypasses
        // the IntersectionObserver hang on elements mid-scroll.
        let point = control.element.clickable_point().await?;
        self.page.click(point).await?;
        Ok(())
    }

    async fn wait_settled(&mut self) -> ScrapeResult<Settle> {
        stability::settle(&self.page, &self.settle).await
    }

    async fn extract(&mut self) -> ScrapeResult<Vec<String>> {
        extract::extract_lines(&self.page).await
    }
}
