//! The run controller: discovery, section iteration, aggregation, and
//! finalization.
//!
//! The run is strictly sequential: extraction for a section only begins
//! after the settle wait for the click that opened it. Cancellation is
//! cooperative and polled once per iteration boundary, so a signal raised
//! mid-wait lets at most one more section finish before the run stops.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::Config;
use crate::driver::PageDriver;
use crate::error::ScrapeResult;
use crate::roster::{self, Entry, Roster};
use crate::stability::Settle;
use crate::status::{StatusEvent, StatusSink};

/// Outcome of a completed (or aborted) run.
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    /// Rendered plain-text report.
    pub text: String,
    pub entries: Vec<Entry>,
    /// True when the run was aborted before visiting every section.
    pub partial: bool,
    pub sections_total: usize,
    pub sections_scraped: usize,
}

pub struct Scraper<D: PageDriver> {
    driver: D,
    config: Config,
    sink: Arc<dyn StatusSink>,
    cancel: CancellationToken,
}

impl<D: PageDriver> Scraper<D> {
    pub fn new(
        driver: D,
        config: Config,
        sink: Arc<dyn StatusSink>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            driver,
            config,
            sink,
            cancel,
        }
    }

    /// Run the full scrape.
    ///
    /// Discovery failures are fatal. Inside the loop, any error raised by a
    /// single section's activation, settle wait, or extraction skips that
    /// section and the run continues; entries collected so far are always
    /// retained.
    pub async fn run(mut self) -> ScrapeResult<ScrapeReport> {
        let labels = self.driver.discover().await?;
        let total = labels.len();
        self.sink.report(&StatusEvent::SectionsFound { count: total });

        let mut collection = Roster::new(&self.config.ignore_list, self.config.name_key_policy);
        let mut partial = false;
        let mut scraped = 0;

        for (i, &label) in labels.iter().enumerate() {
            if self.cancel.is_cancelled() {
                partial = true;
                self.sink.report(&StatusEvent::Aborted {
                    completed: i,
                    total,
                });
                break;
            }

            self.sink.report(&StatusEvent::SectionStart {
                label,
                index: i + 1,
                total,
            });

            let lines = match self.scrape_section(i, label).await {
                Ok(lines) => lines,
                Err(e) => {
                    warn!("skipping section {label}: {e}");
                    self.sink.report(&StatusEvent::SectionSkipped {
                        label,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            for line in &lines {
                collection.accept(line, label);
            }
            scraped += 1;
        }

        self.sink.report(&StatusEvent::Completed {
            collected: collection.len(),
            partial,
        });

        let entries = collection.into_entries();
        Ok(ScrapeReport {
            text: roster::render_report(&entries, partial),
            entries,
            partial,
            sections_total: total,
            sections_scraped: scraped,
        })
    }

    async fn scrape_section(&mut self, index: usize, label: char) -> ScrapeResult<Vec<String>> {
        self.driver.activate(index).await?;

        // TimedOut is a degraded-confidence signal, not a failure.
        if self.driver.wait_settled().await? == Settle::TimedOut {
            self.sink.report(&StatusEvent::SettleTimeout { label });
        }

        self.driver.extract().await
    }
}
