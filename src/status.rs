//! One-way progress reporting.
//!
//! The core reports progress through an injected sink and holds no
//! presentation state; consumers decide whether events become log lines, a
//! UI overlay, or anything else.

use std::fmt;

/// Progress events emitted over a run, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// The anchor header was located; candidate scanning begins.
    AnchorFound,
    SectionsFound {
        count: usize,
    },
    SectionStart {
        label: char,
        index: usize,
        total: usize,
    },
    /// The settle wait hit its ceiling; extraction proceeds best-effort.
    SettleTimeout {
        label: char,
    },
    SectionSkipped {
        label: char,
        reason: String,
    },
    Aborted {
        completed: usize,
        total: usize,
    },
    Completed {
        collected: usize,
        partial: bool,
    },
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::AnchorFound => {
                write!(f, "Header found, scanning for sections")
            }
            StatusEvent::SectionsFound { count } => {
                write!(f, "Found {count} sections to scrape")
            }
            StatusEvent::SectionStart {
                label,
                index,
                total,
            } => write!(f, "Scraping section {label} ({index}/{total})"),
            StatusEvent::SettleTimeout { label } => {
                write!(f, "Section {label} did not settle, extracting anyway")
            }
            StatusEvent::SectionSkipped { label, reason } => {
                write!(f, "Skipping section {label}: {reason}")
            }
            StatusEvent::Aborted { completed, total } => {
                write!(f, "Stopped after {completed}/{total} sections")
            }
            StatusEvent::Completed { collected, partial } => {
                if *partial {
                    write!(f, "Done with partial results, collected {collected} items")
                } else {
                    write!(f, "Done, collected {collected} items")
                }
            }
        }
    }
}

/// Status consumer. One-way; no acknowledgement.
pub trait StatusSink: Send + Sync {
    fn report(&self, event: &StatusEvent);
}

/// Default sink: forwards events to `tracing`.
pub struct LogSink;

impl StatusSink for LogSink {
    fn report(&self, event: &StatusEvent) {
        match event {
            StatusEvent::SectionSkipped { .. } | StatusEvent::SettleTimeout { .. } => {
                tracing::warn!("{event}");
            }
            _ => tracing::info!("{event}"),
        }
    }
}
