//! Filter-control discovery.
//!
//! Locates the anchor header, then selects the alphabet filter controls
//! physically below it. Discovery runs once per scrape; the resulting
//! control set is immutable for the run.

use std::collections::HashSet;

use chromiumoxide::Page;
use chromiumoxide::element::Element;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ScrapeError, ScrapeResult};
use crate::status::{StatusEvent, StatusSink};

const ANCHOR_SELECTOR: &str = "h1, h2, h3, h4, h5, strong, b";
const CANDIDATE_SELECTOR: &str = "a, li, span, div[role='button']";

/// One discovered alphabet filter control.
pub struct FilterControl {
    pub element: Element,
    pub label: char,
}

/// Geometry and text probed from a candidate element in a single JS call.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CandidateProbe {
    /// Trimmed visible text.
    pub text: String,
    /// Absolute vertical offset (scroll position + bounding-box top).
    pub top: f64,
    /// No rendered box (offsetParent is null).
    pub hidden: bool,
    /// Inside nav/footer page chrome.
    pub chrome: bool,
}

const PROBE_FN: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    return JSON.stringify({
        text: (this.innerText || '').trim(),
        top: window.scrollY + rect.top,
        hidden: this.offsetParent === null,
        chrome: this.closest('nav, footer') !== null,
    });
}"#;

const ABSOLUTE_TOP_FN: &str =
    "function() { return window.scrollY + this.getBoundingClientRect().top; }";

/// Select filter controls from probed candidates.
///
/// Keeps visible candidates below the anchor whose trimmed text is exactly
/// one uppercase letter or `#`, excluding nav/footer chrome. Deduplicates by
/// character (first occurrence wins) and sorts lexicographically, so `#`
/// orders before letters. Returns indices into the candidate list paired
/// with the matched character. Deterministic on a static DOM.
pub(crate) fn select_controls(probes: &[CandidateProbe], anchor_top: f64) -> Vec<(usize, char)> {
    let mut seen = HashSet::new();
    let mut picked = Vec::new();

    for (i, probe) in probes.iter().enumerate() {
        if probe.hidden || probe.chrome || probe.top <= anchor_top {
            continue;
        }

        let mut chars = probe.text.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            continue;
        };
        if !(c.is_ascii_uppercase() || c == '#') {
            continue;
        }

        if seen.insert(c) {
            picked.push((i, c));
        }
    }

    picked.sort_by_key(|&(_, c)| c);
    picked
}

async fn probe_candidate(element: &Element) -> ScrapeResult<CandidateProbe> {
    let returned = element
        .call_js_fn(PROBE_FN, false)
        .await
        .map_err(|e| ScrapeError::Evaluation(e.to_string()))?;

    let json = returned
        .result
        .value
        .and_then(|v| v.as_str().map(str::to_owned))
        .ok_or_else(|| ScrapeError::Evaluation("candidate probe returned no value".into()))?;

    Ok(serde_json::from_str(&json)?)
}

async fn absolute_top(element: &Element) -> ScrapeResult<f64> {
    let returned = element
        .call_js_fn(ABSOLUTE_TOP_FN, false)
        .await
        .map_err(|e| ScrapeError::Evaluation(e.to_string()))?;

    returned
        .result
        .value
        .and_then(|v| v.as_f64())
        .ok_or_else(|| ScrapeError::Evaluation("anchor offset probe returned no value".into()))
}

/// Find the anchor header: the first heading/bold element whose text
/// case-insensitively contains `header_title`.
async fn find_anchor(page: &Page, header_title: &str) -> ScrapeResult<Element> {
    let needle = header_title.to_lowercase();
    let headers = page.find_elements(ANCHOR_SELECTOR).await?;

    for element in headers {
        let text = element.inner_text().await?.unwrap_or_default();
        if text.to_lowercase().contains(&needle) {
            return Ok(element);
        }
    }

    Err(ScrapeError::AnchorNotFound(header_title.to_owned()))
}

/// Discover the filter controls below the anchor header.
///
/// Fails with `AnchorNotFound` if the marker phrase is absent and
/// `NoSectionsFound` if no control survives selection. Candidates whose
/// probe fails are skipped rather than failing discovery.
pub async fn discover(
    page: &Page,
    header_title: &str,
    sink: &dyn StatusSink,
) -> ScrapeResult<Vec<FilterControl>> {
    let anchor = find_anchor(page, header_title).await?;
    sink.report(&StatusEvent::AnchorFound);
    anchor.scroll_into_view().await?;
    let anchor_top = absolute_top(&anchor).await?;
    debug!(anchor_top, "anchor header located");

    let candidates = page.find_elements(CANDIDATE_SELECTOR).await?;

    let mut probes = Vec::with_capacity(candidates.len());
    for element in &candidates {
        match probe_candidate(element).await {
            Ok(probe) => probes.push(probe),
            Err(e) => {
                debug!("candidate probe failed, skipping element: {}", e);
                probes.push(CandidateProbe {
                    text: String::new(),
                    top: f64::MIN,
                    hidden: true,
                    chrome: false,
                });
            }
        }
    }

    let picked = select_controls(&probes, anchor_top);
    if picked.is_empty() {
        return Err(ScrapeError::NoSectionsFound);
    }

    let mut slots: Vec<Option<Element>> = candidates.into_iter().map(Some).collect();
    let mut controls = Vec::with_capacity(picked.len());
    for (index, label) in picked {
        if let Some(element) = slots[index].take() {
            controls.push(FilterControl { element, label });
        }
    }

    Ok(controls)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn probe(text: &str, top: f64) -> CandidateProbe {
        CandidateProbe {
            text: text.to_owned(),
            top,
            hidden: false,
            chrome: false,
        }
    }

    #[test]
    fn keeps_only_single_letter_controls_below_anchor() {
        let probes = vec![
            probe("A", 50.0),    // above anchor
            probe("A", 200.0),   // first valid A
            probe("About", 210.0),
            probe("B", 220.0),
            probe("ab", 230.0),  // lowercase pair
            probe("#", 240.0),
        ];
        let picked = select_controls(&probes, 100.0);
        assert_eq!(picked, vec![(5, '#'), (1, 'A'), (3, 'B')]);
    }

    #[test]
    fn hash_sorts_before_letters() {
        let probes = vec![probe("Z", 200.0), probe("#", 210.0), probe("A", 220.0)];
        let labels: Vec<char> = select_controls(&probes, 0.0)
            .into_iter()
            .map(|(_, c)| c)
            .collect();
        assert_eq!(labels, vec!['#', 'A', 'Z']);
    }

    #[test]
    fn first_occurrence_wins_on_duplicate_labels() {
        let probes = vec![probe("A", 200.0), probe("A", 300.0)];
        assert_eq!(select_controls(&probes, 0.0), vec![(0, 'A')]);
    }

    #[test]
    fn hidden_and_chrome_candidates_are_excluded() {
        let mut hidden = probe("A", 200.0);
        hidden.hidden = true;
        let mut footer = probe("B", 210.0);
        footer.chrome = true;
        let probes = vec![hidden, footer, probe("C", 220.0)];
        assert_eq!(select_controls(&probes, 0.0), vec![(2, 'C')]);
    }

    #[test]
    fn discovery_is_idempotent_on_static_input() {
        let probes = vec![
            probe("B", 200.0),
            probe("A", 210.0),
            probe("#", 220.0),
            probe("A", 230.0),
        ];
        let first = select_controls(&probes, 0.0);
        let second = select_controls(&probes, 0.0);
        assert_eq!(first, second);
    }

    #[test]
    fn candidate_exactly_at_anchor_height_is_excluded() {
        let probes = vec![probe("A", 100.0), probe("B", 100.1)];
        assert_eq!(select_controls(&probes, 100.0), vec![(1, 'B')]);
    }

    #[test]
    fn lowercase_and_digit_labels_are_rejected() {
        let probes = vec![probe("a", 200.0), probe("1", 210.0), probe("Q", 220.0)];
        assert_eq!(select_controls(&probes, 0.0), vec![(2, 'Q')]);
    }
}
