//! Settle detection: decides when the page has stopped changing after a
//! simulated interaction.
//!
//! A MutationObserver is injected into the page to count structural
//! (childList/subtree) mutations under `document.body`; the Rust side polls
//! the counter and resolves once it has not advanced for a continuous
//! debounce window after at least one mutation was seen, bounded by a hard
//! ceiling. A click that produces no mutation at all runs to the ceiling.
//! The observer is scoped to a single wait and removed on both resolution
//! paths.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::Page;
use serde_json::Value;

use crate::error::{ScrapeError, ScrapeResult};

/// Outcome of a settle wait.
///
/// `TimedOut` is not an error: extraction proceeds best-effort, it just
/// carries no proof the DOM finished updating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    Stable,
    TimedOut,
}

/// Thresholds for one settle wait.
#[derive(Debug, Clone, Copy)]
pub struct SettleConfig {
    /// Lower bound: `Stable` never resolves before this much time has
    /// elapsed, even on a page that never mutates at all.
    pub min_wait: Duration,
    /// Hard ceiling: resolve `TimedOut` once this elapses.
    pub max_wait: Duration,
    /// Debounce window: the mutation counter must hold still this long.
    pub stability_wait: Duration,
    /// Counter polling interval.
    pub poll_interval: Duration,
}

/// Source of the page's structural-mutation count.
///
/// The production impl reads an injected observer's counter over CDP; tests
/// drive the loop with a scripted fake.
#[async_trait]
pub trait MutationProbe {
    async fn mutation_count(&mut self) -> ScrapeResult<u64>;
}

/// Debounce loop over a mutation counter.
///
/// The debounce clock starts at the first observed mutation: `Stable`
/// resolves once the count has held still for `stability_wait` after some
/// change was seen, and never before `min_wait` has elapsed. A target that
/// never mutates at all (a click with no visible effect) runs to the
/// ceiling and resolves `TimedOut` — content that arrives late must be
/// waited for, not declared settled by silence. Always resolves within
/// `max_wait + poll_interval`, even under a target that never stops
/// mutating.
pub async fn await_quiescence<P>(probe: &mut P, config: &SettleConfig) -> ScrapeResult<Settle>
where
    P: MutationProbe + Send,
{
    let start = Instant::now();
    let mut last_count = probe.mutation_count().await?;
    let mut last_mutation: Option<Instant> = None;

    loop {
        if start.elapsed() >= config.max_wait {
            return Ok(Settle::TimedOut);
        }

        tokio::time::sleep(config.poll_interval).await;

        let count = probe.mutation_count().await?;
        let now = Instant::now();
        if count != last_count {
            last_count = count;
            last_mutation = Some(now);
        }

        if let Some(since) = last_mutation
            && now.duration_since(since) >= config.stability_wait
            && start.elapsed() >= config.min_wait
        {
            return Ok(Settle::Stable);
        }
    }
}

const ARM_SCRIPT: &str = r#"(() => {
    if (window.__cspRosterObserver) { return true; }
    window.__cspRosterMutations = 0;
    const observer = new MutationObserver(records => {
        window.__cspRosterMutations += records.length;
    });
    observer.observe(document.body, { childList: true, subtree: true });
    window.__cspRosterObserver = observer;
    return true;
})()"#;

const DISARM_SCRIPT: &str = r#"(() => {
    if (window.__cspRosterObserver) {
        window.__cspRosterObserver.disconnect();
    }
    delete window.__cspRosterObserver;
    delete window.__cspRosterMutations;
    return true;
})()"#;

const COUNT_SCRIPT: &str = "window.__cspRosterMutations || 0";

struct CdpProbe<'a> {
    page: &'a Page,
}

#[async_trait]
impl MutationProbe for CdpProbe<'_> {
    async fn mutation_count(&mut self) -> ScrapeResult<u64> {
        let value: Value = self
            .page
            .evaluate(COUNT_SCRIPT)
            .await?
            .into_value()
            .map_err(|e| ScrapeError::Evaluation(e.to_string()))?;
        Ok(value.as_u64().unwrap_or(0))
    }
}

/// Run one settle wait against a live page.
///
/// Arms the observer, runs the debounce loop, and disarms on both paths —
/// the observer never outlives the wait.
pub async fn settle(page: &Page, config: &SettleConfig) -> ScrapeResult<Settle> {
    page.evaluate(ARM_SCRIPT).await?;

    let outcome = await_quiescence(&mut CdpProbe { page }, config).await;

    let disarmed = page.evaluate(DISARM_SCRIPT).await;
    let outcome = outcome?;
    disarmed?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min: u64, max: u64, stability: u64) -> SettleConfig {
        SettleConfig {
            min_wait: Duration::from_millis(min),
            max_wait: Duration::from_millis(max),
            stability_wait: Duration::from_millis(stability),
            poll_interval: Duration::from_millis(5),
        }
    }

    /// Returns a fixed count forever: a target that never mutates.
    struct QuietProbe;

    #[async_trait]
    impl MutationProbe for QuietProbe {
        async fn mutation_count(&mut self) -> ScrapeResult<u64> {
            Ok(0)
        }
    }

    /// Count advances on every poll: a target that never settles.
    struct NoisyProbe {
        count: u64,
    }

    #[async_trait]
    impl MutationProbe for NoisyProbe {
        async fn mutation_count(&mut self) -> ScrapeResult<u64> {
            self.count += 1;
            Ok(self.count)
        }
    }

    /// Mutates for the first few polls, then goes quiet.
    struct BurstProbe {
        polls: u64,
        noisy_for: u64,
    }

    #[async_trait]
    impl MutationProbe for BurstProbe {
        async fn mutation_count(&mut self) -> ScrapeResult<u64> {
            self.polls += 1;
            Ok(self.polls.min(self.noisy_for))
        }
    }

    /// Silent until the given poll, then a single mutation: content that
    /// arrives late after the click.
    struct LateProbe {
        polls: u64,
        first_change_at: u64,
    }

    #[async_trait]
    impl MutationProbe for LateProbe {
        async fn mutation_count(&mut self) -> ScrapeResult<u64> {
            self.polls += 1;
            Ok(u64::from(self.polls >= self.first_change_at))
        }
    }

    #[tokio::test]
    async fn quiet_target_runs_to_the_ceiling() {
        // A click with no visible effect must resolve via the ceiling
        // timer, not be declared settled by silence.
        let start = Instant::now();
        let outcome = await_quiescence(&mut QuietProbe, &config(0, 150, 30))
            .await
            .unwrap();
        assert_eq!(outcome, Settle::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn late_content_is_awaited_before_stable() {
        // First mutation lands well after the debounce window length; the
        // wait must not resolve before that content has arrived and
        // settled.
        let mut probe = LateProbe {
            polls: 0,
            first_change_at: 12, // ~60ms in, with a 5ms poll interval
        };
        let start = Instant::now();
        let outcome = await_quiescence(&mut probe, &config(0, 2_000, 40))
            .await
            .unwrap();
        assert_eq!(outcome, Settle::Stable);
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn stable_never_resolves_before_min_wait() {
        let mut probe = LateProbe {
            polls: 0,
            first_change_at: 1,
        };
        let start = Instant::now();
        let outcome = await_quiescence(&mut probe, &config(150, 2_000, 20))
            .await
            .unwrap();
        assert_eq!(outcome, Settle::Stable);
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn noisy_target_times_out_within_ceiling() {
        let start = Instant::now();
        let outcome = await_quiescence(&mut NoisyProbe { count: 0 }, &config(0, 120, 50))
            .await
            .unwrap();
        assert_eq!(outcome, Settle::TimedOut);
        // Liveness: bounded by max_wait plus one poll interval of slack.
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn burst_then_quiet_resolves_stable() {
        let mut probe = BurstProbe {
            polls: 0,
            noisy_for: 4,
        };
        let outcome = await_quiescence(&mut probe, &config(0, 2_000, 40))
            .await
            .unwrap();
        assert_eq!(outcome, Settle::Stable);
    }

    #[tokio::test]
    async fn min_wait_beyond_ceiling_still_times_out() {
        let outcome = await_quiescence(&mut QuietProbe, &config(500, 100, 20))
            .await
            .unwrap();
        assert_eq!(outcome, Settle::TimedOut);
    }
}
