//! Fixed-cadence progress clock for throughput phases

use super::phase::SharedCounter;
use crate::models::Sample;
use crate::stats;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Turns the shared byte counter into a live rate curve
///
/// Each tick reads the counter, computes the cumulative average rate since
/// `started`, appends a [`Sample`] and reports `(rate, percent, samples)`.
/// The clock is the only writer of the sample list, so samples are ordered
/// by construction.
#[derive(Debug, Clone)]
pub struct ProgressClock {
    interval: Duration,
    window: Duration,
}

impl ProgressClock {
    pub fn new(interval: Duration, window: Duration) -> Self {
        Self { interval, window }
    }

    /// Percentage of `window` covered after `elapsed`, capped at 100
    pub fn percent(&self, elapsed: Duration) -> f64 {
        if self.window.is_zero() {
            return 100.0;
        }
        (elapsed.as_secs_f64() / self.window.as_secs_f64()).min(1.0) * 100.0
    }

    /// Tick until the window has elapsed or `token` fires, then hand back
    /// every sample taken.
    pub async fn run<F>(
        &self,
        counter: &SharedCounter,
        token: &CancellationToken,
        started: Instant,
        mut on_tick: F,
    ) -> Vec<Sample>
    where
        F: FnMut(f64, f64, &[Sample]),
    {
        let mut ticker = tokio::time::interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut samples: Vec<Sample> = Vec::new();

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let elapsed = started.elapsed();
            let stamp_ms = elapsed.as_millis() as f64;

            // Nothing meaningful to report yet, or a second tick within the same millisecond
            let stale = samples.last().is_some_and(|last| last.elapsed_ms >= stamp_ms);
            if stamp_ms > 0.0 && !stale {
                let rate = stats::rate_mbps(counter.load(), elapsed.as_secs_f64());
                samples.push(Sample::new(stamp_ms, rate));
                on_tick(rate, self.percent(elapsed), &samples);
            }

            if elapsed >= self.window {
                break;
            }
        }

        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_is_capped() {
        let clock = ProgressClock::new(Duration::from_millis(16), Duration::from_secs(8));
        assert_eq!(clock.percent(Duration::ZERO), 0.0);
        assert_eq!(clock.percent(Duration::from_secs(4)), 50.0);
        assert_eq!(clock.percent(Duration::from_secs(9)), 100.0);

        let degenerate = ProgressClock::new(Duration::from_millis(16), Duration::ZERO);
        assert_eq!(degenerate.percent(Duration::from_secs(1)), 100.0);
    }

    #[tokio::test]
    async fn test_clock_runs_for_the_window() {
        let clock = ProgressClock::new(Duration::from_millis(16), Duration::from_millis(200));
        let counter = SharedCounter::new();
        let token = CancellationToken::new();
        counter.add(1_000_000);

        let started = Instant::now();
        let mut ticks = 0usize;
        let mut last_percent = 0.0;
        let samples = clock
            .run(&counter, &token, started, |rate, percent, samples| {
                ticks += 1;
                assert!(rate > 0.0);
                assert_eq!(samples.len(), ticks);
                last_percent = percent;
            })
            .await;

        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(samples.len() >= 5, "only {} samples", samples.len());
        assert_eq!(samples.len(), ticks);
        assert_eq!(last_percent, 100.0);
    }

    #[tokio::test]
    async fn test_samples_strictly_increase() {
        let clock = ProgressClock::new(Duration::from_millis(1), Duration::from_millis(120));
        let counter = SharedCounter::new();
        let token = CancellationToken::new();

        let samples = clock.run(&counter, &token, Instant::now(), |_, _, _| {}).await;

        assert!(!samples.is_empty());
        assert!(samples[0].elapsed_ms > 0.0);
        for pair in samples.windows(2) {
            assert!(pair[1].elapsed_ms > pair[0].elapsed_ms);
        }
        assert!(samples.iter().all(|s| s.rate_mbps == 0.0));
    }

    #[tokio::test]
    async fn test_clock_stops_on_cancel() {
        let clock = ProgressClock::new(Duration::from_millis(16), Duration::from_secs(30));
        let counter = SharedCounter::new();
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            cancel.cancel();
        });

        let started = Instant::now();
        clock.run(&counter, &token, started, |_, _, _| {}).await;
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_pre_cancelled_clock_emits_nothing() {
        let clock = ProgressClock::new(Duration::from_millis(16), Duration::from_secs(1));
        let token = CancellationToken::new();
        token.cancel();

        let mut calls = 0;
        let samples = clock
            .run(&SharedCounter::new(), &token, Instant::now(), |_, _, _| calls += 1)
            .await;

        assert!(samples.is_empty());
        assert_eq!(calls, 0);
    }
}
