//! Latency prober: sequential zero-byte round trips

use super::phase::PhaseGuard;
use crate::{
    client::TransferClient,
    error::{AppError, Result},
    logging::Logger,
    models::LatencyResult,
};
use std::time::Duration;
use tokio::time::{timeout, Instant};

/// Measures minimum round-trip time and jitter
pub struct LatencyProber<'a> {
    client: &'a dyn TransferClient,
    logger: &'a Logger,
    ping_count: u32,
    ping_interval: Duration,
    request_timeout: Duration,
}

impl<'a> LatencyProber<'a> {
    pub fn new(
        client: &'a dyn TransferClient,
        logger: &'a Logger,
        ping_count: u32,
        ping_interval: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            logger,
            ping_count,
            ping_interval,
            request_timeout,
        }
    }

    /// Run every round trip, calling `on_trip(percent)` after each one.
    ///
    /// Failed trips are logged and left out of the statistics. Returns
    /// `NetworkUnavailable` when no trip succeeds and `Aborted` once the
    /// guard's token fires.
    pub async fn probe<F>(&self, guard: &PhaseGuard, mut on_trip: F) -> Result<LatencyResult>
    where
        F: FnMut(f64),
    {
        let total = self.ping_count as usize;
        let mut trips_ms = Vec::with_capacity(total);

        for trip in 1..=total {
            let started = Instant::now();
            match guard.bound(timeout(self.request_timeout, self.client.ping())).await {
                None => return Err(AppError::aborted()),
                Some(Ok(Ok(()))) => trips_ms.push(started.elapsed().as_secs_f64() * 1000.0),
                Some(Ok(Err(e))) => {
                    self.logger
                        .debug("Latency probe failed")
                        .field("trip", trip)
                        .error_info(&e)
                        .log()
                        .await;
                }
                Some(Err(_)) => {
                    self.logger
                        .debug("Latency probe timed out")
                        .field("trip", trip)
                        .field("timeout_ms", self.request_timeout.as_millis() as u64)
                        .log()
                        .await;
                }
            }

            on_trip(trip as f64 / total as f64 * 100.0);

            if trip < total && guard.bound(tokio::time::sleep(self.ping_interval)).await.is_none() {
                return Err(AppError::aborted());
            }
        }

        LatencyResult::from_trips(&trips_ms, total).ok_or_else(|| {
            AppError::network_unavailable(format!("All {} latency probes failed", total))
        })
    }
}
