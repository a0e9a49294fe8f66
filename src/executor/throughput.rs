//! Download and upload throughput samplers
//!
//! A phase spawns a fixed number of workers that hammer the sink until the
//! window elapses or the phase token fires, crediting every byte they move
//! to a [`SharedCounter`]. Meanwhile the [`ProgressClock`] samples the counter
//! in the calling task. A failed request never ends a phase: the worker backs
//! off briefly and tries again.

use super::clock::ProgressClock;
use super::phase::{PhaseGuard, SharedCounter};
use crate::{
    client::TransferClient,
    error::{AppError, Result},
    logging::Logger,
    models::{Sample, ThroughputResult, TransferDirection},
};
use bytes::Bytes;
use futures::future::join_all;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;

/// Floor for the retry backoff so a sink that fails instantly cannot spin a worker
const MIN_RETRY_BACKOFF: Duration = Duration::from_millis(1);

/// Tuning of one throughput phase
#[derive(Debug, Clone)]
pub struct SamplerSettings {
    pub window: Duration,
    pub workers: usize,
    /// Bound on each await of a transfer: response head, stream chunk or whole upload
    pub request_timeout: Duration,
    pub retry_backoff: Duration,
    /// Download request size, or upload payload size
    pub transfer_bytes: u64,
    pub progress_interval: Duration,
}

/// What a worker does with each request
#[derive(Clone)]
enum Transfer {
    Download { bytes: u64 },
    Upload { payload: Bytes },
}

enum Attempt {
    Finished,
    Stopped,
}

#[derive(Clone)]
struct Worker {
    id: usize,
    client: Arc<dyn TransferClient>,
    logger: Arc<Logger>,
    counter: SharedCounter,
    guard: PhaseGuard,
    transfer: Transfer,
    request_timeout: Duration,
    retry_backoff: Duration,
}

impl Worker {
    async fn run(self) {
        while !self.guard.is_done() {
            let attempt = match &self.transfer {
                Transfer::Download { bytes } => self.download_once(*bytes).await,
                Transfer::Upload { payload } => self.upload_once(payload.clone()).await,
            };

            match attempt {
                Ok(Attempt::Finished) => {}
                Ok(Attempt::Stopped) => return,
                Err(e) => {
                    self.logger
                        .debug("Transfer request failed, retrying")
                        .field("worker", self.id)
                        .error_info(&e)
                        .log()
                        .await;

                    if self.guard.bound(tokio::time::sleep(self.retry_backoff)).await.is_none() {
                        return;
                    }
                }
            }
        }
    }

    /// One bounded download, counting each chunk as it arrives
    async fn download_once(&self, bytes: u64) -> Result<Attempt> {
        let opened = match self
            .guard
            .bound(timeout(self.request_timeout, self.client.open_download(bytes)))
            .await
        {
            None => return Ok(Attempt::Stopped),
            Some(opened) => opened,
        };

        let mut stream = opened.map_err(|_| {
            AppError::timeout(format!("No response within {}ms", self.request_timeout.as_millis()))
        })??;

        loop {
            match self.guard.bound(timeout(self.request_timeout, stream.next())).await {
                None => return Ok(Attempt::Stopped),
                Some(Err(_)) => {
                    return Err(AppError::timeout(format!(
                        "Download stalled for {}ms",
                        self.request_timeout.as_millis()
                    )))
                }
                Some(Ok(None)) => return Ok(Attempt::Finished),
                Some(Ok(Some(chunk))) => self.counter.add(chunk?.len() as u64),
            }
        }
    }

    /// One upload, credited only once the sink accepted it
    async fn upload_once(&self, payload: Bytes) -> Result<Attempt> {
        let size = payload.len() as u64;
        match self
            .guard
            .bound(timeout(self.request_timeout, self.client.upload(payload)))
            .await
        {
            None => Ok(Attempt::Stopped),
            Some(Err(_)) => Err(AppError::timeout(format!(
                "Upload not acknowledged within {}ms",
                self.request_timeout.as_millis()
            ))),
            Some(Ok(result)) => {
                result?;
                self.counter.add(size);
                Ok(Attempt::Finished)
            }
        }
    }
}

/// Runs one throughput phase in a given direction
pub struct ThroughputSampler {
    direction: TransferDirection,
    settings: SamplerSettings,
}

impl ThroughputSampler {
    pub fn new(direction: TransferDirection, settings: SamplerSettings) -> Self {
        Self { direction, settings }
    }

    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    fn transfer(&self) -> Transfer {
        match self.direction {
            TransferDirection::Download => Transfer::Download {
                bytes: self.settings.transfer_bytes,
            },
            // Built once per phase; workers share it by reference count
            TransferDirection::Upload => Transfer::Upload {
                payload: Bytes::from(vec![b'A'; self.settings.transfer_bytes as usize]),
            },
        }
    }

    /// Measure until the window elapses or `parent` is cancelled.
    ///
    /// `on_tick(rate, percent, samples)` is called on every clock tick. On
    /// cancellation the partial result travels inside `AppError::Aborted`.
    pub async fn run<F>(
        &self,
        client: Arc<dyn TransferClient>,
        logger: Arc<Logger>,
        parent: &CancellationToken,
        on_tick: F,
    ) -> Result<ThroughputResult>
    where
        F: FnMut(f64, f64, &[Sample]),
    {
        if parent.is_cancelled() {
            return Err(AppError::aborted());
        }

        let settings = &self.settings;
        let token = parent.child_token();
        // Cancels the workers if this future is dropped before they are joined
        let stop_workers = token.clone().drop_guard();
        let counter = SharedCounter::new();
        let started = Instant::now();
        let guard = PhaseGuard::new(token.clone(), Some(started + settings.window));

        let template = Worker {
            id: 0,
            client,
            logger,
            counter: counter.clone(),
            guard,
            transfer: self.transfer(),
            request_timeout: settings.request_timeout,
            retry_backoff: settings.retry_backoff.max(MIN_RETRY_BACKOFF),
        };

        let handles: Vec<_> = (0..settings.workers)
            .map(|id| {
                let worker = Worker { id, ..template.clone() };
                tokio::spawn(worker.run())
            })
            .collect();
        drop(template);

        let clock = ProgressClock::new(settings.progress_interval, settings.window);
        let samples = clock.run(&counter, &token, started, on_tick).await;

        // Release any worker still waiting on the network
        drop(stop_workers);
        for joined in join_all(handles).await {
            if let Err(e) = joined {
                if e.is_panic() {
                    return Err(AppError::internal(format!("{} worker panicked: {}", self.direction, e)));
                }
            }
        }

        // Actual wall-clock time, which may run past the window while workers wind down
        let elapsed = started.elapsed();
        let result = ThroughputResult::from_totals(
            self.direction,
            counter.load(),
            elapsed.as_secs_f64() * 1000.0,
            samples,
        );

        if parent.is_cancelled() {
            Err(AppError::aborted_with(result))
        } else {
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ByteStream;
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Download serves fixed chunks with a pause between them; upload
    /// succeeds after a pause. `fail` turns every request into an error.
    struct PacedSink {
        chunk: usize,
        pause: Duration,
        fail: bool,
        requests: AtomicUsize,
    }

    impl PacedSink {
        fn new(chunk: usize, pause_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                chunk,
                pause: Duration::from_millis(pause_ms),
                fail: false,
                requests: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                chunk: 0,
                pause: Duration::ZERO,
                fail: true,
                requests: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TransferClient for PacedSink {
        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        async fn open_download(&self, bytes: u64) -> Result<ByteStream> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::transfer_failed("sink down"));
            }
            let chunk = self.chunk;
            let pause = self.pause;
            let count = (bytes as usize).div_ceil(chunk);
            Ok(stream::iter(0..count)
                .then(move |_| async move {
                    tokio::time::sleep(pause).await;
                    Ok::<_, AppError>(Bytes::from(vec![0u8; chunk]))
                })
                .boxed())
        }

        async fn upload(&self, _payload: Bytes) -> Result<()> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.pause).await;
            if self.fail {
                Err(AppError::transfer_failed("sink down"))
            } else {
                Ok(())
            }
        }
    }

    fn settings(window_ms: u64, workers: usize, transfer_bytes: u64) -> SamplerSettings {
        SamplerSettings {
            window: Duration::from_millis(window_ms),
            workers,
            request_timeout: Duration::from_millis(500),
            retry_backoff: Duration::from_millis(10),
            transfer_bytes,
            progress_interval: Duration::from_millis(16),
        }
    }

    #[tokio::test]
    async fn test_download_counts_streamed_bytes() {
        let sink = PacedSink::new(10_000, 2);
        let sampler = ThroughputSampler::new(TransferDirection::Download, settings(250, 2, 100_000));

        let result = sampler
            .run(sink.clone(), Arc::new(Logger::silent("TEST")), &CancellationToken::new(), |_, _, _| {})
            .await
            .unwrap();

        assert!(result.bytes_transferred > 0);
        assert_eq!(result.bytes_transferred % 10_000, 0);
        assert!(result.elapsed_ms >= 250.0 && result.elapsed_ms < 1000.0);
        let expected = result.bytes_transferred as f64 * 8.0 / (result.elapsed_ms / 1000.0) / 1e6;
        assert!((result.mbps - expected).abs() < 1e-9);
        assert!(!result.samples.is_empty());
        // Each request is 10 chunks of 2ms, so workers must have started new ones
        assert!(sink.requests.load(Ordering::SeqCst) > 2);
    }

    #[tokio::test]
    async fn test_failing_sink_yields_zero_at_window() {
        let sink = PacedSink::failing();
        let sampler = ThroughputSampler::new(TransferDirection::Download, settings(200, 4, 1_000));

        let started = Instant::now();
        let result = sampler
            .run(sink.clone(), Arc::new(Logger::silent("TEST")), &CancellationToken::new(), |_, _, _| {})
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(200));
        assert_eq!(result.mbps, 0.0);
        assert!(result.is_zero());
        // Workers retried after backing off
        assert!(sink.requests.load(Ordering::SeqCst) > 4);
    }

    #[tokio::test]
    async fn test_upload_credits_completed_payloads() {
        let sink = PacedSink::new(0, 20);
        let sampler = ThroughputSampler::new(TransferDirection::Upload, settings(200, 2, 4_096));

        let result = sampler
            .run(sink.clone(), Arc::new(Logger::silent("TEST")), &CancellationToken::new(), |_, _, _| {})
            .await
            .unwrap();

        assert_eq!(result.direction, TransferDirection::Upload);
        assert_eq!(result.bytes_transferred % 4_096, 0);
        assert!(result.bytes_transferred >= 4_096);
        let started = sink.requests.load(Ordering::SeqCst) as u64;
        assert!(result.bytes_transferred / 4_096 <= started);
    }

    #[tokio::test]
    async fn test_failed_uploads_are_not_credited() {
        let sink = PacedSink::failing();
        let sampler = ThroughputSampler::new(TransferDirection::Upload, settings(150, 2, 1_024));

        let result = sampler
            .run(sink, Arc::new(Logger::silent("TEST")), &CancellationToken::new(), |_, _, _| {})
            .await
            .unwrap();
        assert_eq!(result.bytes_transferred, 0);
        assert_eq!(result.mbps, 0.0);
    }

    #[tokio::test]
    async fn test_cancel_returns_partial_result_promptly() {
        let sink = PacedSink::new(10_000, 5);
        let sampler = ThroughputSampler::new(TransferDirection::Download, settings(8_000, 4, 25_000_000));
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });

        let started = Instant::now();
        let error = sampler
            .run(sink, Arc::new(Logger::silent("TEST")), &token, |_, _, _| {})
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_millis(600));
        let partial = error.partial_throughput().expect("partial figure");
        assert!(partial.bytes_transferred > 0);
        assert!(partial.elapsed_ms < 600.0);
    }

    #[tokio::test]
    async fn test_pre_cancelled_parent_sends_nothing() {
        let sink = PacedSink::new(1_000, 1);
        let sampler = ThroughputSampler::new(TransferDirection::Upload, settings(1_000, 4, 1_000));
        let token = CancellationToken::new();
        token.cancel();

        let error = sampler
            .run(sink.clone(), Arc::new(Logger::silent("TEST")), &token, |_, _, _| {})
            .await
            .unwrap_err();

        assert!(error.is_abort());
        assert_eq!(sink.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dropped_run_stops_its_workers() {
        let sink = PacedSink::new(10_000, 5);
        let sampler = ThroughputSampler::new(TransferDirection::Download, settings(8_000, 3, 20_000));
        let parent = CancellationToken::new();

        let run = sampler.run(sink.clone(), Arc::new(Logger::silent("TEST")), &parent, |_, _, _| {});
        assert!(timeout(Duration::from_millis(60), run).await.is_err());

        // Requests take 10ms each, so live workers would keep adding to the count
        tokio::time::sleep(Duration::from_millis(30)).await;
        let after = sink.requests.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.requests.load(Ordering::SeqCst), after);
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_progress_reaches_full_window() {
        let sink = PacedSink::new(5_000, 1);
        let sampler = ThroughputSampler::new(TransferDirection::Download, settings(150, 1, 50_000));

        let mut percents = Vec::new();
        sampler
            .run(sink, Arc::new(Logger::silent("TEST")), &CancellationToken::new(), |_, percent, _| {
                percents.push(percent)
            })
            .await
            .unwrap();

        assert_eq!(percents.last().copied(), Some(100.0));
        assert!(percents.windows(2).all(|w| w[1] >= w[0]));
    }
}
