//! Speed test engine: latency probe, throughput phases and their lifecycle
//!
//! The engine owns the transfer client, one cancellation token for its whole
//! lifetime, and the state machine that keeps phases in order:
//!
//! - `Idle -> ProbingLatency -> MeasuringDownload -> MeasuringUpload -> Complete`
//! - phases may be skipped but never repeated or reversed
//! - `abort()` cancels the token; every running or later operation then
//!   reports `Aborted`

pub mod clock;
pub mod latency;
pub mod phase;
pub mod throughput;

pub use clock::ProgressClock;
pub use latency::LatencyProber;
pub use phase::{PhaseGuard, SharedCounter};
pub use throughput::{SamplerSettings, ThroughputSampler};

use crate::{
    client::{ClientFactory, TransferClient},
    defaults,
    error::{AppError, Result},
    logging::Logger,
    models::{Config, LatencyResult, Sample, SpeedTestReport, ThroughputResult, TransferDirection},
    types::{EngineState, Phase},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Tuning of a speed test run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub ping_count: u32,
    pub ping_interval: Duration,
    pub download_window: Duration,
    pub upload_window: Duration,
    pub download_workers: usize,
    pub upload_workers: usize,
    pub download_request_bytes: u64,
    pub upload_payload_bytes: u64,
    /// Bound on pings, download response heads and each download chunk
    pub request_timeout: Duration,
    /// Bound on one whole upload request
    pub upload_timeout: Duration,
    pub retry_backoff: Duration,
    pub progress_interval: Duration,
    /// Phases `run_all` includes
    pub measure_download: bool,
    pub measure_upload: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ping_count: defaults::DEFAULT_PING_COUNT,
            ping_interval: defaults::DEFAULT_PING_INTERVAL,
            download_window: defaults::DEFAULT_DOWNLOAD_WINDOW,
            upload_window: defaults::DEFAULT_UPLOAD_WINDOW,
            download_workers: defaults::DEFAULT_WORKERS,
            upload_workers: defaults::DEFAULT_WORKERS,
            download_request_bytes: defaults::DEFAULT_DOWNLOAD_REQUEST_BYTES,
            upload_payload_bytes: defaults::DEFAULT_UPLOAD_PAYLOAD_BYTES as u64,
            request_timeout: defaults::DEFAULT_REQUEST_TIMEOUT,
            upload_timeout: defaults::DEFAULT_UPLOAD_TIMEOUT,
            retry_backoff: defaults::DEFAULT_RETRY_BACKOFF,
            progress_interval: defaults::DEFAULT_PROGRESS_INTERVAL,
            measure_download: true,
            measure_upload: true,
        }
    }
}

impl From<&Config> for EngineConfig {
    fn from(config: &Config) -> Self {
        Self {
            ping_count: config.ping_count,
            ping_interval: Duration::from_millis(config.ping_interval_ms),
            download_window: config.download_window(),
            upload_window: config.upload_window(),
            download_workers: config.workers,
            upload_workers: config.workers,
            download_request_bytes: config.download_request_bytes,
            upload_payload_bytes: config.upload_payload_bytes as u64,
            request_timeout: config.request_timeout(),
            upload_timeout: Duration::from_millis(config.upload_timeout_ms),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            progress_interval: Duration::from_millis(config.progress_interval_ms),
            measure_download: !config.skip_download,
            measure_upload: !config.skip_upload,
        }
    }
}

impl EngineConfig {
    fn sampler(&self, direction: TransferDirection) -> ThroughputSampler {
        let settings = match direction {
            TransferDirection::Download => SamplerSettings {
                window: self.download_window,
                workers: self.download_workers,
                request_timeout: self.request_timeout,
                retry_backoff: self.retry_backoff,
                transfer_bytes: self.download_request_bytes,
                progress_interval: self.progress_interval,
            },
            TransferDirection::Upload => SamplerSettings {
                window: self.upload_window,
                workers: self.upload_workers,
                request_timeout: self.upload_timeout,
                retry_backoff: self.retry_backoff,
                transfer_bytes: self.upload_payload_bytes,
                progress_interval: self.progress_interval,
            },
        };
        ThroughputSampler::new(direction, settings)
    }
}

/// One progress notification
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent<'a> {
    pub phase: Phase,
    /// Cumulative average rate so far (0 during the latency probe)
    pub rate_mbps: f64,
    /// Completion of the current phase, 0..=100
    pub percent: f64,
    /// Every sample of the current phase so far (empty during the latency probe)
    pub samples: &'a [Sample],
}

/// Progress callback invoked from the engine's task
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent<'_>) + Send + Sync>;

#[derive(Debug)]
struct Lifecycle {
    state: EngineState,
    busy: bool,
}

/// Exclusive hold on the engine for one running operation
///
/// Dropping the claim releases the engine. When the operation's future is
/// dropped before it settles, the engine keeps the abandoned phase as its
/// last state, so later phases may still run.
struct PhaseClaim<'a> {
    lifecycle: &'a Mutex<Lifecycle>,
}

impl PhaseClaim<'_> {
    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        lock_lifecycle(self.lifecycle)
    }
}

impl Drop for PhaseClaim<'_> {
    fn drop(&mut self) {
        self.lock().busy = false;
    }
}

fn lock_lifecycle(lifecycle: &Mutex<Lifecycle>) -> MutexGuard<'_, Lifecycle> {
    // The lock is never held across an await or user code, so poisoning
    // cannot leave the state half-updated.
    lifecycle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs latency, download and upload measurements against one sink
pub struct SpeedTestEngine {
    config: EngineConfig,
    client: Arc<dyn TransferClient>,
    logger: Arc<Logger>,
    on_progress: ProgressCallback,
    token: CancellationToken,
    lifecycle: Mutex<Lifecycle>,
}

impl SpeedTestEngine {
    /// Create an engine with a silent logger and no progress callback
    pub fn new(config: EngineConfig, client: Arc<dyn TransferClient>) -> Self {
        Self {
            config,
            client,
            logger: Arc::new(Logger::silent("ENGINE")),
            on_progress: Arc::new(|_: &ProgressEvent<'_>| {}),
            token: CancellationToken::new(),
            lifecycle: Mutex::new(Lifecycle {
                state: EngineState::Idle,
                busy: false,
            }),
        }
    }

    /// Create an engine talking HTTP to the sinks named in `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = ClientFactory::create(config)?;
        Ok(Self::new(EngineConfig::from(config), client))
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ProgressEvent<'_>) + Send + Sync + 'static,
    {
        self.on_progress = Arc::new(callback);
        self
    }

    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current lifecycle state; always `Aborted` once `abort()` was called
    pub fn state(&self) -> EngineState {
        if self.token.is_cancelled() {
            return EngineState::Aborted;
        }
        self.lifecycle().state
    }

    /// Cancel whatever is running and everything that follows. Idempotent.
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Token cancelled by `abort()`; useful to tie other tasks to the engine
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Measure minimum round-trip time and jitter
    pub async fn probe_latency(&self) -> Result<LatencyResult> {
        let claim = self.begin(EngineState::ProbingLatency)?;

        let operation = self.logger.start_operation("latency probe").await;
        let prober = LatencyProber::new(
            self.client.as_ref(),
            self.logger.as_ref(),
            self.config.ping_count,
            self.config.ping_interval,
            self.config.request_timeout,
        );
        let guard = PhaseGuard::unbounded(self.token.child_token());
        let result = prober
            .probe(&guard, |percent| {
                (self.on_progress)(&ProgressEvent {
                    phase: Phase::Latency,
                    rate_mbps: 0.0,
                    percent,
                    samples: &[],
                })
            })
            .await;

        if let Ok(latency) = &result {
            self.logger
                .info("Latency measured")
                .correlation_id(&operation)
                .latency(latency)
                .log()
                .await;
        }
        self.finish(claim, &operation, "latency probe", result).await
    }

    /// Measure sustained download throughput over the download window
    pub async fn measure_download(&self) -> Result<ThroughputResult> {
        self.measure(TransferDirection::Download).await
    }

    /// Measure sustained upload throughput over the upload window
    pub async fn measure_upload(&self) -> Result<ThroughputResult> {
        self.measure(TransferDirection::Upload).await
    }

    /// Run the latency probe followed by the configured throughput phases
    pub async fn run_all(&self) -> Result<SpeedTestReport> {
        let started_at = Utc::now();

        let latency = self.probe_latency().await?;
        let download = if self.config.measure_download {
            Some(self.measure_download().await?)
        } else {
            None
        };
        let upload = if self.config.measure_upload {
            Some(self.measure_upload().await?)
        } else {
            None
        };

        // Every phase it ran succeeded; an abort arriving now has nothing left to stop
        self.lifecycle().state = EngineState::Complete;

        Ok(SpeedTestReport::new(latency, download, upload, started_at))
    }

    async fn measure(&self, direction: TransferDirection) -> Result<ThroughputResult> {
        let phase = match direction {
            TransferDirection::Download => Phase::Download,
            TransferDirection::Upload => Phase::Upload,
        };
        let claim = self.begin(phase.state())?;

        let operation = self.logger.start_operation(&format!("{} phase", direction)).await;
        let sampler = self.config.sampler(direction);
        let result = sampler
            .run(self.client.clone(), self.logger.clone(), &self.token, |rate_mbps, percent, samples| {
                (self.on_progress)(&ProgressEvent {
                    phase,
                    rate_mbps,
                    percent,
                    samples,
                })
            })
            .await;

        match &result {
            Ok(throughput) => {
                self.logger
                    .info(&format!("{} measured", phase.label()))
                    .correlation_id(&operation)
                    .throughput(throughput)
                    .log()
                    .await;
            }
            Err(e) => {
                if let Some(partial) = e.partial_throughput() {
                    self.logger
                        .info(&format!("{} aborted", phase.label()))
                        .correlation_id(&operation)
                        .throughput(partial)
                        .log()
                        .await;
                }
            }
        }

        self.finish(claim, &operation, &format!("{} phase", direction), result).await
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        lock_lifecycle(&self.lifecycle)
    }

    /// Claim the engine for the phase running in `next`
    fn begin(&self, next: EngineState) -> Result<PhaseClaim<'_>> {
        if self.token.is_cancelled() {
            return Err(AppError::aborted());
        }

        let mut lifecycle = self.lifecycle();
        if lifecycle.busy {
            return Err(AppError::invalid_state(format!(
                "cannot start {} while {} is still running",
                next, lifecycle.state
            )));
        }
        if !lifecycle.state.can_enter(next) {
            return Err(AppError::invalid_state(format!(
                "cannot start {} after {}",
                next, lifecycle.state
            )));
        }

        lifecycle.state = next;
        lifecycle.busy = true;
        Ok(PhaseClaim {
            lifecycle: &self.lifecycle,
        })
    }

    /// Settle the state from the phase outcome and release the engine
    async fn finish<T>(
        &self,
        claim: PhaseClaim<'_>,
        operation: &str,
        name: &str,
        result: Result<T>,
    ) -> Result<T> {
        {
            let mut lifecycle = claim.lock();
            match &result {
                Ok(_) if lifecycle.state == EngineState::MeasuringUpload => {
                    lifecycle.state = EngineState::Complete;
                }
                Ok(_) => {}
                Err(e) if e.is_abort() => lifecycle.state = EngineState::Aborted,
                Err(_) => lifecycle.state = EngineState::Failed,
            }
        }
        drop(claim);

        if let Err(e) = &result {
            if !e.is_abort() {
                self.logger
                    .warn(&format!("{} failed", name))
                    .correlation_id(operation)
                    .error_info(e)
                    .log()
                    .await;
            }
        }
        self.logger.end_operation(operation, name, result.is_ok()).await;

        result
    }
}

impl Drop for SpeedTestEngine {
    fn drop(&mut self) {
        // Stops any worker tasks still running for this engine
        self.token.cancel();
    }
}
