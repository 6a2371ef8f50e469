use crate::config::SchedulerConfig;
use crate::fetcher::GitHubFeedFetcher;
use crate::models::JobOutcome;
use chrono::Utc;
use event_store::EventStore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

/// Capacity of the job outcome channel; slow subscribers lose the oldest outcomes
const OUTCOME_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Scheduler is already running")]
    AlreadyRunning,

    #[error("Scheduler is not running")]
    NotRunning,

    #[error("Scheduler interval must be greater than 0")]
    ZeroInterval,
}

/// Everything a tick needs, cloned into the timer task and each job task
#[derive(Clone)]
struct JobContext {
    fetcher: Arc<GitHubFeedFetcher>,
    store: Arc<dyn EventStore>,
    outcomes: broadcast::Sender<JobOutcome>,
    in_flight: Arc<AtomicBool>,
    next_job_id: Arc<AtomicU64>,
}

struct RunningTimer {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Drives periodic ingestion against a shared event store.
///
/// Overlap policy is skip-if-busy: a tick that fires while the previous job is
/// still running is reported as [`JobOutcome::Skipped`] and does nothing.
pub struct IngestionScheduler {
    config: SchedulerConfig,
    context: JobContext,
    timer: Mutex<Option<RunningTimer>>,
}

impl IngestionScheduler {
    /// Create a new scheduler in the Stopped state
    pub fn new(
        config: SchedulerConfig,
        fetcher: Arc<GitHubFeedFetcher>,
        store: Arc<dyn EventStore>,
    ) -> Self {
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);

        Self {
            config,
            context: JobContext {
                fetcher,
                store,
                outcomes,
                in_flight: Arc::new(AtomicBool::new(false)),
                next_job_id: Arc::new(AtomicU64::new(1)),
            },
            timer: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.timer.lock().is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    /// Whether an ingestion job is currently running
    pub fn is_busy(&self) -> bool {
        self.context.in_flight.load(Ordering::SeqCst)
    }

    /// Receive the outcome of every tick from now on
    pub fn subscribe(&self) -> broadcast::Receiver<JobOutcome> {
        self.context.outcomes.subscribe()
    }

    /// Stopped → Running. Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut timer = self.timer.lock();
        if timer.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        if self.config.interval_ms == 0 {
            return Err(SchedulerError::ZeroInterval);
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let context = self.context.clone();
        let config = self.config.clone();
        let handle = tokio::spawn(async move {
            Self::run_timer(context, config, shutdown_rx).await;
        });

        *timer = Some(RunningTimer { shutdown, handle });
        info!("Ingestion scheduler started, interval {:?}", self.config.interval());
        Ok(())
    }

    /// Running → Stopped. No further ticks fire; a job already in flight runs
    /// to completion.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let running = self.timer.lock().take().ok_or(SchedulerError::NotRunning)?;

        let _ = running.shutdown.send(true);
        if let Err(e) = running.handle.await {
            error!("Ingestion timer task ended abnormally: {}", e);
        }

        info!("Ingestion scheduler stopped");
        Ok(())
    }

    async fn run_timer(
        context: JobContext,
        config: SchedulerConfig,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let period = config.interval();
        let first_tick =
            if config.run_on_start { Instant::now() } else { Instant::now() + period };

        let mut ticker = interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    Self::dispatch(&context);
                }
            }
        }

        info!("Ingestion timer loop exited");
    }

    /// Launch one ingestion job on its own task, unless one is still running
    fn dispatch(context: &JobContext) {
        let job_id = context.next_job_id.fetch_add(1, Ordering::SeqCst);

        if context.in_flight.swap(true, Ordering::SeqCst) {
            warn!("Job {} skipped: previous ingestion still in flight", job_id);
            let _ = context.outcomes.send(JobOutcome::Skipped { job_id, at: Utc::now() });
            return;
        }

        let context = context.clone();
        tokio::spawn(async move {
            let job = {
                let context = context.clone();
                tokio::spawn(async move {
                    context.fetcher.run_ingestion(context.store.as_ref()).await
                })
            };

            let outcome = match job.await {
                Ok(Ok(report)) => {
                    info!("Job {} completed successfully, stored {} events", job_id, report.stored);
                    JobOutcome::Succeeded { job_id, report, finished_at: Utc::now() }
                }
                Ok(Err(e)) => {
                    error!("Job {} failed: {}", job_id, e);
                    JobOutcome::Failed { job_id, error: e.to_string(), finished_at: Utc::now() }
                }
                Err(e) => {
                    error!("Job {} panicked: {}", job_id, e);
                    JobOutcome::Failed { job_id, error: e.to_string(), finished_at: Utc::now() }
                }
            };

            context.in_flight.store(false, Ordering::SeqCst);
            let _ = context.outcomes.send(outcome);
        });
    }
}
