//! Fetch cycle scheduling
//!
//! The scheduler is a single logical task. It runs one cycle immediately and
//! then follows its [`RunMode`]. Fetches are strictly sequential; the pause
//! between targets is the rate limiter towards the remote API.
//!
//! ## State machine
//!
//! ```text
//! Idle ──► Running ──► Waiting ──► Running ──► ... ──► Stopped
//!             │                                          ▲
//!             └──────────── stop / count exhausted ──────┘
//! ```
//!
//! A stop request is observed between targets and while waiting. A fetch that
//! has already been issued always runs to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::fetcher::MetricsFetcher;
use crate::source::ConfigSource;
use crate::storage::StorageBackend;

mod cycle;

pub use cycle::CycleReport;

/// Fallback interval when the config can not be read during a periodic run
const FALLBACK_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Stand-in for waits that end beyond the clock's range
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn from_minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.max(1).saturating_mul(60))
}

/// `start + wait`, clamped to a far-future instant instead of overflowing
fn deadline(start: Instant, wait: Duration) -> Instant {
    start
        .checked_add(wait)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// How cycles are repeated after the first one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Exactly one cycle
    Once,

    /// Indefinitely; `None` re-reads the configured interval every cycle
    Periodic { interval: Option<Duration> },

    /// `count` cycles back-to-back, separated by the short burst pause
    Burst { count: u32 },

    /// `count` cycles, each followed by a wait of `interval`
    Bounded { count: u32, interval: Duration },
}

impl RunMode {
    /// Map the driver's command line onto a run mode.
    ///
    /// `once` wins over everything else. A count of zero is treated as one.
    pub fn from_args(interval_minutes: Option<u64>, count: Option<u32>, once: bool) -> Self {
        let interval = interval_minutes.map(from_minutes);
        match (once, interval, count) {
            (true, _, _) => RunMode::Once,
            (false, None, None) => RunMode::Periodic { interval: None },
            (false, Some(interval), None) => RunMode::Periodic {
                interval: Some(interval),
            },
            (false, None, Some(count)) => RunMode::Burst {
                count: count.max(1),
            },
            (false, Some(interval), Some(count)) => RunMode::Bounded {
                count: count.max(1),
                interval,
            },
        }
    }
}

/// Observable scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Waiting,
    Stopped,
}

/// Pauses used by the scheduler
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    /// Between two targets of one cycle
    pub target_pause: Duration,

    /// Between two cycles of a burst run
    pub burst_pause: Duration,

    /// Granularity of the wait loop in periodic mode
    pub poll_tick: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            target_pause: Duration::from_secs(1),
            burst_pause: Duration::from_secs(2),
            poll_tick: Duration::from_secs(1),
        }
    }
}

/// Totals over a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: usize,
    pub attempted: usize,
    pub stored: usize,
    pub fetch_failures: usize,
    pub storage_failures: usize,

    /// The run ended because of a stop request
    pub stopped: bool,
}

impl RunSummary {
    fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.attempted += report.attempted;
        self.stored += report.stored;
        self.fetch_failures += report.fetch_failures.len();
        self.storage_failures += report.storage_failures.len();
    }
}

/// Requests a running scheduler to stop
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

/// Resolves once a stop has been requested
async fn stop_signal(mut stop: watch::Receiver<bool>) {
    while !*stop.borrow_and_update() {
        if stop.changed().await.is_err() {
            // handle dropped without stopping; only the timer can end the pause
            std::future::pending::<()>().await;
        }
    }
}

/// Drives fetch cycles over the live target list
pub struct Scheduler {
    source: Arc<dyn ConfigSource>,
    fetcher: Arc<dyn MetricsFetcher>,
    store: Arc<dyn StorageBackend>,
    options: SchedulerOptions,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
    state_tx: watch::Sender<SchedulerState>,
}

impl Scheduler {
    pub fn new(
        source: Arc<dyn ConfigSource>,
        fetcher: Arc<dyn MetricsFetcher>,
        store: Arc<dyn StorageBackend>,
    ) -> Self {
        Self::with_options(source, fetcher, store, SchedulerOptions::default())
    }

    pub fn with_options(
        source: Arc<dyn ConfigSource>,
        fetcher: Arc<dyn MetricsFetcher>,
        store: Arc<dyn StorageBackend>,
        options: SchedulerOptions,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, _) = watch::channel(SchedulerState::Idle);
        Self {
            source,
            fetcher,
            store,
            options,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
            state_tx,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    /// Subscribe to state transitions
    pub fn state(&self) -> watch::Receiver<SchedulerState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: SchedulerState) {
        debug!("scheduler state: {state:?}");
        self.state_tx.send_replace(state);
    }

    fn stop_requested(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Sleep for `duration` unless a stop is requested first.
    ///
    /// Returns `true` if the scheduler should stop.
    async fn pause(&self, duration: Duration) -> bool {
        if self.stop_requested() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.stop_requested(),
            _ = stop_signal(self.stop_rx.clone()) => true,
        }
    }

    /// Wait until `next_fire`, waking every poll tick.
    ///
    /// Returns `true` if the scheduler should stop.
    async fn wait_until(&self, next_fire: Instant) -> bool {
        self.set_state(SchedulerState::Waiting);
        loop {
            let now = Instant::now();
            if now >= next_fire {
                return self.stop_requested();
            }
            let step = (next_fire - now).min(self.options.poll_tick);
            if self.pause(step).await {
                return true;
            }
        }
    }

    /// Run cycles according to `mode` until done or stopped.
    #[instrument(skip(self))]
    pub async fn run(&self, mode: RunMode) -> RunSummary {
        let mut summary = RunSummary::default();
        info!("scheduler started");

        match mode {
            RunMode::Once => {
                self.run_counted(&mut summary, 1, Duration::ZERO).await;
            }
            RunMode::Burst { count } => {
                self.run_counted(&mut summary, count, self.options.burst_pause)
                    .await;
            }
            RunMode::Bounded { count, interval } => {
                self.run_counted(&mut summary, count, interval).await;
            }
            RunMode::Periodic { interval } => {
                self.run_periodic(&mut summary, interval).await;
            }
        }

        if self.stop_requested() {
            summary.stopped = true;
        }
        self.set_state(SchedulerState::Stopped);
        info!(
            "scheduler stopped after {} cycles ({} stored, {} fetch failures, {} storage failures)",
            summary.cycles, summary.stored, summary.fetch_failures, summary.storage_failures
        );
        summary
    }

    async fn run_counted(&self, summary: &mut RunSummary, count: u32, gap: Duration) {
        for n in 1..=count {
            if self.stop_requested() {
                return;
            }
            debug!("cycle {n}/{count}");
            let report = self.run_cycle().await;
            summary.record(&report);
            if report.interrupted || n == count {
                return;
            }
            if self.wait_until(deadline(Instant::now(), gap)).await {
                return;
            }
        }
    }

    async fn run_periodic(&self, summary: &mut RunSummary, fixed: Option<Duration>) {
        let mut interval = fixed.unwrap_or(FALLBACK_INTERVAL);
        loop {
            if self.stop_requested() {
                return;
            }
            let cycle_start = Instant::now();
            let report = self.run_cycle().await;
            summary.record(&report);
            if report.interrupted {
                return;
            }

            if fixed.is_none()
                && let Some(configured) = report.interval_minutes
            {
                interval = from_minutes(configured);
            }
            let next_fire = deadline(cycle_start, interval);
            debug!("next cycle in {:?}", next_fire.saturating_duration_since(Instant::now()));

            if self.wait_until(next_fire).await {
                return;
            }
        }
    }
}
