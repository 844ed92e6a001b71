//! One pass over the monitor list

use tracing::{error, info, instrument, warn};

use super::{Scheduler, SchedulerState};

/// Outcome of a single cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Targets for which a fetch was issued
    pub attempted: usize,

    /// Snapshots the store accepted
    pub stored: usize,

    /// Targets whose core lookup failed
    pub fetch_failures: Vec<String>,

    /// Targets whose snapshot the store rejected
    pub storage_failures: Vec<String>,

    /// Interval read together with the list; `None` if the reload failed
    pub interval_minutes: Option<u64>,

    /// A stop request ended the cycle before the last target
    pub interrupted: bool,
}

impl Scheduler {
    /// Reload the list, then fetch and store each target in order.
    ///
    /// Individual failures are logged and recorded in the report; the cycle
    /// itself never fails.
    #[instrument(skip(self))]
    pub(crate) async fn run_cycle(&self) -> CycleReport {
        self.set_state(SchedulerState::Running);
        let mut report = CycleReport::default();

        let settings = match self.source.reload().await {
            Ok(settings) => settings,
            Err(e) => {
                error!("failed to reload monitor configuration: {e}");
                return report;
            }
        };
        report.interval_minutes = Some(settings.interval_minutes);

        if settings.targets.is_empty() {
            warn!("monitor list is empty, nothing to fetch");
            return report;
        }
        info!("starting cycle over {} targets", settings.targets.len());

        let total = settings.targets.len();
        for (index, target_id) in settings.targets.iter().enumerate() {
            if index > 0 && self.pause(self.options.target_pause).await {
                info!("stop requested, ending cycle after {index} of {total} targets");
                report.interrupted = true;
                break;
            }

            report.attempted += 1;
            let snapshot = match self.fetcher.fetch(target_id).await {
                Ok(snapshot) => snapshot,
                Err(failure) => {
                    error!("{failure}");
                    report.fetch_failures.push(target_id.clone());
                    continue;
                }
            };

            match self.store.append(snapshot).await {
                Ok(stored) => {
                    info!(
                        "stored {} ({}): views={} likes={} online={}",
                        stored.target_id,
                        stored.display_title(),
                        stored.views,
                        stored.likes,
                        stored.online_count
                    );
                    report.stored += 1;
                }
                Err(e) => {
                    warn!("failed to store snapshot for {target_id}: {e}");
                    report.storage_failures.push(target_id.clone());
                }
            }
        }

        info!(
            "cycle finished: {}/{} stored",
            report.stored, report.attempted
        );
        report
    }
}
