//! Polling loop for fleettrack.
//!
//! The loop is the only source of periodic work: on a fixed period it
//! fetches the rider table and feeds it through the tracking session. A
//! tick that fails is logged and skipped; the loop never stops on a
//! transient failure and there is no backoff beyond the fixed period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::session::{TickSummary, TrackingSession};
use crate::source::FleetSource;

/// Default seconds between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// A handle to cancel a running polling loop.
///
/// Lightweight and cloneable; any clone can stop the loop. Stopping is
/// idempotent: repeated cancellation is a safe no-op.
#[derive(Debug, Clone, Default)]
pub struct PollerHandle {
    stop_signal: Arc<AtomicBool>,
}

impl PollerHandle {
    /// Create a new handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the loop to stop after its current tick.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }
}

/// Fixed-period polling loop driving a [`TrackingSession`].
#[derive(Debug)]
pub struct PollingLoop {
    interval: Duration,
    max_ticks: Option<u64>,
    handle: PollerHandle,
}

impl PollingLoop {
    /// Create a loop with the given poll period.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_ticks: None,
            handle: PollerHandle::new(),
        }
    }

    /// Stop the loop after this many ticks (attempted, failed ones
    /// included) instead of running until cancelled.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// The cancellation handle for this loop.
    #[must_use]
    pub fn handle(&self) -> PollerHandle {
        self.handle.clone()
    }

    /// Run one tick: fetch rider rows and parcel aggregates, and apply
    /// them to the session.
    ///
    /// The rider fetch comes first; when it fails the tick is skipped
    /// entirely (`None`, session untouched) and the failure is logged.
    /// The parcel fetch covers the tick's rider set from the start of the
    /// current local day; when it fails the rider tick still counts and
    /// the session keeps its previous tallies.
    pub async fn tick(
        source: &dyn FleetSource,
        session: &mut TrackingSession,
    ) -> Option<TickSummary> {
        let rows = match source.list_riders().await {
            Ok(rows) => rows,
            Err(err) => {
                warn!("poll tick skipped: {err}");
                return None;
            }
        };
        let summary = session.apply_tick(&rows, Utc::now());

        let rider_keys: Vec<String> = session
            .snapshots()
            .iter()
            .map(|s| s.rider_key.clone())
            .collect();
        let today = Local::now().date_naive();
        let since = today
            .and_time(NaiveTime::MIN)
            .and_local_timezone(Local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc));
        match source.list_parcels(Some(&rider_keys), since).await {
            Ok(parcels) => session.apply_parcels(&parcels, today),
            Err(err) => warn!("parcel aggregates skipped: {err}"),
        }

        Some(summary)
    }

    /// Drive the session until the handle is stopped or the tick limit
    /// is reached.
    ///
    /// Each period one tick runs; failed ticks are absorbed and the loop
    /// resumes on the next scheduled tick. Missed ticks are delayed, not
    /// bursted.
    pub async fn run(&self, source: &dyn FleetSource, session: &mut TrackingSession) {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "polling started");

        let mut ticks_run: u64 = 0;
        loop {
            if self.max_ticks.is_some_and(|max| ticks_run >= max) {
                break;
            }
            timer.tick().await;
            if self.handle.should_stop() {
                break;
            }
            if let Some(summary) = Self::tick(source, session).await {
                debug!(seq = summary.seq, "tick complete");
            }
            ticks_run += 1;
            if self.handle.should_stop() {
                break;
            }
        }
        info!("polling stopped");
    }
}
