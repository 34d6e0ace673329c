//! Tracking session for fleettrack.
//!
//! A [`TrackingSession`] owns the position store, trail history, activity
//! feed, and every mounted map surface for the lifetime of the tracking
//! view. The polling loop feeds it ticks; within one tick the pipeline runs
//! in a fixed order: position diffing, then trail/activity derivation, then
//! surface reconciliation. Surfaces never observe a half-updated tick.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::activity::{ActivityFeed, ActivityFeedRow};
use crate::position::PositionStore;
use crate::quota::{delivered_today_by_rider, ParcelRow, QuotaState};
use crate::rider::{RiderRow, RiderSnapshot};
use crate::surface::{FocusOutcome, MapSurfaceController, SurfaceKind};
use crate::trail::TrailBuilder;

/// What one applied tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// Sequence number of this tick (1-based, monotonic per session).
    pub seq: u64,
    /// Riders present in this tick's snapshot set.
    pub rider_count: usize,
    /// Riders whose position changed since the previous tick.
    pub moved_count: usize,
    /// Focus instructions consumed by surfaces during this tick, keyed by
    /// surface id.
    pub focus_outcomes: Vec<(String, FocusOutcome)>,
}

/// Owner of all live-tracking state for one tracking view.
///
/// Created when the view mounts, dropped when it unmounts. The session is
/// the single writer of position/trail/activity state; surfaces only read.
#[derive(Debug, Default)]
pub struct TrackingSession {
    positions: PositionStore,
    trails: TrailBuilder,
    activity: ActivityFeed,
    surfaces: HashMap<String, MapSurfaceController>,
    last_snapshots: Vec<RiderSnapshot>,
    parcel_tallies: HashMap<String, u32>,
    tick_seq: u64,
}

impl TrackingSession {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a surface under an id, replacing (and unmounting) any
    /// surface previously registered under the same id.
    pub fn add_surface(&mut self, id: &str, kind: SurfaceKind) -> &mut MapSurfaceController {
        if let Some(mut old) = self
            .surfaces
            .insert(id.to_string(), MapSurfaceController::new(kind))
        {
            old.unmount();
        }
        self.surfaces
            .get_mut(id)
            .expect("surface was just inserted")
    }

    /// Borrow a registered surface.
    pub fn surface_mut(&mut self, id: &str) -> Option<&mut MapSurfaceController> {
        self.surfaces.get_mut(id)
    }

    /// Unmount and drop a registered surface.
    pub fn remove_surface(&mut self, id: &str) {
        if let Some(mut surface) = self.surfaces.remove(id) {
            surface.unmount();
        }
    }

    /// Number of registered surfaces.
    #[must_use]
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Apply one poll tick's raw rider rows.
    ///
    /// Runs the ordered pipeline: position diff, trail growth, activity
    /// events, then a reconcile of every mounted surface against the new
    /// snapshot set.
    pub fn apply_tick(&mut self, rows: &[RiderRow], now: DateTime<Utc>) -> TickSummary {
        self.tick_seq += 1;
        let seq = self.tick_seq;
        debug!(seq, rows = rows.len(), "tick start");

        let outcome = self.positions.ingest(rows);
        self.trails.record_tick(&outcome.snapshots);
        self.activity.record_moved(&outcome.moved, now);

        let mut focus_outcomes = Vec::new();
        for (id, surface) in &mut self.surfaces {
            if let Some(focus) = surface.reconcile(&outcome.snapshots, &self.trails) {
                focus_outcomes.push((id.clone(), focus));
            }
        }

        let summary = TickSummary {
            seq,
            rider_count: outcome.snapshots.len(),
            moved_count: outcome.moved.len(),
            focus_outcomes,
        };
        self.last_snapshots = outcome.snapshots;
        info!(
            seq,
            riders = summary.rider_count,
            moved = summary.moved_count,
            "tick applied"
        );
        summary
    }

    /// Replace the per-rider delivered-today tallies from a parcel
    /// aggregate fetch.
    ///
    /// The polling loop calls this with the parcels for the tick's rider
    /// set. When a parcel fetch fails the loop skips the call, so the
    /// previous tallies stay in place until the next successful fetch.
    pub fn apply_parcels(&mut self, parcels: &[ParcelRow], today: NaiveDate) {
        self.parcel_tallies = delivered_today_by_rider(parcels, today);
        debug!(riders = self.parcel_tallies.len(), "parcel aggregates applied");
    }

    /// Parcels a rider delivered today, per the latest aggregate fetch.
    #[must_use]
    pub fn delivered_today(&self, rider_key: &str) -> u32 {
        self.parcel_tallies.get(rider_key).copied().unwrap_or(0)
    }

    /// The snapshot set from the most recent tick.
    #[must_use]
    pub fn snapshots(&self) -> &[RiderSnapshot] {
        &self.last_snapshots
    }

    /// The session-owned trail history.
    #[must_use]
    pub fn trails(&self) -> &TrailBuilder {
        &self.trails
    }

    /// The merged, de-duplicated activity feed for the current state.
    #[must_use]
    pub fn feed(&self) -> Vec<ActivityFeedRow> {
        self.activity.merged_feed(&self.last_snapshots)
    }

    /// Ticks applied so far.
    #[must_use]
    pub fn tick_seq(&self) -> u64 {
        self.tick_seq
    }

    /// Tear down every surface. Safe to call repeatedly; the session can
    /// keep applying ticks afterwards (surfaces just no longer render).
    pub fn teardown(&mut self) {
        for surface in self.surfaces.values_mut() {
            surface.unmount();
        }
        self.surfaces.clear();
    }
}

/// A token identifying one in-flight detail lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTicket {
    rider_key: String,
    generation: u64,
}

/// State of the rider detail view, with a stale-response guard.
///
/// Detail lookups are not cancellable mid-flight; a response that arrives
/// after the operator switched riders (or reopened the same rider) must be
/// discarded, not applied. Every [`RiderDetail::open`] bumps a generation;
/// results are only applied when their ticket still matches.
#[derive(Debug, Default)]
pub struct RiderDetail {
    open_rider: Option<String>,
    generation: u64,
    quota: Option<QuotaState>,
    notice: Option<String>,
}

impl RiderDetail {
    /// Create a closed detail view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the detail view for a rider, clearing previous results.
    ///
    /// Returns the ticket the eventual lookup response must present.
    pub fn open(&mut self, rider_key: &str) -> DetailTicket {
        self.generation += 1;
        self.open_rider = Some(rider_key.to_string());
        self.quota = None;
        self.notice = None;
        DetailTicket {
            rider_key: rider_key.to_string(),
            generation: self.generation,
        }
    }

    /// Close the detail view; any in-flight response becomes stale.
    pub fn close(&mut self) {
        self.generation += 1;
        self.open_rider = None;
        self.quota = None;
        self.notice = None;
    }

    /// The rider currently open, if any.
    #[must_use]
    pub fn open_rider(&self) -> Option<&str> {
        self.open_rider.as_deref()
    }

    fn is_current(&self, ticket: &DetailTicket) -> bool {
        ticket.generation == self.generation
            && self.open_rider.as_deref() == Some(ticket.rider_key.as_str())
    }

    /// Apply a quota lookup result. Returns false (and changes nothing)
    /// when the ticket is stale.
    pub fn apply_quota(&mut self, ticket: &DetailTicket, state: QuotaState) -> bool {
        if !self.is_current(ticket) {
            debug!(rider = %ticket.rider_key, "discarding stale quota response");
            return false;
        }
        self.quota = Some(state);
        true
    }

    /// Record an inline lookup-failure notice. Returns false when stale.
    pub fn apply_notice(&mut self, ticket: &DetailTicket, notice: impl Into<String>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.notice = Some(notice.into());
        true
    }

    /// The applied quota state, if the lookup has landed.
    #[must_use]
    pub fn quota(&self) -> Option<&QuotaState> {
        self.quota.as_ref()
    }

    /// The inline failure notice, if the lookup failed.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}

/// Extract the `focus=<riderKey>` deep-link parameter from a query string.
///
/// Accepts the query with or without a leading `?`. Empty values are
/// treated as absent.
#[must_use]
pub fn focus_param(query: &str) -> Option<String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "focus")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Return the query string with the `focus` parameter removed, so manual
/// navigation is not re-overridden on the next render.
#[must_use]
pub fn strip_focus_param(query: &str) -> String {
    let had_question_mark = query.starts_with('?');
    let remaining: Vec<&str> = query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty() && pair.split_once('=').map(|(k, _)| k) != Some("focus"))
        .collect();
    let joined = remaining.join("&");
    if had_question_mark && !joined.is_empty() {
        format!("?{joined}")
    } else {
        joined
    }
}
