//! Motion trails for fleettrack.
//!
//! The [`TrailBuilder`] keeps a short bounded history of recent positions
//! per live rider, used to draw a motion line behind the marker. Trails
//! belong to the tracking session, not to any single map surface, so every
//! surface draws from the same history.

use std::collections::{HashMap, VecDeque};

use crate::rider::RiderSnapshot;

/// Maximum number of points retained per trail.
pub const TRAIL_CAP: usize = 8;

/// Minimum number of points before a trail is drawable as a line.
pub const TRAIL_MIN_DRAWABLE: usize = 2;

/// Bounded per-rider position history.
#[derive(Debug, Default)]
pub struct TrailBuilder {
    trails: HashMap<String, VecDeque<(f64, f64)>>,
}

impl TrailBuilder {
    /// Create an empty trail builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one poll tick's snapshots.
    ///
    /// Only riders that are currently live (online/active) with a known
    /// position accumulate points. A point is appended only when it differs
    /// from the trail's current last point, and the trail is truncated to
    /// the most recent [`TRAIL_CAP`] entries, oldest dropped first.
    ///
    /// Riders that go offline keep their trail; only growth is gated on
    /// status, the history is never cleared by a status change.
    pub fn record_tick(&mut self, snapshots: &[RiderSnapshot]) {
        for snapshot in snapshots {
            if !snapshot.status.is_live() {
                continue;
            }
            let Some(point) = snapshot.position else {
                continue;
            };

            let trail = self.trails.entry(snapshot.rider_key.clone()).or_default();
            if trail.back() == Some(&point) {
                continue;
            }
            trail.push_back(point);
            while trail.len() > TRAIL_CAP {
                trail.pop_front();
            }
        }
    }

    /// The recorded trail for a rider, oldest point first.
    ///
    /// Empty when the rider has never accumulated a point.
    #[must_use]
    pub fn trail(&self, rider_key: &str) -> Vec<(f64, f64)> {
        self.trails
            .get(rider_key)
            .map(|t| t.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The trail for a rider, only when it has enough points to draw a line.
    #[must_use]
    pub fn drawable(&self, rider_key: &str) -> Option<Vec<(f64, f64)>> {
        let trail = self.trail(rider_key);
        (trail.len() >= TRAIL_MIN_DRAWABLE).then_some(trail)
    }

    /// Number of riders with at least one recorded point.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trails.len()
    }

    /// Whether any trail points have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }
}
