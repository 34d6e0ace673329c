//! Position store for fleettrack.
//!
//! The [`PositionStore`] holds the latest known snapshot per rider and
//! computes which riders moved between two consecutive polls. It is the only
//! writer of position state; map surfaces read from it and never mutate it.

use std::collections::HashMap;

use tracing::debug;

use crate::rider::{RiderRow, RiderSnapshot};

/// The result of ingesting one poll's worth of rider rows.
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    /// Every normalized snapshot from this poll, in row order.
    pub snapshots: Vec<RiderSnapshot>,
    /// The subset whose position changed since the previous poll.
    pub moved: Vec<RiderSnapshot>,
}

/// Latest-snapshot store with movement diffing.
///
/// Owns the previous-position map used for the next diff. Created when the
/// tracking view mounts and dropped when it unmounts; surfaces hold a
/// reference, never a copy of this state.
#[derive(Debug, Default)]
pub struct PositionStore {
    latest: HashMap<String, RiderSnapshot>,
}

impl PositionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one poll's raw rider rows.
    ///
    /// Each row is normalized into a [`RiderSnapshot`]; rows with no usable
    /// rider key are skipped. A rider counts as moved when either coordinate
    /// differs from the stored snapshot, including transitions between a
    /// known position and none. The stored snapshot is replaced
    /// unconditionally after diffing (last write wins, no field merging).
    pub fn ingest(&mut self, rows: &[RiderRow]) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();

        for row in rows {
            let Some(snapshot) = row.snapshot() else {
                debug!("skipping rider row with no key: {:?}", row.id);
                continue;
            };

            let previous = self.latest.get(&snapshot.rider_key);
            let moved = match previous {
                Some(prev) => prev.position != snapshot.position,
                // First sighting only counts as movement once a position
                // actually exists.
                None => snapshot.position.is_some(),
            };
            if moved {
                outcome.moved.push(snapshot.clone());
            }

            self.latest
                .insert(snapshot.rider_key.clone(), snapshot.clone());
            outcome.snapshots.push(snapshot);
        }

        debug!(
            riders = outcome.snapshots.len(),
            moved = outcome.moved.len(),
            "ingested poll"
        );
        outcome
    }

    /// Get the latest stored snapshot for a rider.
    #[must_use]
    pub fn snapshot(&self, rider_key: &str) -> Option<&RiderSnapshot> {
        self.latest.get(rider_key)
    }

    /// Iterate over every stored snapshot, in no particular order.
    pub fn snapshots(&self) -> impl Iterator<Item = &RiderSnapshot> {
        self.latest.values()
    }

    /// Number of riders currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.latest.len()
    }

    /// Whether the store has seen any riders yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}
