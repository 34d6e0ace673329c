//! Activity feed for fleettrack.
//!
//! Movement events from consecutive polls are merged into a capped,
//! de-duplicated, most-recent-first feed for operator review. Riders with no
//! recent movement still appear in the merged feed from their raw snapshot.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::rider::{RiderSnapshot, RiderStatus};

/// Maximum number of movement events retained across all riders.
pub const FEED_CAP: usize = 60;

/// A single movement event, created when a rider's position changed between
/// two consecutive polls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEvent {
    /// Monotonic event id, unique within the feed's lifetime.
    pub id: u64,
    /// Stable rider key.
    pub rider_key: String,
    /// Display name at the time of the event.
    pub rider_name: String,
    /// Rider status at the time of the event.
    pub status: RiderStatus,
    /// When the movement was observed.
    pub occurred_at: DateTime<Utc>,
    /// Position at the time of the event, if known.
    pub position: Option<(f64, f64)>,
}

/// One row of the merged feed the UI consumes: at most one per rider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityFeedRow {
    /// Stable rider key.
    pub rider_key: String,
    /// Display name.
    pub rider_name: String,
    /// Rider status.
    pub status: RiderStatus,
    /// When the rider was last seen moving or checking in, if known.
    pub last_seen: Option<DateTime<Utc>>,
    /// Last known position, if any.
    pub position: Option<(f64, f64)>,
    /// Whether this row came from a movement event (as opposed to a raw
    /// snapshot fallback).
    pub from_movement: bool,
}

/// Capped newest-first movement history with a de-duplicating merged view.
#[derive(Debug, Default)]
pub struct ActivityFeed {
    events: VecDeque<ActivityEvent>,
    next_id: u64,
}

impl ActivityFeed {
    /// Create an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one movement event per moved rider, newest first.
    ///
    /// The history is capped at [`FEED_CAP`] events; entries beyond the cap
    /// are discarded oldest-first.
    pub fn record_moved(&mut self, moved: &[RiderSnapshot], occurred_at: DateTime<Utc>) {
        for snapshot in moved {
            self.next_id += 1;
            self.events.push_front(ActivityEvent {
                id: self.next_id,
                rider_key: snapshot.rider_key.clone(),
                rider_name: snapshot.display_name.clone(),
                status: snapshot.status,
                occurred_at,
                position: snapshot.position,
            });
        }
        if self.events.len() > FEED_CAP {
            debug!(
                dropped = self.events.len() - FEED_CAP,
                "activity feed full, dropping oldest events"
            );
            self.events.truncate(FEED_CAP);
        }
    }

    /// The raw retained events, newest first.
    #[must_use]
    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events.iter().cloned().collect()
    }

    /// Number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether any events have been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Build the merged, de-duplicated feed.
    ///
    /// Rows come from the most recent movement event per rider, in event
    /// order (newest first, first occurrence per key wins). Riders present
    /// in the snapshot set but absent from the event history are appended
    /// after being sorted live-first, then by most recent `last_active_at`
    /// descending; riders with no `last_active_at` sort last. A rider never
    /// appears twice.
    #[must_use]
    pub fn merged_feed(&self, snapshots: &[RiderSnapshot]) -> Vec<ActivityFeedRow> {
        let mut rows = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for event in &self.events {
            if !seen.insert(&event.rider_key) {
                continue;
            }
            rows.push(ActivityFeedRow {
                rider_key: event.rider_key.clone(),
                rider_name: event.rider_name.clone(),
                status: event.status,
                last_seen: Some(event.occurred_at),
                position: event.position,
                from_movement: true,
            });
        }

        let mut fallback: Vec<&RiderSnapshot> = snapshots
            .iter()
            .filter(|s| !seen.contains(s.rider_key.as_str()))
            .collect();
        fallback.sort_by(|a, b| {
            b.status
                .is_live()
                .cmp(&a.status.is_live())
                .then_with(|| cmp_last_active(a.last_active_at, b.last_active_at))
        });

        let mut fallback_seen: HashSet<&str> = HashSet::new();
        for snapshot in fallback {
            if !fallback_seen.insert(&snapshot.rider_key) {
                continue;
            }
            rows.push(ActivityFeedRow {
                rider_key: snapshot.rider_key.clone(),
                rider_name: snapshot.display_name.clone(),
                status: snapshot.status,
                last_seen: snapshot.last_active_at,
                position: snapshot.position,
                from_movement: false,
            });
        }

        rows
    }
}

/// Most recent first; missing timestamps sort last.
fn cmp_last_active(
    a: Option<DateTime<Utc>>,
    b: Option<DateTime<Utc>>,
) -> std::cmp::Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn snap(key: &str, status: RiderStatus, last_active: Option<i64>) -> RiderSnapshot {
        RiderSnapshot {
            rider_key: key.to_string(),
            display_name: key.to_string(),
            status,
            position: Some((14.0, 121.0)),
            last_active_at: last_active.map(ts),
        }
    }

    #[test]
    fn test_record_moved_newest_first() {
        let mut feed = ActivityFeed::new();
        feed.record_moved(&[snap("r1", RiderStatus::Online, None)], ts(0));
        feed.record_moved(&[snap("r2", RiderStatus::Online, None)], ts(5));

        let events = feed.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].rider_key, "r2");
        assert_eq!(events[1].rider_key, "r1");
    }

    #[test]
    fn test_event_ids_are_monotonic() {
        let mut feed = ActivityFeed::new();
        feed.record_moved(
            &[
                snap("r1", RiderStatus::Online, None),
                snap("r2", RiderStatus::Online, None),
            ],
            ts(0),
        );

        let events = feed.events();
        assert!(events[0].id > events[1].id);
    }

    #[test]
    fn test_cap_retains_sixty_most_recent() {
        let mut feed = ActivityFeed::new();
        for i in 0..61 {
            feed.record_moved(&[snap(&format!("r{i}"), RiderStatus::Online, None)], ts(i));
        }

        assert_eq!(feed.len(), FEED_CAP);
        let events = feed.events();
        // Newest retained, the very first event discarded.
        assert_eq!(events[0].rider_key, "r60");
        assert_eq!(events[FEED_CAP - 1].rider_key, "r1");
    }

    #[test]
    fn test_merged_feed_dedups_by_rider() {
        let mut feed = ActivityFeed::new();
        feed.record_moved(&[snap("r1", RiderStatus::Online, None)], ts(0));
        feed.record_moved(&[snap("r1", RiderStatus::Active, None)], ts(5));

        let rows = feed.merged_feed(&[]);
        assert_eq!(rows.len(), 1);
        // Most recent event wins.
        assert_eq!(rows[0].status, RiderStatus::Active);
        assert_eq!(rows[0].last_seen, Some(ts(5)));
        assert!(rows[0].from_movement);
    }

    #[test]
    fn test_merged_feed_never_repeats_a_key() {
        let mut feed = ActivityFeed::new();
        feed.record_moved(&[snap("r1", RiderStatus::Online, None)], ts(0));

        let rows = feed.merged_feed(&[snap("r1", RiderStatus::Offline, Some(1))]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rider_key, "r1");
        assert!(rows[0].from_movement);
    }

    #[test]
    fn test_merged_feed_appends_snapshot_only_riders() {
        let mut feed = ActivityFeed::new();
        feed.record_moved(&[snap("r1", RiderStatus::Online, None)], ts(0));

        let rows = feed.merged_feed(&[
            snap("r2", RiderStatus::Offline, Some(10)),
            snap("r3", RiderStatus::Online, Some(5)),
        ]);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].rider_key, "r1");
        // Live rider sorts before offline rider despite older check-in.
        assert_eq!(rows[1].rider_key, "r3");
        assert_eq!(rows[2].rider_key, "r2");
        assert!(!rows[1].from_movement);
    }

    #[test]
    fn test_snapshot_fallback_sorted_by_recency() {
        let feed = ActivityFeed::new();
        let rows = feed.merged_feed(&[
            snap("old", RiderStatus::Offline, Some(1)),
            snap("new", RiderStatus::Offline, Some(100)),
            snap("never", RiderStatus::Offline, None),
        ]);

        assert_eq!(rows[0].rider_key, "new");
        assert_eq!(rows[1].rider_key, "old");
        assert_eq!(rows[2].rider_key, "never");
    }

    #[test]
    fn test_snapshot_fallback_ties_keep_insertion_order() {
        let feed = ActivityFeed::new();
        let rows = feed.merged_feed(&[
            snap("a", RiderStatus::Offline, Some(7)),
            snap("b", RiderStatus::Offline, Some(7)),
        ]);

        assert_eq!(rows[0].rider_key, "a");
        assert_eq!(rows[1].rider_key, "b");
    }

    #[test]
    fn test_empty_feed_with_no_snapshots() {
        let feed = ActivityFeed::new();
        assert!(feed.is_empty());
        assert!(feed.merged_feed(&[]).is_empty());
    }

    #[test]
    fn test_event_order_preserved_across_riders() {
        let mut feed = ActivityFeed::new();
        feed.record_moved(&[snap("r1", RiderStatus::Online, None)], ts(0));
        feed.record_moved(&[snap("r2", RiderStatus::Online, None)], ts(5));
        feed.record_moved(&[snap("r1", RiderStatus::Online, None)], ts(10));

        let rows = feed.merged_feed(&[]);
        assert_eq!(rows.len(), 2);
        // r1's latest event outranks r2's.
        assert_eq!(rows[0].rider_key, "r1");
        assert_eq!(rows[0].last_seen, Some(ts(10)));
        assert_eq!(rows[1].rider_key, "r2");
    }
}
