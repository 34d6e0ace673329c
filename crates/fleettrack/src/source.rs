//! Backend data-source boundary for fleettrack.
//!
//! The tracking engine only needs two queries from the backend: the rider
//! table and the parcel table filtered by rider and date. [`FleetSource`]
//! is that boundary; [`ReplaySource`] is a JSON-file implementation used by
//! the CLI and tests, playing back one recorded frame of rider rows per
//! poll.

use std::path::Path;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::quota::ParcelRow;
use crate::rider::RiderRow;

/// The backend queries the tracking engine consumes.
///
/// Point lookups are expressed as [`FleetSource::list_parcels`] with a
/// single-key filter.
#[async_trait::async_trait]
pub trait FleetSource: Send + Sync {
    /// List the current rider table.
    ///
    /// # Errors
    ///
    /// Returns a transient [`Error::Fetch`] when the backend is unreachable;
    /// the polling loop absorbs it and retries next tick.
    async fn list_riders(&self) -> Result<Vec<RiderRow>>;

    /// List parcels, optionally filtered by a rider-key set and a lower
    /// creation-date bound.
    ///
    /// # Errors
    ///
    /// Returns a transient [`Error::Fetch`] when the backend is unreachable.
    async fn list_parcels(
        &self,
        rider_keys: Option<&[String]>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ParcelRow>>;
}

/// JSON-file-backed [`FleetSource`].
///
/// Rider frames are a JSON array of arrays of rider rows; each
/// `list_riders` call plays the next frame and the playback clamps on the
/// last frame once exhausted. A flat array of rider rows is accepted as a
/// single frame. Parcels are one flat JSON array.
#[derive(Debug)]
pub struct ReplaySource {
    frames: Vec<Vec<RiderRow>>,
    parcels: Vec<ParcelRow>,
    cursor: Mutex<usize>,
}

impl ReplaySource {
    /// Build a source from in-memory frames and parcels.
    #[must_use]
    pub fn from_parts(frames: Vec<Vec<RiderRow>>, parcels: Vec<ParcelRow>) -> Self {
        Self {
            frames,
            parcels,
            cursor: Mutex::new(0),
        }
    }

    /// Load a source from replay files.
    ///
    /// A missing parcels file is treated as an empty parcel table; the
    /// rider frames file is required.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReplayLoad`] when a file cannot be read or parsed.
    pub fn from_files(frames_path: &Path, parcels_path: &Path) -> Result<Self> {
        let frames_raw = std::fs::read_to_string(frames_path)
            .map_err(|e| Error::replay_load(frames_path, e.to_string()))?;
        let frames = parse_frames(&frames_raw)
            .map_err(|e| Error::replay_load(frames_path, e.to_string()))?;

        let parcels = if parcels_path.exists() {
            let raw = std::fs::read_to_string(parcels_path)
                .map_err(|e| Error::replay_load(parcels_path, e.to_string()))?;
            serde_json::from_str(&raw)
                .map_err(|e| Error::replay_load(parcels_path, e.to_string()))?
        } else {
            debug!("no parcels file at {}", parcels_path.display());
            Vec::new()
        };

        Ok(Self::from_parts(frames, parcels))
    }

    /// Load a parcels-only source with no rider frames, for quota lookups
    /// that never poll the rider table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReplayLoad`] when the file cannot be read or parsed.
    pub fn from_parcels_file(parcels_path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(parcels_path)
            .map_err(|e| Error::replay_load(parcels_path, e.to_string()))?;
        let parcels = serde_json::from_str(&raw)
            .map_err(|e| Error::replay_load(parcels_path, e.to_string()))?;
        Ok(Self::from_parts(Vec::new(), parcels))
    }

    /// Number of recorded frames.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Whether playback has consumed every recorded frame at least once.
    pub async fn exhausted(&self) -> bool {
        *self.cursor.lock().await >= self.frames.len()
    }
}

/// Frames file: array of frames, or a flat array treated as one frame.
fn parse_frames(raw: &str) -> serde_json::Result<Vec<Vec<RiderRow>>> {
    match serde_json::from_str::<Vec<Vec<RiderRow>>>(raw) {
        Ok(frames) => Ok(frames),
        Err(_) => serde_json::from_str::<Vec<RiderRow>>(raw).map(|rows| vec![rows]),
    }
}

#[async_trait::async_trait]
impl FleetSource for ReplaySource {
    async fn list_riders(&self) -> Result<Vec<RiderRow>> {
        let mut cursor = self.cursor.lock().await;
        if self.frames.is_empty() {
            return Ok(Vec::new());
        }
        let index = (*cursor).min(self.frames.len() - 1);
        *cursor = cursor.saturating_add(1);
        Ok(self.frames[index].clone())
    }

    async fn list_parcels(
        &self,
        rider_keys: Option<&[String]>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ParcelRow>> {
        let rows = self
            .parcels
            .iter()
            .filter(|p| match rider_keys {
                Some(keys) => p
                    .assigned_rider_id
                    .as_ref()
                    .is_some_and(|id| keys.contains(id)),
                None => true,
            })
            .filter(|p| match since {
                Some(bound) => p.created_at.is_some_and(|at| at >= bound),
                None => true,
            })
            .cloned()
            .collect();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn row(key: &str, lat: f64) -> RiderRow {
        RiderRow {
            username: Some(key.to_string()),
            status: Some("online".to_string()),
            last_lat: json!(lat),
            last_lng: json!(121.0),
            ..RiderRow::default()
        }
    }

    fn parcel(rider: &str, secs: i64) -> ParcelRow {
        ParcelRow {
            assigned_rider_id: Some(rider.to_string()),
            status: Some("delivered".to_string()),
            created_at: Some(Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_frames_play_in_order() {
        let source = ReplaySource::from_parts(
            vec![vec![row("r1", 14.0)], vec![row("r1", 14.1)]],
            Vec::new(),
        );

        let first = source.list_riders().await.unwrap();
        let second = source.list_riders().await.unwrap();
        assert_eq!(first[0].last_lat, json!(14.0));
        assert_eq!(second[0].last_lat, json!(14.1));
    }

    #[tokio::test]
    async fn test_playback_clamps_on_last_frame() {
        let source = ReplaySource::from_parts(vec![vec![row("r1", 14.0)]], Vec::new());

        source.list_riders().await.unwrap();
        let again = source.list_riders().await.unwrap();
        assert_eq!(again[0].last_lat, json!(14.0));
        assert!(source.exhausted().await);
    }

    #[tokio::test]
    async fn test_empty_frames_yield_empty_rider_list() {
        let source = ReplaySource::from_parts(Vec::new(), Vec::new());
        assert!(source.list_riders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_parcels_filters_by_rider_set() {
        let source = ReplaySource::from_parts(
            Vec::new(),
            vec![parcel("r1", 0), parcel("r2", 0), parcel("r1", 5)],
        );

        let keys = vec!["r1".to_string()];
        let rows = source.list_parcels(Some(&keys), None).await.unwrap();
        assert_eq!(rows.len(), 2);

        let all = source.list_parcels(None, None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_list_parcels_filters_by_date() {
        let source =
            ReplaySource::from_parts(Vec::new(), vec![parcel("r1", 0), parcel("r1", 100)]);

        let bound = Utc.timestamp_opt(1_700_000_050, 0).unwrap();
        let rows = source.list_parcels(None, Some(bound)).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_parse_frames_nested() {
        let raw = r#"[[{"username": "r1"}], [{"username": "r1"}, {"username": "r2"}]]"#;
        let frames = parse_frames(raw).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].len(), 2);
    }

    #[test]
    fn test_parse_frames_flat_array_is_one_frame() {
        let raw = r#"[{"username": "r1"}, {"username": "r2"}]"#;
        let frames = parse_frames(raw).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 2);
    }

    #[test]
    fn test_from_files_missing_frames_is_replay_load_error() {
        let result = ReplaySource::from_files(
            Path::new("/nonexistent/frames.json"),
            Path::new("/nonexistent/parcels.json"),
        );
        assert!(matches!(result, Err(Error::ReplayLoad { .. })));
    }

    #[test]
    fn test_from_parcels_file_missing_is_replay_load_error() {
        let result = ReplaySource::from_parcels_file(Path::new("/nonexistent/parcels.json"));
        assert!(matches!(result, Err(Error::ReplayLoad { .. })));
    }
}
