//! Core rider types for fleettrack.
//!
//! This module defines the rider status domain, the raw backend row shape,
//! and the normalized snapshot that the rest of the tracking engine consumes.
//! All status and coordinate normalization happens here, in one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A rider's normalized presence status.
///
/// Backend rows carry status as free-form text; this enum is the only place
/// that text is interpreted. Everything downstream compares tagged values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiderStatus {
    /// Rider is online and reporting.
    Online,
    /// Rider is actively working a route.
    Active,
    /// Rider is offline.
    Offline,
    /// Rider account is inactive.
    Inactive,
    /// Status text was missing or unrecognized.
    #[default]
    Unknown,
}

impl RiderStatus {
    /// Parse a free-form backend status string into the status domain.
    ///
    /// Matching is case- and whitespace-insensitive. Unrecognized values
    /// map to [`RiderStatus::Unknown`] rather than failing.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "online" => Self::Online,
            "active" => Self::Active,
            "offline" => Self::Offline,
            "inactive" => Self::Inactive,
            _ => Self::Unknown,
        }
    }

    /// Whether this status counts as live for trail growth and focus.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Online | Self::Active)
    }
}

impl std::fmt::Display for RiderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Active => write!(f, "active"),
            Self::Offline => write!(f, "offline"),
            Self::Inactive => write!(f, "inactive"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A raw rider row as the backend reports it.
///
/// Coordinate fields arrive as numbers, numeric strings, or null depending
/// on the rider's reporting history, so they are kept as raw JSON values
/// until [`normalize_coord`] runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiderRow {
    /// Backend row id (number or string).
    pub id: Value,
    /// Login name; preferred stable key when present.
    pub username: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Free-form status text.
    pub status: Option<String>,
    /// When the rider last checked in.
    pub last_active_at: Option<DateTime<Utc>>,
    /// Last reported latitude (number, numeric string, or null).
    pub last_lat: Value,
    /// Last reported longitude (number, numeric string, or null).
    pub last_lng: Value,
}

/// One rider's most recently known status and location.
///
/// Produced from a [`RiderRow`] on every poll; superseded (not merged) by
/// the next poll's snapshot for the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiderSnapshot {
    /// Stable identity: username when present, otherwise the row id.
    pub rider_key: String,
    /// Human-readable name for markers and feed rows.
    pub display_name: String,
    /// Normalized presence status.
    pub status: RiderStatus,
    /// Last known position; `None` until the rider first reports one.
    pub position: Option<(f64, f64)>,
    /// When the rider last checked in.
    pub last_active_at: Option<DateTime<Utc>>,
}

/// Normalize a raw coordinate value to a finite number or `None`.
///
/// Accepts JSON numbers and numeric strings. Anything absent, non-numeric,
/// or non-finite normalizes to `None` so the rider drops out of map
/// rendering without failing the tick.
#[must_use]
pub fn normalize_coord(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

impl RiderRow {
    /// The stable tracking key for this row, if one exists.
    ///
    /// Prefers a non-empty username, falls back to the row id. Rows with
    /// neither cannot be tracked and are skipped by ingest.
    #[must_use]
    pub fn rider_key(&self) -> Option<String> {
        if let Some(username) = &self.username {
            let trimmed = username.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        match &self.id {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Human-readable name: "first last", else username, else the key.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let full = full.trim();
        if !full.is_empty() {
            return full.to_string();
        }
        if let Some(username) = &self.username {
            if !username.trim().is_empty() {
                return username.trim().to_string();
            }
        }
        self.rider_key().unwrap_or_default()
    }

    /// Normalize this row into a snapshot.
    ///
    /// Returns `None` for rows with no usable rider key. Both coordinates
    /// must normalize to finite numbers for a position to be recorded.
    #[must_use]
    pub fn snapshot(&self) -> Option<RiderSnapshot> {
        let rider_key = self.rider_key()?;
        let lat = normalize_coord(&self.last_lat);
        let lng = normalize_coord(&self.last_lng);
        Some(RiderSnapshot {
            rider_key,
            display_name: self.display_name(),
            status: RiderStatus::parse(self.status.as_deref().unwrap_or("")),
            position: lat.zip(lng),
            last_active_at: self.last_active_at,
        })
    }
}

impl RiderSnapshot {
    /// Whether this rider should be rendered on a map.
    #[must_use]
    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(username: &str, status: &str, lat: Value, lng: Value) -> RiderRow {
        RiderRow {
            id: json!(7),
            username: Some(username.to_string()),
            status: Some(status.to_string()),
            last_lat: lat,
            last_lng: lng,
            ..RiderRow::default()
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(RiderStatus::parse("online"), RiderStatus::Online);
        assert_eq!(RiderStatus::parse("  Active "), RiderStatus::Active);
        assert_eq!(RiderStatus::parse("OFFLINE"), RiderStatus::Offline);
        assert_eq!(RiderStatus::parse("inactive"), RiderStatus::Inactive);
        assert_eq!(RiderStatus::parse("banana"), RiderStatus::Unknown);
        assert_eq!(RiderStatus::parse(""), RiderStatus::Unknown);
    }

    #[test]
    fn test_status_is_live() {
        assert!(RiderStatus::Online.is_live());
        assert!(RiderStatus::Active.is_live());
        assert!(!RiderStatus::Offline.is_live());
        assert!(!RiderStatus::Inactive.is_live());
        assert!(!RiderStatus::Unknown.is_live());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(RiderStatus::Online.to_string(), "online");
        assert_eq!(RiderStatus::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_normalize_coord_finite_number_unchanged() {
        assert_eq!(normalize_coord(&json!(14.5995)), Some(14.5995));
        assert_eq!(normalize_coord(&json!(-121.0)), Some(-121.0));
        assert_eq!(normalize_coord(&json!(0)), Some(0.0));
    }

    #[test]
    fn test_normalize_coord_numeric_string() {
        assert_eq!(normalize_coord(&json!("14.5995")), Some(14.5995));
        assert_eq!(normalize_coord(&json!(" -121.05 ")), Some(-121.05));
    }

    #[test]
    fn test_normalize_coord_garbage_is_none() {
        assert_eq!(normalize_coord(&json!("")), None);
        assert_eq!(normalize_coord(&json!("abc")), None);
        assert_eq!(normalize_coord(&Value::Null), None);
        assert_eq!(normalize_coord(&json!(true)), None);
        assert_eq!(normalize_coord(&json!({"lat": 1.0})), None);
    }

    #[test]
    fn test_normalize_coord_non_finite_is_none() {
        assert_eq!(normalize_coord(&json!("NaN")), None);
        assert_eq!(normalize_coord(&json!("inf")), None);
        assert_eq!(normalize_coord(&json!("-inf")), None);
    }

    #[test]
    fn test_rider_key_prefers_username() {
        let r = row("kdlcruz", "online", Value::Null, Value::Null);
        assert_eq!(r.rider_key(), Some("kdlcruz".to_string()));
    }

    #[test]
    fn test_rider_key_falls_back_to_id() {
        let mut r = row("", "online", Value::Null, Value::Null);
        r.username = None;
        assert_eq!(r.rider_key(), Some("7".to_string()));

        r.id = json!("abc-123");
        assert_eq!(r.rider_key(), Some("abc-123".to_string()));
    }

    #[test]
    fn test_rider_key_missing() {
        let r = RiderRow::default();
        assert_eq!(r.rider_key(), None);
        assert!(r.snapshot().is_none());
    }

    #[test]
    fn test_display_name_full_name_first() {
        let mut r = row("kdlcruz", "online", Value::Null, Value::Null);
        r.first_name = Some("Karl".to_string());
        r.last_name = Some("Dela Cruz".to_string());
        assert_eq!(r.display_name(), "Karl Dela Cruz");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let r = row("kdlcruz", "online", Value::Null, Value::Null);
        assert_eq!(r.display_name(), "kdlcruz");
    }

    #[test]
    fn test_snapshot_with_position() {
        let r = row("kdlcruz", "active", json!(14.6), json!("121.03"));
        let snap = r.snapshot().unwrap();
        assert_eq!(snap.rider_key, "kdlcruz");
        assert_eq!(snap.status, RiderStatus::Active);
        assert_eq!(snap.position, Some((14.6, 121.03)));
        assert!(snap.has_position());
    }

    #[test]
    fn test_snapshot_requires_both_coordinates() {
        let r = row("kdlcruz", "active", json!(14.6), Value::Null);
        let snap = r.snapshot().unwrap();
        assert_eq!(snap.position, None);
        assert!(!snap.has_position());
    }

    #[test]
    fn test_snapshot_malformed_coordinates_keep_rider() {
        // Rider still appears in tabular/activity views, just without a map
        // position.
        let r = row("kdlcruz", "offline", json!("abc"), json!("xyz"));
        let snap = r.snapshot().unwrap();
        assert_eq!(snap.status, RiderStatus::Offline);
        assert_eq!(snap.position, None);
    }

    #[test]
    fn test_rider_row_deserializes_mixed_coordinates() {
        let raw = r#"{
            "id": 12,
            "username": "jdoe",
            "status": "Online",
            "last_lat": "14.5995",
            "last_lng": 120.9842
        }"#;
        let r: RiderRow = serde_json::from_str(raw).unwrap();
        let snap = r.snapshot().unwrap();
        assert_eq!(snap.position, Some((14.5995, 120.9842)));
        assert_eq!(snap.status, RiderStatus::Online);
    }

    #[test]
    fn test_status_serde_rename() {
        let json = serde_json::to_string(&RiderStatus::Online).unwrap();
        assert_eq!(json, "\"online\"");
        let back: RiderStatus = serde_json::from_str("\"inactive\"").unwrap();
        assert_eq!(back, RiderStatus::Inactive);
    }
}
