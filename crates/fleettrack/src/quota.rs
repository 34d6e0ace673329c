//! Delivery-quota metrics for fleettrack.
//!
//! Derives daily quota achievement and consecutive-day streaks from a
//! rider's raw parcel history. Nothing here is persisted; the computation
//! reruns each time an operator opens a rider's detail view.

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How far back the streak walk looks, in days.
pub const STREAK_LOOKBACK_DAYS: u32 = 366;

/// Share of the monthly quota expected per working day.
const DAILY_QUOTA_FACTOR: f64 = 0.9;

/// A raw parcel row as the backend reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcelRow {
    /// Key of the rider the parcel is assigned to.
    pub assigned_rider_id: Option<String>,
    /// Free-form delivery status text.
    pub status: Option<String>,
    /// When the parcel was created.
    pub created_at: Option<DateTime<Utc>>,
}

/// Normalized delivery outcome of a parcel.
///
/// Backends spell statuses inconsistently ("Successfully_Delivered",
/// "on-going", "CANCELLED"); this enum is the single interpretation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParcelOutcome {
    /// The parcel reached its recipient.
    Delivered,
    /// The parcel is still moving.
    InTransit,
    /// The delivery was cancelled.
    Cancelled,
    /// Anything else (pending, returned, unrecognized).
    Other,
}

impl ParcelOutcome {
    /// Parse a free-form parcel status into an outcome.
    ///
    /// Normalization: lowercase, trim, `_` and `-` become spaces, runs of
    /// whitespace collapse to one space.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalized = normalize_status(raw);
        match normalized.as_str() {
            "successfully delivered" | "delivered" | "successful" | "success" | "completed" => {
                Self::Delivered
            }
            "on going" | "in transit" => Self::InTransit,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other,
        }
    }

    /// Whether this outcome counts toward the delivery quota.
    #[must_use]
    pub fn counts_as_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Lowercase, trim, fold `_`/`-` to spaces, collapse repeated whitespace.
fn normalize_status(raw: &str) -> String {
    raw.to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derived quota achievement for one rider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaState {
    /// Daily delivery threshold derived from the monthly quota.
    pub daily_quota: u32,
    /// Parcels delivered during the current local day.
    pub delivered_today: u32,
    /// Consecutive days (ending today) the daily quota was met.
    pub streak_days: u32,
    /// Whether today's count already meets the daily quota.
    pub met_today: bool,
}

/// Daily threshold derived from a monthly quota: `ceil(monthly * 0.9)`.
///
/// Always at most the monthly quota itself.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn daily_quota(monthly_quota: u32) -> u32 {
    (f64::from(monthly_quota) * DAILY_QUOTA_FACTOR).ceil() as u32
}

/// Compute quota achievement from a parcel history, evaluated at `today`.
///
/// Delivered parcels are grouped by local calendar day; the walk starts at
/// `today` and moves backward for at most [`STREAK_LOOKBACK_DAYS`] days,
/// incrementing the streak while each day's delivered count meets
/// `daily_quota`. The walk halts at the first shortfall, today included: an
/// in-progress day that has not yet met quota yields a streak of zero.
///
/// Parcels with no creation timestamp or an unparseable one are skipped;
/// one bad record never aborts the computation.
#[must_use]
pub fn compute_streak_at(parcels: &[ParcelRow], daily_quota: u32, today: NaiveDate) -> QuotaState {
    let mut delivered_by_day: HashMap<NaiveDate, u32> = HashMap::new();
    for parcel in parcels {
        let delivered = parcel
            .status
            .as_deref()
            .map(ParcelOutcome::parse)
            .is_some_and(ParcelOutcome::counts_as_delivered);
        if !delivered {
            continue;
        }
        let Some(created_at) = parcel.created_at else {
            continue;
        };
        let day = created_at.with_timezone(&Local).date_naive();
        *delivered_by_day.entry(day).or_insert(0) += 1;
    }

    let delivered_today = delivered_by_day.get(&today).copied().unwrap_or(0);

    let mut streak_days = 0u32;
    let mut day = today;
    for _ in 0..STREAK_LOOKBACK_DAYS {
        let count = delivered_by_day.get(&day).copied().unwrap_or(0);
        if count < daily_quota {
            break;
        }
        streak_days += 1;
        let Some(previous) = day.pred_opt() else {
            break;
        };
        day = previous;
    }

    QuotaState {
        daily_quota,
        delivered_today,
        streak_days,
        met_today: delivered_today >= daily_quota,
    }
}

/// Compute quota achievement evaluated at the current local day.
#[must_use]
pub fn compute_streak(parcels: &[ParcelRow], daily_quota: u32) -> QuotaState {
    compute_streak_at(parcels, daily_quota, Local::now().date_naive())
}

/// Count delivered parcels per rider for one local calendar day.
///
/// This is the per-tick parcel aggregate: the polling loop fetches the
/// parcel rows for the tick's rider set and reduces them here. Parcels
/// without a rider, a delivered outcome, or a timestamp on `today` are
/// ignored.
#[must_use]
pub fn delivered_today_by_rider(parcels: &[ParcelRow], today: NaiveDate) -> HashMap<String, u32> {
    let mut tallies: HashMap<String, u32> = HashMap::new();
    for parcel in parcels {
        let Some(rider) = parcel.assigned_rider_id.as_deref() else {
            continue;
        };
        let delivered = parcel
            .status
            .as_deref()
            .map(ParcelOutcome::parse)
            .is_some_and(ParcelOutcome::counts_as_delivered);
        if !delivered {
            continue;
        }
        let Some(created_at) = parcel.created_at else {
            continue;
        };
        if created_at.with_timezone(&Local).date_naive() != today {
            continue;
        }
        *tallies.entry(rider.to_string()).or_insert(0) += 1;
    }
    tallies
}

/// Count delivered parcels falling in `today`'s local month.
#[must_use]
pub fn delivered_in_month(parcels: &[ParcelRow], today: NaiveDate) -> u32 {
    let count = parcels
        .iter()
        .filter(|p| {
            let delivered = p
                .status
                .as_deref()
                .map(ParcelOutcome::parse)
                .is_some_and(ParcelOutcome::counts_as_delivered);
            delivered
                && p.created_at.is_some_and(|at| {
                    in_current_month(at.with_timezone(&Local).date_naive(), today)
                })
        })
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// True when the date falls in the same local month as `today`.
#[must_use]
pub fn in_current_month(date: NaiveDate, today: NaiveDate) -> bool {
    date.year() == today.year() && date.month() == today.month()
}
