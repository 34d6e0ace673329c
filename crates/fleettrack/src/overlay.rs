//! Weather/flood overlay boundary for fleettrack.
//!
//! The overlay is an optional third-party tile layer keyed by coordinate
//! bounds. Provider failures degrade to "no overlay": marker and trail
//! rendering must never be affected by an overlay outage.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// A coordinate bounding box, south-west corner first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// South-west corner.
    pub south_west: (f64, f64),
    /// North-east corner.
    pub north_east: (f64, f64),
}

impl Bounds {
    /// Smallest bounds containing every given point.
    ///
    /// Returns `None` for an empty point set.
    #[must_use]
    pub fn around(points: &[(f64, f64)]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Self {
            south_west: *first,
            north_east: *first,
        };
        for (lat, lng) in &points[1..] {
            bounds.south_west.0 = bounds.south_west.0.min(*lat);
            bounds.south_west.1 = bounds.south_west.1.min(*lng);
            bounds.north_east.0 = bounds.north_east.0.max(*lat);
            bounds.north_east.1 = bounds.north_east.1.max(*lng);
        }
        Some(bounds)
    }
}

/// One renderable overlay tile layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayTiles {
    /// Tile URL template for the map provider.
    pub url_template: String,
    /// Suggested layer opacity in `[0.0, 1.0]`.
    pub opacity: f64,
}

/// A third-party overlay tile provider.
#[async_trait::async_trait]
pub trait OverlayProvider: Send + Sync {
    /// Fetch the overlay tiles covering the given bounds.
    ///
    /// # Errors
    ///
    /// Returns a transient fetch error when the provider is unreachable.
    async fn tiles(&self, bounds: Bounds) -> Result<OverlayTiles>;
}

/// Fetch overlay tiles, degrading to `None` on any provider failure.
///
/// The failure is logged; the caller simply renders without an overlay.
pub async fn fetch_overlay(provider: &dyn OverlayProvider, bounds: Bounds) -> Option<OverlayTiles> {
    match provider.tiles(bounds).await {
        Ok(tiles) => Some(tiles),
        Err(err) => {
            warn!("overlay unavailable, rendering without it: {err}");
            None
        }
    }
}
