//! Map surface control for fleettrack.
//!
//! One [`MapSurfaceController`] exists per visible rendering surface: the
//! inline panel, the fullscreen modal, and the tabular view all share this
//! logic, parameterized by [`SurfaceKind`]. The controller reconciles the
//! surface's markers and trail polylines against the current snapshot set
//! and carries the one-shot focus and auto-fit behaviors.
//!
//! The concrete tile/rendering provider sits behind the [`MapCanvas`]
//! capability trait; the controller is agnostic to it.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::rider::RiderSnapshot;
use crate::trail::TrailBuilder;

/// The capabilities the tracking engine needs from a map provider.
///
/// Implementations bind a concrete tile/rendering library to a container;
/// the controller only ever talks through this trait.
pub trait MapCanvas: std::fmt::Debug + Send {
    /// Create or move the marker for a rider.
    fn upsert_marker(&mut self, rider_key: &str, position: (f64, f64), label: &str);

    /// Remove a rider's marker.
    fn remove_marker(&mut self, rider_key: &str);

    /// Draw (or fully replace) a rider's trail polyline.
    fn draw_polyline(&mut self, rider_key: &str, points: &[(f64, f64)]);

    /// Remove a rider's trail polyline.
    fn remove_polyline(&mut self, rider_key: &str);

    /// Fit the camera to a bounding set of points.
    fn fit_bounds(&mut self, points: &[(f64, f64)]);

    /// Center the camera on a point at the given zoom.
    fn set_view(&mut self, center: (f64, f64), zoom: u8);

    /// Open the info popup attached to a rider's marker.
    fn open_popup(&mut self, rider_key: &str);

    /// Release the underlying map instance and its listeners.
    fn release(&mut self);
}

/// Which rendering surface a controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// The inline map panel on the dashboard.
    Inline,
    /// The fullscreen map modal.
    Fullscreen,
    /// The tabular rider view with its embedded mini map.
    Tabular,
}

impl SurfaceKind {
    /// Zoom level used when focusing on a single rider.
    #[must_use]
    pub fn focus_zoom(self) -> u8 {
        match self {
            Self::Inline => 16,
            Self::Fullscreen => 17,
            Self::Tabular => 15,
        }
    }
}

impl std::fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline => write!(f, "inline"),
            Self::Fullscreen => write!(f, "fullscreen"),
            Self::Tabular => write!(f, "tabular"),
        }
    }
}

/// Result of consuming a pending focus instruction during reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusOutcome {
    /// The camera was centered on the rider and its popup opened.
    Applied {
        /// Key of the focused rider.
        rider_key: String,
    },
    /// The rider is unknown, not live, or has no coordinates. No map
    /// mutation happened; the caller shows a "tracking unavailable" notice.
    Unavailable {
        /// Key of the rider that could not be focused.
        rider_key: String,
    },
}

/// What the controller last rendered for one rider.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MarkerState {
    position: (f64, f64),
    live: bool,
}

/// Per-surface reconciliation state machine.
///
/// Lifecycle: `unmounted → mounted(no data) → mounted(populated)`, back to
/// `unmounted` on [`MapSurfaceController::unmount`]. The focus instruction
/// is an orthogonal one-shot flag, consumed on the next reconcile.
#[derive(Debug)]
pub struct MapSurfaceController {
    kind: SurfaceKind,
    container: Option<String>,
    canvas: Option<Box<dyn MapCanvas>>,
    markers: HashMap<String, MarkerState>,
    polylines: HashSet<String>,
    fitted: bool,
    pending_focus: Option<String>,
}

impl MapSurfaceController {
    /// Create an unmounted controller for the given surface kind.
    #[must_use]
    pub fn new(kind: SurfaceKind) -> Self {
        Self {
            kind,
            container: None,
            canvas: None,
            markers: HashMap::new(),
            polylines: HashSet::new(),
            fitted: false,
            pending_focus: None,
        }
    }

    /// Which surface this controller drives.
    #[must_use]
    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    /// Whether a canvas is currently mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.canvas.is_some()
    }

    /// Whether the surface has rendered at least one marker.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        !self.markers.is_empty()
    }

    /// Mount the surface onto a container, creating the canvas lazily.
    ///
    /// Re-mounting onto the same container is a no-op (the factory is not
    /// called). Mounting onto a different container tears the old canvas
    /// down first and recreates from scratch.
    pub fn mount<F>(&mut self, container: &str, create_canvas: F)
    where
        F: FnOnce() -> Box<dyn MapCanvas>,
    {
        if self.canvas.is_some() && self.container.as_deref() == Some(container) {
            debug!(surface = %self.kind, container, "already mounted");
            return;
        }
        if self.canvas.is_some() {
            self.unmount();
        }
        debug!(surface = %self.kind, container, "mounting surface");
        self.canvas = Some(create_canvas());
        self.container = Some(container.to_string());
    }

    /// Attach a one-shot focus instruction, consumed by the next reconcile.
    ///
    /// A newer request replaces an unconsumed older one.
    pub fn request_focus(&mut self, rider_key: &str) {
        self.pending_focus = Some(rider_key.to_string());
    }

    /// Reconcile the surface against the current tick.
    ///
    /// Creates or moves a marker for every rider with known coordinates,
    /// removes markers for riders no longer present, and redraws trail
    /// polylines from scratch for live riders with enough points. On the
    /// first tick that produces markers the camera auto-fits to their
    /// bounds, exactly once per mount; operator pan/zoom is never
    /// overridden afterwards.
    ///
    /// Returns the outcome of a pending focus instruction, if one was
    /// consumed this tick. Unmounted surfaces ignore reconciles.
    pub fn reconcile(
        &mut self,
        snapshots: &[RiderSnapshot],
        trails: &TrailBuilder,
    ) -> Option<FocusOutcome> {
        let Some(canvas) = self.canvas.as_mut() else {
            return None;
        };

        // Markers: create-or-move present riders, drop the rest.
        let mut present: HashSet<String> = HashSet::new();
        for snapshot in snapshots {
            let Some(position) = snapshot.position else {
                continue;
            };
            canvas.upsert_marker(&snapshot.rider_key, position, &snapshot.display_name);
            self.markers.insert(
                snapshot.rider_key.clone(),
                MarkerState {
                    position,
                    live: snapshot.status.is_live(),
                },
            );
            present.insert(snapshot.rider_key.clone());
        }
        let stale: Vec<String> = self
            .markers
            .keys()
            .filter(|key| !present.contains(*key))
            .cloned()
            .collect();
        for key in stale {
            canvas.remove_marker(&key);
            self.markers.remove(&key);
        }

        // Trails: full redraw each tick, stale lines removed first.
        for key in self.polylines.drain() {
            canvas.remove_polyline(&key);
        }
        for snapshot in snapshots {
            if !snapshot.status.is_live() {
                continue;
            }
            if let Some(points) = trails.drawable(&snapshot.rider_key) {
                canvas.draw_polyline(&snapshot.rider_key, &points);
                self.polylines.insert(snapshot.rider_key.clone());
            }
        }

        // One-shot auto-fit on first population.
        if !self.fitted && !self.markers.is_empty() {
            let bounds: Vec<(f64, f64)> = self.markers.values().map(|m| m.position).collect();
            canvas.fit_bounds(&bounds);
            self.fitted = true;
        }

        // One-shot focus, consumed whether or not it can be applied.
        let pending = self.pending_focus.take()?;
        match self.try_focus(&pending) {
            Ok(()) => Some(FocusOutcome::Applied { rider_key: pending }),
            Err(_) => {
                warn!(surface = %self.kind, rider = %pending, "focus unavailable");
                Some(FocusOutcome::Unavailable { rider_key: pending })
            }
        }
    }

    /// Center the surface on a rider right now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FocusUnavailable`] when the surface is unmounted or
    /// the rider is unknown, not live, or has no coordinates. No map
    /// mutation occurs on failure.
    pub fn focus(&mut self, rider_key: &str) -> Result<()> {
        self.try_focus(rider_key)
    }

    fn try_focus(&mut self, rider_key: &str) -> Result<()> {
        let Some(canvas) = self.canvas.as_mut() else {
            return Err(Error::focus_unavailable(rider_key));
        };
        let marker = self
            .markers
            .get(rider_key)
            .ok_or_else(|| Error::focus_unavailable(rider_key))?;
        if !marker.live {
            return Err(Error::focus_unavailable(rider_key));
        }
        canvas.set_view(marker.position, self.kind.focus_zoom());
        canvas.open_popup(rider_key);
        Ok(())
    }

    /// Tear the surface down, clearing owned markers and lines and
    /// releasing the canvas. Safe to call repeatedly.
    pub fn unmount(&mut self) {
        if let Some(mut canvas) = self.canvas.take() {
            for key in self.markers.keys() {
                canvas.remove_marker(key);
            }
            for key in &self.polylines {
                canvas.remove_polyline(key);
            }
            canvas.release();
            debug!(surface = %self.kind, "surface unmounted");
        }
        self.markers.clear();
        self.polylines.clear();
        self.container = None;
        self.fitted = false;
        self.pending_focus = None;
    }
}
