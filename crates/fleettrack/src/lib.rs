//! `fleettrack` - Live courier-fleet tracking and map synchronization
//!
//! This library ingests periodic rider-position snapshots and derives the
//! state a dispatch console renders: per-rider trails, a merged activity
//! feed, delivery-quota streaks, and declarative map surfaces that stay in
//! sync with the fleet.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod activity;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod overlay;
pub mod poll;
pub mod position;
pub mod quota;
pub mod rider;
pub mod session;
pub mod source;
pub mod surface;
pub mod trail;

pub use activity::{ActivityEvent, ActivityFeed, ActivityFeedRow};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use poll::{PollerHandle, PollingLoop};
pub use position::PositionStore;
pub use quota::QuotaState;
pub use rider::{RiderRow, RiderSnapshot, RiderStatus};
pub use session::TrackingSession;
pub use surface::MapSurfaceController;
pub use trail::TrailBuilder;
