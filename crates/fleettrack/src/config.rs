//! Configuration management for fleettrack.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "fleettrack";

/// Default rider-frame replay file name.
const RIDER_FRAMES_FILE_NAME: &str = "rider-frames.json";

/// Default parcel replay file name.
const PARCELS_FILE_NAME: &str = "parcels.json";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLEETTRACK_`)
/// 2. TOML config file at `~/.config/fleettrack/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Live-tracking configuration.
    pub tracking: TrackingConfig,
    /// Delivery-quota configuration.
    pub quota: QuotaConfig,
    /// Replay data-source configuration.
    pub replay: ReplayConfig,
    /// Weather/flood overlay configuration.
    pub overlay: OverlayConfig,
}

/// Live-tracking configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Seconds between rider-position polls.
    pub poll_interval_secs: u64,
}

/// Delivery-quota configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Monthly delivery quota per rider. The daily threshold is derived
    /// from this (see [`crate::quota::daily_quota`]).
    pub monthly_quota: u32,
}

/// Replay data-source configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Path to the recorded rider-row frames (JSON array of arrays).
    /// Defaults to `~/.local/share/fleettrack/rider-frames.json`
    pub rider_frames_path: Option<PathBuf>,
    /// Path to the recorded parcel rows (JSON array).
    /// Defaults to `~/.local/share/fleettrack/parcels.json`
    pub parcels_path: Option<PathBuf>,
}

/// Weather/flood overlay configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Enable the overlay layer.
    pub enabled: bool,
    /// Tile endpoint for the overlay provider.
    pub endpoint: Option<String>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self { monthly_quota: 300 }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `FLEETTRACK_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("FLEETTRACK_").split("_"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.tracking.poll_interval_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "poll_interval_secs must be greater than 0".to_string(),
            });
        }

        if self.quota.monthly_quota == 0 {
            return Err(Error::ConfigValidation {
                message: "monthly_quota must be greater than 0".to_string(),
            });
        }

        if self.overlay.enabled && self.overlay.endpoint.is_none() {
            return Err(Error::ConfigValidation {
                message: "overlay.endpoint is required when overlay.enabled is true".to_string(),
            });
        }

        Ok(())
    }

    /// Get the rider-frame replay path, resolving defaults if not set.
    #[must_use]
    pub fn rider_frames_path(&self) -> PathBuf {
        self.replay
            .rider_frames_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(RIDER_FRAMES_FILE_NAME))
    }

    /// Get the parcel replay path, resolving defaults if not set.
    #[must_use]
    pub fn parcels_path(&self) -> PathBuf {
        self.replay
            .parcels_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(PARCELS_FILE_NAME))
    }

    /// Get the poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.tracking.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.tracking.poll_interval_secs, 5);
        assert_eq!(config.quota.monthly_quota, 300);
        assert!(!config.overlay.enabled);
        assert!(config.overlay.endpoint.is_none());
    }

    #[test]
    fn test_default_replay_config() {
        let replay = ReplayConfig::default();

        assert!(replay.rider_frames_path.is_none());
        assert!(replay.parcels_path.is_none());
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let mut config = Config::default();
        config.tracking.poll_interval_secs = 0;

        let result = config.validate();
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("poll_interval_secs"));
    }

    #[test]
    fn test_validate_zero_monthly_quota() {
        let mut config = Config::default();
        config.quota.monthly_quota = 0;

        let result = config.validate();
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("monthly_quota"));
    }

    #[test]
    fn test_validate_overlay_enabled_without_endpoint() {
        let mut config = Config::default();
        config.overlay.enabled = true;

        let result = config.validate();
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("overlay.endpoint"));
    }

    #[test]
    fn test_validate_overlay_enabled_with_endpoint() {
        let mut config = Config::default();
        config.overlay.enabled = true;
        config.overlay.endpoint = Some("https://tiles.example/flood".to_string());

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rider_frames_path_default() {
        let config = Config::default();
        let path = config.rider_frames_path();

        assert!(path.to_string_lossy().contains("rider-frames.json"));
    }

    #[test]
    fn test_rider_frames_path_custom() {
        let mut config = Config::default();
        config.replay.rider_frames_path = Some(PathBuf::from("/custom/frames.json"));

        assert_eq!(
            config.rider_frames_path(),
            PathBuf::from("/custom/frames.json")
        );
    }

    #[test]
    fn test_parcels_path_default() {
        let config = Config::default();
        let path = config.parcels_path();

        assert!(path.to_string_lossy().contains("parcels.json"));
    }

    #[test]
    fn test_poll_interval() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("fleettrack"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_default_data_dir() {
        let path = Config::default_data_dir();
        assert!(path.to_string_lossy().contains("fleettrack"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // Loading from a nonexistent path should work (uses defaults)
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_serialize() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("poll_interval_secs"));
        assert!(json.contains("monthly_quota"));
    }

    #[test]
    fn test_tracking_config_deserialize() {
        let json = r#"{"poll_interval_secs": 10}"#;
        let tracking: TrackingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(tracking.poll_interval_secs, 10);
    }

    #[test]
    fn test_config_clone() {
        let config = Config::default();
        let cloned = config.clone();
        assert_eq!(config, cloned);
    }
}
