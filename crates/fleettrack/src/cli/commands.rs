//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Run command arguments.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Path to the rider-frame replay file (overrides config)
    #[arg(long)]
    pub frames: Option<PathBuf>,

    /// Path to the parcel replay file (overrides config)
    #[arg(long)]
    pub parcels: Option<PathBuf>,

    /// Stop after this many poll ticks (default: run until frames are exhausted)
    #[arg(short, long)]
    pub ticks: Option<u64>,

    /// Apply a one-shot deep-link focus on this rider at startup
    #[arg(long, value_name = "RIDER")]
    pub focus: Option<String>,
}

/// Streak command arguments.
#[derive(Debug, Args)]
pub struct StreakCommand {
    /// Rider key to compute the streak for
    #[arg(short, long)]
    pub rider: String,

    /// Path to the parcel replay file (overrides config)
    #[arg(long)]
    pub parcels: Option<PathBuf>,

    /// Monthly delivery quota (overrides config)
    #[arg(short, long)]
    pub monthly_quota: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Feed command arguments.
#[derive(Debug, Args)]
pub struct FeedCommand {
    /// Path to the rider-frame replay file (overrides config)
    #[arg(long)]
    pub frames: Option<PathBuf>,

    /// Number of frames to ingest before printing the feed
    #[arg(short, long, default_value = "1")]
    pub ticks: u64,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_run_command_debug() {
        let cmd = RunCommand {
            frames: None,
            parcels: None,
            ticks: Some(3),
            focus: Some("r1".to_string()),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("ticks"));
        assert!(debug_str.contains("r1"));
    }

    #[test]
    fn test_streak_command_debug() {
        let cmd = StreakCommand {
            rider: "r1".to_string(),
            parcels: None,
            monthly_quota: Some(300),
            format: OutputFormat::Json,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("rider"));
        assert!(debug_str.contains("300"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }

    #[test]
    fn test_output_format_clone() {
        let format = OutputFormat::Table;
        let cloned = format;
        assert_eq!(format, cloned);
    }
}
