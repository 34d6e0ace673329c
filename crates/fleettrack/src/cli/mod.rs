//! Command-line interface for fleettrack.
//!
//! This module provides the CLI structure and command handlers for the
//! `fleettrack` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, FeedCommand, OutputFormat, RunCommand, StreakCommand};

/// fleettrack - Live courier-fleet tracking from your terminal
///
/// Ingests rider-position snapshots, derives motion trails and an activity
/// feed, and computes delivery-quota streaks from raw parcel history.
#[derive(Debug, Parser)]
#[command(name = "fleettrack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the live-tracking loop against recorded replay data
    Run(RunCommand),

    /// Compute a rider's delivery-quota streak
    Streak(StreakCommand),

    /// Ingest replay frames and print the merged activity feed
    Feed(FeedCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
