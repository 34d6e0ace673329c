//! `fleettrack` - CLI for the live fleet-tracking engine
//!
//! This binary drives the tracking engine from recorded replay data:
//! running the polling loop, printing the merged activity feed, and
//! computing delivery-quota streaks.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use fleettrack::cli::{Cli, Command, ConfigCommand, FeedCommand, OutputFormat, RunCommand, StreakCommand};
use fleettrack::quota::{compute_streak, daily_quota, delivered_in_month};
use fleettrack::session::TrackingSession;
use fleettrack::source::{FleetSource, ReplaySource};
use fleettrack::surface::{MapCanvas, SurfaceKind};
use fleettrack::{init_logging, Config, PollingLoop};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Run(run_cmd) => handle_run(&config, &run_cmd).await,
        Command::Streak(streak_cmd) => handle_streak(&config, &streak_cmd).await,
        Command::Feed(feed_cmd) => handle_feed(&config, &feed_cmd).await,
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

/// A map canvas that narrates mutations to the terminal.
#[derive(Debug, Default)]
struct ConsoleCanvas;

impl MapCanvas for ConsoleCanvas {
    fn upsert_marker(&mut self, rider_key: &str, position: (f64, f64), label: &str) {
        println!("  marker {label} ({rider_key}) at {:.5},{:.5}", position.0, position.1);
    }

    fn remove_marker(&mut self, rider_key: &str) {
        println!("  marker {rider_key} removed");
    }

    fn draw_polyline(&mut self, rider_key: &str, points: &[(f64, f64)]) {
        println!("  trail {rider_key}: {} points", points.len());
    }

    fn remove_polyline(&mut self, _rider_key: &str) {}

    fn fit_bounds(&mut self, points: &[(f64, f64)]) {
        println!("  camera fit to {} markers", points.len());
    }

    fn set_view(&mut self, center: (f64, f64), zoom: u8) {
        println!("  camera centered at {:.5},{:.5} zoom {zoom}", center.0, center.1);
    }

    fn open_popup(&mut self, rider_key: &str) {
        println!("  popup opened for {rider_key}");
    }

    fn release(&mut self) {}
}

async fn handle_run(
    config: &Config,
    cmd: &RunCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let frames_path = cmd.frames.clone().unwrap_or_else(|| config.rider_frames_path());
    let parcels_path = cmd.parcels.clone().unwrap_or_else(|| config.parcels_path());
    let source = Arc::new(ReplaySource::from_files(&frames_path, &parcels_path)?);

    let mut session = TrackingSession::new();
    let inline = session.add_surface("inline", SurfaceKind::Inline);
    inline.mount("console", || Box::new(ConsoleCanvas));
    if let Some(rider_key) = &cmd.focus {
        inline.request_focus(rider_key);
    }

    let mut poller = PollingLoop::new(config.poll_interval());
    if let Some(ticks) = cmd.ticks {
        poller = poller.with_max_ticks(ticks);
    }
    let handle = poller.handle();

    let ctrl_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_handle.stop();
        }
    });

    let exhaust_handle = handle.clone();
    let exhaust_source = Arc::clone(&source);
    tokio::spawn(async move {
        loop {
            if exhaust_source.exhausted().await {
                exhaust_handle.stop();
                break;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    });

    poller.run(source.as_ref(), &mut session).await;

    println!();
    print_feed(&session, OutputFormat::Table)?;
    session.teardown();
    Ok(())
}

async fn handle_streak(
    config: &Config,
    cmd: &StreakCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let parcels_path = cmd.parcels.clone().unwrap_or_else(|| config.parcels_path());
    let source = ReplaySource::from_parcels_file(&parcels_path)?;

    let monthly = cmd.monthly_quota.unwrap_or(config.quota.monthly_quota);
    let threshold = daily_quota(monthly);
    let keys = vec![cmd.rider.clone()];
    let rider_parcels = source.list_parcels(Some(&keys), None).await?;
    let state = compute_streak(&rider_parcels, threshold);
    let month_total = delivered_in_month(&rider_parcels, chrono::Local::now().date_naive());

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state)?),
        _ => {
            println!("Quota streak for {}", cmd.rider);
            println!("----------------------");
            println!("Daily quota:         {}", state.daily_quota);
            println!("Delivered today:     {}", state.delivered_today);
            println!("Delivered this month: {month_total} / {monthly}");
            println!("Met today:           {}", if state.met_today { "yes" } else { "no" });
            println!("Streak:              {} day(s)", state.streak_days);
        }
    }
    Ok(())
}

async fn handle_feed(
    config: &Config,
    cmd: &FeedCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let frames_path = cmd.frames.clone().unwrap_or_else(|| config.rider_frames_path());
    let source = ReplaySource::from_files(&frames_path, &config.parcels_path())?;

    let mut session = TrackingSession::new();
    for _ in 0..cmd.ticks {
        let rows = source.list_riders().await?;
        session.apply_tick(&rows, chrono::Utc::now());
    }

    print_feed(&session, cmd.format)?;
    Ok(())
}

fn print_feed(
    session: &TrackingSession,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let feed = session.feed();
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&feed)?);
        return Ok(());
    }

    println!("Activity feed ({} riders)", feed.len());
    println!("-------------------------");
    for row in feed {
        let position = row
            .position
            .map_or_else(|| "no position".to_string(), |(lat, lng)| format!("{lat:.5},{lng:.5}"));
        let seen = row
            .last_seen
            .map_or_else(|| "never".to_string(), |at| at.to_rfc3339());
        println!(
            "{:<20} {:<9} {:<22} last seen {}",
            row.rider_name, row.status.to_string(), position, seen
        );
    }
    Ok(())
}

fn handle_config(
    config: &Config,
    cmd: ConfigCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Tracking]");
                println!("  Poll interval (s): {}", config.tracking.poll_interval_secs);
                println!();
                println!("[Quota]");
                println!("  Monthly quota:     {}", config.quota.monthly_quota);
                println!("  Daily quota:       {}", daily_quota(config.quota.monthly_quota));
                println!();
                println!("[Replay]");
                println!("  Rider frames:      {}", config.rider_frames_path().display());
                println!("  Parcels:           {}", config.parcels_path().display());
                println!();
                println!("[Overlay]");
                println!("  Enabled:           {}", config.overlay.enabled);
                if let Some(endpoint) = &config.overlay.endpoint {
                    println!("  Endpoint:          {endpoint}");
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
