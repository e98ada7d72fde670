#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the REACH alert dashboard.
//!
//! Runs dashboard sessions against an in-memory map, so alert fetching,
//! filtering, geometry handling and selection can be exercised and
//! inspected without a browser. Output is JSON on stdout; logs go to
//! stderr (`RUST_LOG`).

use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use reach_alert_models::{AlertCategory, AlertSeverity};
use reach_dashboard::{DashboardConfig, DashboardController, DetailView, FetchStatus};
use reach_geometry::{RawAreaGeometry, extract_representative_point};
use reach_map::{Clock, HeadlessEngine, HeadlessSnapshot, MapEngine, MapEvent};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "reach", about = "REACH alert dashboard tools")]
struct Cli {
    /// TOML file overriding the built-in configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch alerts and print the visible view models
    Alerts {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Print the representative point of a WKT or `GeoJSON` geometry
    Geometry {
        /// Geometry text, e.g. "POLYGON((85 27, 85.2 27, 85.1 27.3, 85 27))"
        input: String,
    },
    /// Select an alert and print the detail panel and the resulting map
    Select {
        /// Alert ID
        id: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Click a map location and print the detail panel
    Click {
        /// Longitude
        lng: f64,
        /// Latitude
        lat: f64,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Show the last N days up to today (UTC) instead of --from/--to
    #[arg(long, conflicts_with_all = ["from", "to"])]
    recent_days: Option<u64>,
    /// Hide alerts below this severity (e.g. "moderate")
    #[arg(long, value_parser = parse_severity)]
    min_severity: Option<AlertSeverity>,
    /// Comma-separated categories to show (e.g. "met,geo")
    #[arg(long, value_delimiter = ',', value_parser = parse_category)]
    category: Vec<AlertCategory>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeometryReport {
    geometry: Option<RawAreaGeometry>,
    point: Option<reach_geometry::LngLat>,
    polygon_points: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SelectionReport<'a> {
    detail: Option<&'a DetailView>,
    map: HeadlessSnapshot,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Geometry { input } => {
            let geometry = RawAreaGeometry::from_text(&input);
            let report = GeometryReport {
                point: extract_representative_point(geometry.as_ref()),
                polygon_points: geometry
                    .as_ref()
                    .and_then(RawAreaGeometry::polygon_ring)
                    .map(|ring| ring.len()),
                geometry,
            };
            print_json(&report)?;
        }
        Commands::Alerts { filters } => {
            let config = DashboardConfig::load(cli.config.as_deref())?;
            let (mut dashboard, _) = open_session(&config)?;
            load_alerts(&mut dashboard, &filters).await?;
            print_json(&dashboard.visible_alerts())?;
        }
        Commands::Select { id, filters } => {
            let config = DashboardConfig::load(cli.config.as_deref())?;
            let (mut dashboard, engine) = open_session(&config)?;
            load_alerts(&mut dashboard, &filters).await?;

            if dashboard.select_alert(&id).is_none() {
                return Err(format!("no alert with ID {id} in the selected range").into());
            }
            settle(&mut dashboard).await;

            print_json(&SelectionReport {
                detail: dashboard.detail(),
                map: engine.snapshot(),
            })?;
        }
        Commands::Click { lng, lat } => {
            let config = DashboardConfig::load(cli.config.as_deref())?;
            let (mut dashboard, engine) = open_session(&config)?;
            let point = reach_geometry::LngLat::from_finite(lng, lat)
                .ok_or("coordinates must be finite numbers")?;

            dashboard.handle_map_event(MapEvent::Click(point));

            print_json(&SelectionReport {
                detail: dashboard.detail(),
                map: engine.snapshot(),
            })?;
        }
    }

    Ok(())
}

/// Creates a dashboard on a headless map whose style then finishes
/// loading, the way a browser session starts.
fn open_session(
    config: &DashboardConfig,
) -> Result<(DashboardController<HeadlessEngine>, HeadlessEngine), Box<dyn std::error::Error>> {
    let source = config.source.build()?;
    let engine = HeadlessEngine::new(config.map.center, config.map.zoom);
    let mut dashboard = DashboardController::new(engine.clone(), source, config);

    engine.load_style();
    dashboard.handle_map_event(MapEvent::StyleLoaded);

    Ok((dashboard, engine))
}

async fn load_alerts<E: MapEngine, C: Clock>(
    dashboard: &mut DashboardController<E, C>,
    filters: &FilterArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = match filters.recent_days {
        Some(days) => {
            dashboard
                .set_recent_days(days, chrono::Utc::now().date_naive())
                .await
        }
        None => dashboard.set_date_range(filters.from, filters.to).await,
    };
    if let FetchStatus::Failed(message) = status {
        return Err(format!("failed to fetch alerts: {message}").into());
    }

    if let Some(severity) = filters.min_severity {
        dashboard.set_min_severity(severity);
    }
    if !filters.category.is_empty() {
        dashboard.set_categories(filters.category.clone());
    }

    log::info!(
        "{} of {} alerts visible",
        dashboard.visible_alerts().len(),
        dashboard.alerts().len()
    );
    Ok(())
}

/// Waits out pending highlight retries.
async fn settle<E: MapEngine, C: Clock>(dashboard: &mut DashboardController<E, C>) {
    while let Some(deadline) = dashboard.next_deadline() {
        tokio::time::sleep(deadline.saturating_duration_since(Instant::now())).await;
        for outcome in dashboard.tick() {
            log::debug!("Highlight retry: {outcome:?}");
        }
    }
}

fn parse_severity(value: &str) -> Result<AlertSeverity, String> {
    value
        .parse()
        .map_err(|_| format!("expected one of: {}", variant_list(AlertSeverity::all())))
}

fn parse_category(value: &str) -> Result<AlertCategory, String> {
    value
        .parse()
        .map_err(|_| format!("expected one of: {}", variant_list(AlertCategory::all())))
}

fn variant_list<T: AsRef<str>>(variants: &[T]) -> String {
    variants
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
