//! CLI entry point for the departure monitor.
//!
//! Provides subcommands for one-shot departure boards, a live auto-
//! refreshing watch mode, proximity search, favorites management, and the
//! CORS relay server.

use std::ffi::OsStr;
use std::path::Path;

use abfahrten::config::{AUTO_REFRESH_INTERVAL, BatchConfig, default_proxies};
use abfahrten::fetch::{BasicClient, FetchProgress, NoProgress, ProgressSink, ProxyRegistry};
use abfahrten::format::render_board;
use abfahrten::geo::distance_meters;
use abfahrten::relay;
use abfahrten::session::{LoadOutcome, Session};
use abfahrten::stations::{Station, load_stations};
use abfahrten::store::ClientStateStore;
use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "abfahrten")]
#[command(about = "Live departure boards for Wiener Linien stations", long_about = None)]
struct Cli {
    /// Path to the static station dataset
    #[arg(long, default_value = "data/stations_full.json", global = true)]
    stations: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the departure board for the best-matching station once
    Departures {
        /// Station name (substring match)
        query: String,
    },
    /// Show the departure board and keep refreshing it silently
    Watch {
        /// Station name (substring match)
        query: String,
    },
    /// List stations around a coordinate
    Nearby {
        latitude: f64,
        longitude: f64,

        /// Search radius in meters
        #[arg(short, long, default_value_t = 500.0)]
        radius: f64,
    },
    /// List favorites, or toggle one by station name
    Favorites {
        /// Station to add or remove
        #[arg(long)]
        toggle: Option<String>,
    },
    /// Run the CORS relay server
    Relay {
        #[arg(long, default_value = "127.0.0.1:8787")]
        bind: String,
    },
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/abfahrten.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("abfahrten.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Departures { query } => {
            let session = build_session(&cli.stations)?;
            let station = find_station(&session, &query)?;
            show_board(&session, &station, false).await?;
        }
        Commands::Watch { query } => {
            let session = build_session(&cli.stations)?;
            let station = find_station(&session, &query)?;
            watch(&session, &station).await?;
        }
        Commands::Nearby {
            latitude,
            longitude,
            radius,
        } => {
            let session = build_session(&cli.stations)?;
            let hits = session.search_nearby(latitude, longitude, radius);
            if hits.is_empty() {
                println!("Keine Stationen im Umkreis von {radius:.0} m");
            }
            for station in hits.iter().take(10) {
                let distance = distance_meters(latitude, longitude, station.lat, station.lon);
                let favorite = if session.store().is_favorite(station.rbl) {
                    " *"
                } else {
                    ""
                };
                println!(
                    "{:>5.0} m  {}{} ({} Steige){}",
                    distance,
                    station.name,
                    station
                        .municipality
                        .as_deref()
                        .map(|m| format!(", {m}"))
                        .unwrap_or_default(),
                    station.rbls.len(),
                    favorite
                );
            }
        }
        Commands::Favorites { toggle } => {
            let session = build_session(&cli.stations)?;
            if let Some(query) = toggle {
                let station = find_station(&session, &query)?;
                let now_favorite = session.store().toggle_favorite(&station)?;
                info!(station = %station.name, now_favorite, "Favorite toggled");
            }
            for station in session.store().favorites() {
                println!("{} (RBL {})", station.name, station.rbl);
            }
        }
        Commands::Relay { bind } => {
            relay::run(&bind).await?;
        }
    }

    Ok(())
}

fn build_session(stations_path: &str) -> Result<Session<BasicClient>> {
    let stations = load_stations(stations_path)?;
    let state_dir =
        std::env::var("ABFAHRTEN_STATE_DIR").unwrap_or_else(|_| ".abfahrten".to_string());
    Ok(Session::new(
        stations,
        ProxyRegistry::new(default_proxies()),
        BasicClient::new(),
        BatchConfig::default(),
        ClientStateStore::new(state_dir),
    ))
}

fn find_station(session: &Session<BasicClient>, query: &str) -> Result<Station> {
    session
        .search(query)
        .first()
        .map(|s| (*s).clone())
        .ok_or_else(|| anyhow!("no station matches '{query}'"))
}

/// Reports batch progress on stderr via tracing.
struct LogProgress;

impl ProgressSink for LogProgress {
    fn update(&self, progress: FetchProgress) {
        info!(
            processed = progress.processed,
            total = progress.total,
            succeeded = progress.succeeded,
            "Batch loaded"
        );
    }
}

async fn show_board(
    session: &Session<BasicClient>,
    station: &Station,
    silent: bool,
) -> Result<LoadOutcome> {
    let progress: &dyn ProgressSink = if silent { &NoProgress } else { &LogProgress };
    let outcome = session.load_departures(station, silent, progress).await?;
    match &outcome {
        LoadOutcome::Departures { station, groups } => {
            println!("{}", render_board(station, groups));
        }
        LoadOutcome::NoData { station } => {
            println!("Keine Abfahrtsdaten verfügbar für {}", station.name);
        }
    }
    Ok(outcome)
}

/// Initial load plus silent periodic refreshes until interrupted or the
/// current-station slot moves on.
async fn watch(session: &Session<BasicClient>, station: &Station) -> Result<()> {
    let outcome = show_board(session, station, false).await?;
    if matches!(outcome, LoadOutcome::NoData { .. }) {
        return Ok(());
    }
    let generation = session.set_current(station);

    loop {
        tokio::time::sleep(AUTO_REFRESH_INTERVAL).await;
        if !session.refresh_still_valid(generation) {
            info!("Refresh superseded, stopping");
            return Ok(());
        }
        if let Err(e) = show_board(session, station, true).await {
            // Hard failures stop the background refresh, matching the
            // top-of-load error boundary.
            error!(error = %e, "Silent refresh failed");
            session.clear_current();
            return Err(e);
        }
    }
}
