//! CLI entry point for the GTFS-RT stop board.
//!
//! Provides subcommands for decoding a single feed, printing arrivals and
//! alerts for configured stops, refreshing a location on an interval, and
//! running the CORS proxy used by the browser dashboard.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use gtfs_rt_board::{
    alerts::AlertSummary,
    board::{Board, ScheduleOptions, StopSchedule},
    config::AppConfig,
    fetch::{BasicClient, FeedPair, HttpClient, WithHeader, fetch_both, load_bytes},
    model::FeedMessage,
    output::{append_records, print_json},
    parser::FeedDecoder,
    proxy,
    stats::FeedSummary,
};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_rt_board")]
#[command(about = "Real-time arrivals and alerts for configured transit stops", long_about = None)]
struct Cli {
    /// JSON config file; the built-in stop table is used when absent
    #[arg(short, long, global = true, env = "BOARD_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Target {
    /// Stop key from the config's stop table
    #[arg(long)]
    stop: Option<String>,

    /// Location name grouping several stops
    #[arg(long)]
    location: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a GTFS-RT feed from a file or URL and print its summary
    Decode {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,
    },
    /// Print arrivals and alerts for a stop or a location
    Board {
        #[command(flatten)]
        target: Target,

        /// Only keep trips whose route id contains one of these line labels
        #[arg(short, long, value_delimiter = ',')]
        routes: Option<Vec<String>>,

        /// Also list arrivals that are due now or already gone
        #[arg(long, default_value_t = false)]
        include_departed: bool,

        /// CSV file to append arrivals to
        #[arg(long)]
        csv: Option<String>,

        /// Trips feed file or URL, overriding the configured endpoint
        #[arg(long)]
        trips: Option<String>,

        /// Alerts feed file or URL, overriding the configured endpoint
        #[arg(long)]
        alerts: Option<String>,
    },
    /// Refresh a location's board on an interval until interrupted
    Watch {
        /// Location name grouping several stops
        #[arg(short, long)]
        location: String,

        /// Seconds between refreshes (defaults to the config's refresh_secs)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Run the CORS proxy in front of the upstream feeds
    Proxy {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:8787", env = "PROXY_BIND")]
        bind: String,
    },
}

#[derive(Serialize)]
struct BoardOutput {
    schedules: Vec<StopSchedule>,
    alerts: Vec<AlertSummary>,
}

/// One CSV row per projected arrival.
#[derive(Serialize)]
struct ArrivalRow<'a> {
    fetched_at: DateTime<Utc>,
    stop_key: &'a str,
    stop_id: &'a str,
    route_id: Option<&'a str>,
    trip_id: Option<&'a str>,
    local_time: &'a str,
    wait_minutes: i64,
    delay_seconds: Option<i32>,
    is_cancelled: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gtfs_rt_board.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_board.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    info!(
        stops = config.stops.len(),
        locations = config.locations.len(),
        lines_with_hours = config.service_hours.len(),
        timezone = %config.timezone,
        "Config loaded"
    );

    let decoder = FeedDecoder::default();
    let client = WithHeader::user_agent(BasicClient::new()?, &config.feeds.user_agent)?;

    match cli.command {
        Commands::Decode { source } => {
            let bytes = load_bytes(&client, &source).await?;
            let feed = decoder.decode(&bytes)?;
            let summary = FeedSummary::from_feed(&feed);

            info!(
                entities = summary.total_entities,
                timed_pct = summary.timed_pct(),
                "Feed decoded"
            );
            print_json(&summary)?;
        }
        Commands::Board {
            target,
            routes,
            include_departed,
            csv,
            trips,
            alerts,
        } => {
            let trips = trips.unwrap_or_else(|| config.feeds.trips_url());
            let alerts = alerts.unwrap_or_else(|| config.feeds.alerts_url());
            let feeds = fetch_both(&client, &decoder, &trips, &alerts).await;

            let options = ScheduleOptions {
                routes,
                include_departed,
            };
            let now = Utc::now();
            let output = build_board(&Board::new(&config), &feeds, &target, &options, now)?;

            if let Some(path) = csv {
                let rows: Vec<ArrivalRow> = output
                    .schedules
                    .iter()
                    .flat_map(|s| {
                        s.arrivals.arrivals.iter().map(move |a| ArrivalRow {
                            fetched_at: now,
                            stop_key: &s.key,
                            stop_id: &s.stop.stop_id,
                            route_id: a.route_id.as_deref(),
                            trip_id: a.trip_id.as_deref(),
                            local_time: &a.local_time,
                            wait_minutes: a.wait_minutes,
                            delay_seconds: a.delay_seconds,
                            is_cancelled: a.is_cancelled,
                        })
                    })
                    .collect();
                append_records(&path, &rows)?;
                info!(path, rows = rows.len(), "Arrivals appended");
            }

            print_json(&output)?;
        }
        Commands::Watch { location, interval } => {
            let interval = interval.unwrap_or(config.refresh_secs);
            watch(&config, &client, &decoder, &location, interval).await?;
        }
        Commands::Proxy { bind } => {
            proxy::serve(config.feeds.clone(), config.proxy.clone(), &bind).await?;
        }
    }

    Ok(())
}

fn build_board(
    board: &Board<'_>,
    feeds: &FeedPair,
    target: &Target,
    options: &ScheduleOptions,
    now: DateTime<Utc>,
) -> Result<BoardOutput> {
    let output = match (&target.stop, &target.location) {
        (Some(stop), _) => BoardOutput {
            schedules: vec![board.stop_schedule(&feeds.trips, stop, options, now)?],
            alerts: board.stop_alerts(&feeds.alerts, stop)?,
        },
        (None, Some(location)) => BoardOutput {
            schedules: board.location_schedules(&feeds.trips, location, options, now)?,
            alerts: board.location_alerts(&feeds.alerts, location)?,
        },
        (None, None) => anyhow::bail!("either --stop or --location is required"),
    };
    Ok(output)
}

/// Rebuilds a location's board every `interval` seconds until Ctrl+C.
#[tracing::instrument(skip(config, client, decoder))]
async fn watch<C: HttpClient>(
    config: &AppConfig,
    client: &C,
    decoder: &FeedDecoder,
    location: &str,
    interval: u64,
) -> Result<()> {
    let board = Board::new(config);
    // Reject an unknown location before the first fetch
    board.location_alerts(&FeedMessage::empty(), location)?;

    let trips_url = config.feeds.trips_url();
    let alerts_url = config.feeds.alerts_url();
    let mut ticker = tokio::time::interval(tokio::time::Duration::from_secs(interval.max(1)));
    info!(interval, "Watching location. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                return Ok(());
            }
        }

        let feeds = fetch_both(client, decoder, &trips_url, &alerts_url).await;
        let now = Utc::now();

        match feeds.trips.timestamp {
            Some(ts) => {
                let age_secs = now.timestamp() - i64::try_from(ts).unwrap_or(i64::MAX);
                debug!(age_secs, "Trips feed age");
            }
            None => warn!("Trips feed unavailable this cycle"),
        }

        let schedules =
            match board.location_schedules(&feeds.trips, location, &ScheduleOptions::default(), now) {
                Ok(schedules) => schedules,
                Err(e) => {
                    error!(error = %e, "Failed to build schedules");
                    continue;
                }
            };

        for schedule in &schedules {
            match (schedule.arrivals.arrivals.first(), &schedule.arrivals.next_service) {
                (Some(next), _) => info!(
                    stop = %schedule.stop.name,
                    direction = schedule.stop.direction.as_deref().unwrap_or("-"),
                    route = next.route_id.as_deref().unwrap_or("?"),
                    wait_minutes = next.wait_minutes,
                    at = %next.local_time,
                    cancelled = next.is_cancelled,
                    count = schedule.arrivals.arrivals.len(),
                    "Next arrival"
                ),
                (None, Some(hint)) => info!(
                    stop = %schedule.stop.name,
                    line = %hint.line,
                    resumes = %hint,
                    "No live arrivals"
                ),
                (None, None) => info!(stop = %schedule.stop.name, "No live arrivals"),
            }
        }

        match board.location_alerts(&feeds.alerts, location) {
            Ok(alerts) => {
                for alert in &alerts {
                    warn!(
                        alert_id = %alert.id,
                        severity = %alert.severity,
                        routes = ?alert.affected_routes,
                        "{}",
                        alert.header
                    );
                }
            }
            Err(e) => error!(error = %e, "Failed to match alerts"),
        }
    }
}
