//! CLI entry point for the OASISmap happiness aggregator.
//!
//! Provides subcommands for the aggregated map/chart view, the per-record
//! views (everyone or a single submitter) and submitting a new rating.

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use oasismap_aggregator::{
    config::Config,
    infra::connect,
    output::{emit, print_pretty},
    rating::Submitter,
    service::{AllRequest, HappinessService, IndividualRequest, SubmitRequest},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "oasismap_aggregator")]
#[command(about = "Aggregates OASISmap happiness ratings from an Orion context broker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Time window and paging shared by every read command.
#[derive(Args, Debug)]
struct Window {
    /// Range start, RFC 3339 with offset (e.g. 2024-03-15T00:00:00+09:00)
    #[arg(long)]
    start: String,

    /// Range end (inclusive), RFC 3339 with offset
    #[arg(long)]
    end: String,

    /// Maximum number of entities to fetch (1-1000)
    #[arg(long, default_value = "1000")]
    limit: String,

    /// Number of entities to skip
    #[arg(long, default_value = "0")]
    offset: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregated map tiles and chart series for every submitter
    All {
        #[command(flatten)]
        window: Window,

        /// Chart granularity: month, day or time (hourly)
        #[arg(short, long, default_value = "day")]
        period: String,

        /// Map zoom level used for tiling
        #[arg(short, long, default_value = "13")]
        zoom_level: String,

        /// Restrict the chart to "north,east,south,west"
        #[arg(short, long, allow_hyphen_values = true)]
        bounds: Option<String>,

        /// Start the chart series at the current unit
        #[arg(long, default_value_t = false)]
        now_first: bool,

        /// JSON file to write instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Per-record rows for every submitter
    AllIndividual {
        #[command(flatten)]
        window: Window,

        #[command(flatten)]
        near: Near,

        /// JSON file to write instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Per-record rows for one submitter
    Me {
        #[arg(long)]
        nickname: String,

        #[command(flatten)]
        window: Window,

        #[command(flatten)]
        near: Near,

        /// JSON file to write instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate and submit a new rating
    Submit {
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,

        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,

        /// Six comma-separated 0/1 answers, happiness1 first
        #[arg(long, value_delimiter = ',')]
        answers: Vec<f64>,

        #[arg(long)]
        memo: Option<String>,

        #[arg(long)]
        nickname: String,

        #[arg(long, default_value = "")]
        age: String,

        #[arg(long, default_value = "")]
        address: String,
    },
}

/// Optional radius filter for the per-record views.
#[derive(Args, Debug)]
struct Near {
    /// Only records within --max-distance of "lat,lng"
    #[arg(long, allow_hyphen_values = true)]
    near: Option<String>,

    /// Radius in metres for --near
    #[arg(long, default_value_t = 1000)]
    max_distance: u32,
}

impl Window {
    fn individual(self, near: Near) -> IndividualRequest {
        IndividualRequest {
            start: self.start,
            end: self.end,
            limit: self.limit,
            offset: self.offset,
            near: near.near,
            max_distance_m: near.max_distance,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/oasismap.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("oasismap.log"));

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

    let config = Config::from_env()?;
    let source = connect(&config)?;
    let service = HappinessService::new(source, config.display_offset, config.selection_rule);

    match cli.command {
        Commands::All {
            window,
            period,
            zoom_level,
            bounds,
            now_first,
            output,
        } => {
            let req = AllRequest {
                start: window.start,
                end: window.end,
                limit: window.limit,
                offset: window.offset,
                period,
                zoom_level,
                bounds,
                now_first,
            };
            let response = service.find_happiness_all(&req).await?;
            print_pretty(&response);
            emit(output.as_deref(), &response)?;
        }
        Commands::AllIndividual {
            window,
            near,
            output,
        } => {
            let response = service.find_all_individual(&window.individual(near)).await?;
            info!(count = response.count, rows = response.data.len(), "Fetched all ratings");
            emit(output.as_deref(), &response)?;
        }
        Commands::Me {
            nickname,
            window,
            near,
            output,
        } => {
            let response = service.find_me(&nickname, &window.individual(near)).await?;
            info!(count = response.count, rows = response.data.len(), "Fetched own ratings");
            emit(output.as_deref(), &response)?;
        }
        Commands::Submit {
            latitude,
            longitude,
            answers,
            memo,
            nickname,
            age,
            address,
        } => {
            let answers: [f64; 6] = answers.as_slice().try_into().map_err(|_| {
                anyhow!("--answers takes exactly six values, got {}", answers.len())
            })?;
            let req = SubmitRequest {
                latitude,
                longitude,
                memo,
                answers,
            };
            let submitter = Submitter {
                nickname,
                age,
                address,
            };
            let response = service.submit(&req, &submitter).await?;
            emit(None, &response)?;
        }
    }

    Ok(())
}
