use std::path::PathBuf;
use std::time::Duration;

use axum::{Json, Router, extract::State, routing::get};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tylo_core::{CodeRegistry, Decoder};
use tylo_monitor::{
    BusConfig, Config, DeviceFrameSource, EventSink, FrameSource, HttpSink, LogSink,
    MonitorState, SinkConfig, StatsSnapshot, StdoutSink, TcpFrameSource, TopicMap, run_pipeline,
};

#[derive(Parser)]
#[command(name = "tylo-monitor")]
#[command(about = "Tylö heater bus monitor")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "tylo-monitor.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Listen on the bus and publish decoded events (default)
    Run,
    /// Decode hex-encoded frames and print the outcome
    Decode {
        /// Frames including start and end markers, e.g. 9840066d3a9c
        #[arg(required = true)]
        frames: Vec<String>,

        /// Also decode the unverified acknowledge codes
        #[arg(long)]
        experimental: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "tracing=info,tylo_monitor=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(cli.config).await,
        Command::Decode {
            frames,
            experimental,
        } => decode(&frames, experimental),
    }
}

fn decode(frames: &[String], experimental: bool) -> color_eyre::Result<()> {
    let decoder = if experimental {
        Decoder::new(CodeRegistry::experimental())
    } else {
        Decoder::default()
    };

    for input in frames {
        let cleaned: String = input
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ':')
            .collect();
        let raw = hex::decode(&cleaned).map_err(|e| {
            color_eyre::eyre::eyre!("invalid hex frame '{}': {}", input, e)
        })?;

        let report = decoder.decode_frame(&raw);
        println!("{cleaned}: {:?}", report.outcome);
        for warning in &report.warnings {
            println!("  warning: {warning}");
        }
    }

    Ok(())
}

async fn run(config_path: PathBuf) -> color_eyre::Result<()> {
    let config = if config_path.exists() {
        info!(path = ?config_path, "Loading configuration");
        Config::load(&config_path)?
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };

    info!(
        namespace = %config.monitor.namespace,
        http_addr = %config.server.http_addr,
        experimental_codes = config.decoder.experimental_codes,
        "Starting tylo-monitor"
    );

    let topics = TopicMap::new(
        config.monitor.namespace.clone(),
        config.monitor.publish_unknown,
    );

    match &config.sink {
        SinkConfig::Log => {
            info!("Publishing to the log");
            run_monitor(config, LogSink::new(topics)).await
        }
        SinkConfig::Stdout => {
            info!("Publishing to stdout");
            run_monitor(config, StdoutSink::new(topics)).await
        }
        SinkConfig::Http {
            url,
            token,
            timeout_secs,
        } => {
            info!(%url, authenticated = token.is_some(), "Publishing over HTTP");
            let sink = HttpSink::new(
                url.clone(),
                token.clone(),
                Duration::from_secs(*timeout_secs),
                topics,
            )?;
            run_monitor(config, sink).await
        }
    }
}

async fn run_monitor<S: EventSink>(config: Config, sink: S) -> color_eyre::Result<()> {
    match &config.bus {
        BusConfig::Device { path } => {
            info!(?path, "Using device frame source");
            let source = DeviceFrameSource::new(path.clone());
            run_frame_source(source, sink, config).await
        }
        BusConfig::Tcp {
            addr,
            reconnect_max_secs,
        } => {
            info!(%addr, "Using TCP frame source");
            let source = TcpFrameSource::new(*addr, Duration::from_secs(*reconnect_max_secs));
            run_frame_source(source, sink, config).await
        }
    }
}

async fn run_frame_source<F: FrameSource, S: EventSink>(
    source: F,
    sink: S,
    config: Config,
) -> color_eyre::Result<()> {
    let cancel = CancellationToken::new();
    let state = MonitorState::new();
    let decoder = config.decoder.decoder();

    let frames = source.start(cancel.clone()).await?;

    // Spawn decode pipeline; a closed source ends the whole monitor
    let cancel_for_pipeline = cancel.clone();
    let state_for_pipeline = state.clone();
    let pipeline_handle = tokio::spawn(async move {
        run_pipeline(
            frames,
            &decoder,
            &sink,
            &state_for_pipeline,
            cancel_for_pipeline.clone(),
        )
        .await;
        cancel_for_pipeline.cancel();
    });

    // HTTP server
    let http_addr = config.server.http_addr;
    let axum_app = Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .with_state(state.clone());
    let axum_listener = TcpListener::bind(http_addr).await?;
    info!(%http_addr, "HTTP server listening");

    let cancel_for_http = cancel.clone();

    tokio::select! {
        result = axum::serve(axum_listener, axum_app).with_graceful_shutdown(async move {
            cancel_for_http.cancelled().await;
        }) => {
            if let Err(e) = result {
                error!(error = ?e, "HTTP server error");
            }
            info!("HTTP server shut down");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            cancel.cancel();
        }
    }

    cancel.cancel();
    let _ = pipeline_handle.await;

    let stats = state.snapshot().await;
    info!(
        frames = stats.frames,
        events = stats.events,
        crc_errors = stats.crc_errors,
        "tylo-monitor shut down complete"
    );
    Ok(())
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn stats_handler(State(state): State<MonitorState>) -> Json<StatsSnapshot> {
    Json(state.snapshot().await)
}
