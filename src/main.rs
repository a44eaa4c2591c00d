use anyhow::{Context, Result};
use capture_control::logging::init_logging;
use capture_control::protocol::output;
use capture_control::{
    options, Config, EngineFactory, PartialOptions, RegionBounds, Session, SessionController,
    SessionState, StaticDeviceResolver,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{error, info};

/// Line-driven controller for a screen and audio capture engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Output file for the recording, fixed for the whole session
    #[arg(long)]
    path: PathBuf,

    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    top: i32,

    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    bottom: i32,

    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    left: i32,

    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    right: i32,

    /// Record video only
    #[arg(long, alias = "audio_disabled")]
    audio_disabled: bool,

    /// Configuration file (toml, yaml, json, ...)
    #[arg(short, long)]
    config: Option<String>,

    /// Start recording immediately instead of waiting for `start`
    #[arg(long)]
    autostart: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    let code = runtime.block_on(run(cli));
    // a pending stdin read sits on a blocking thread; do not wait for it
    runtime.shutdown_timeout(Duration::from_millis(100));
    code
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let cfg = Config::load(cli.config.as_deref())?;
    init_logging(&cfg.logging);

    info!("capture-control v{}", env!("CARGO_PKG_VERSION"));

    let defaults = PartialOptions {
        region: RegionBounds::new(cli.top, cli.bottom, cli.left, cli.right),
        audio_disabled: cli.audio_disabled,
        ..PartialOptions::default()
    };

    let resolver = Arc::new(StaticDeviceResolver::new(cfg.devices.clone()));
    let initial = options::build(&defaults, resolver.as_ref())
        .context("Invalid session options")?;
    let engine = EngineFactory::create(&cfg.engine, initial, cfg.session.event_buffer)
        .context("Failed to create capture engine")?;

    let (output_tx, output_rx) = output::channel();
    let writer = tokio::spawn(output::write_outputs(output_rx, tokio::io::stdout()));

    let controller = SessionController::new(
        Session::new(cli.path),
        engine,
        resolver,
        cfg.session.clone(),
        defaults,
        output_tx,
    )
    .with_autostart(cli.autostart);

    let cancel = controller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted");
            cancel.cancel();
        }
    });

    let snapshot = controller
        .run(BufReader::new(tokio::io::stdin()))
        .await
        .context("Session aborted")?;

    // controller dropped: the writer drains and exits
    if let Err(e) = writer.await.context("Output writer panicked")? {
        error!("Failed to write output: {}", e);
    }

    Ok(match snapshot.state {
        SessionState::Completed | SessionState::Idle => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
