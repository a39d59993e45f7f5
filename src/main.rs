// SPDX-License-Identifier: GPL-3.0-only

use camera_demo::app::{PresentationSurface, RecordingCoordinator};
use camera_demo::backends::camera::{CameraBackendType, DevicePosition, get_backend_for_type};
use camera_demo::constants::app_info;
use camera_demo::session::{CaptureSessionController, SessionSettings};
use camera_demo::storage::MediaLibrary;
use camera_demo::{Config, terminal};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod cli;

/// Log file used while the terminal surface owns the screen
const LOG_FILE_NAME: &str = "camera-demo.log";

#[derive(Parser)]
#[command(name = "camera-demo")]
#[command(about = "Camera demo: live preview, camera switching, photo and video capture")]
#[command(version = app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    /// Camera backend (gstreamer or virtual)
    #[arg(short, long, global = true, value_parser = parse_backend)]
    backend: Option<CameraBackendType>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the terminal camera (default)
    Terminal,

    /// List available cameras
    List,

    /// Take a photo
    Photo {
        /// Camera to use (front or back)
        #[arg(short, long, value_parser = cli::parse_position)]
        position: Option<DevicePosition>,

        /// Also copy the photo to this file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record a video
    Video {
        /// Camera to use (front or back)
        #[arg(short, long, value_parser = cli::parse_position)]
        position: Option<DevicePosition>,

        /// Recording duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Also copy the video to this file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Record without audio
        #[arg(long)]
        no_audio: bool,
    },
}

fn parse_backend(value: &str) -> Result<CameraBackendType, String> {
    match value.to_ascii_lowercase().as_str() {
        "gstreamer" | "gst" => Ok(CameraBackendType::GStreamer),
        "virtual" => Ok(CameraBackendType::Virtual),
        other => Err(format!("unknown backend '{}'", other)),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Commands::Terminal));

    // Set RUST_LOG to control the log level, e.g. RUST_LOG=camera_demo=debug
    init_logging(interactive);

    let mut config = match &cli.config {
        Some(path) => Config::load_or_default(path),
        None => Config::load(),
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("camera-demo-rt")
        .build()?;

    match cli.command {
        None | Some(Commands::Terminal) => run_terminal(&config, &runtime),
        Some(Commands::List) => cli::list_cameras(&config),
        Some(Commands::Photo { position, output }) => {
            cli::take_photo(&config, &runtime, position, output)
        }
        Some(Commands::Video {
            position,
            duration,
            output,
            no_audio,
        }) => cli::record_video(&config, &runtime, position, duration, output, no_audio),
    }
}

fn run_terminal(
    config: &Config,
    runtime: &tokio::runtime::Runtime,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = get_backend_for_type(config.backend);
    let controller = CaptureSessionController::initialize(
        backend,
        SessionSettings::from_config(config),
        MediaLibrary::from_config(config),
        runtime.handle().clone(),
    );
    let surface = PresentationSurface::new(
        RecordingCoordinator::new(controller),
        runtime.handle().clone(),
    );

    terminal::run(surface, runtime.handle().clone())
}

/// Log to stderr, or to a file in the cache dir while the terminal UI is up
fn init_logging(interactive: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    let log_file = interactive
        .then(|| {
            let dir = dirs::cache_dir()?.join("camera-demo");
            std::fs::create_dir_all(&dir).ok()?;
            std::fs::File::create(dir.join(LOG_FILE_NAME)).ok()
        })
        .flatten();

    match (interactive, log_file) {
        (true, Some(file)) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        (true, None) => builder.with_writer(std::io::sink).init(),
        (false, _) => builder.init(),
    }
}
