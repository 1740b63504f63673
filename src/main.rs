//! Shared camera server.
//!
//! Serves live view, capture sessions and photo downloads over HTTP. Runs
//! against the synthetic camera unless a hardware device is selected.

use camstream::{
    capture::{Camera, CameraError, MockCamera},
    config::FileConfig,
    coordinator::CameraCoordinator,
    metrics::MetricsRegistry,
    server::{AppState, CameraServer},
    storage::PhotoStore,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "camstream", version, about = "Share one camera between HTTP clients")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configuration file.
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory captured images are written to.
    #[arg(long)]
    capture_dir: Option<PathBuf>,

    /// Hardware camera index. Without it the synthetic camera is used.
    #[arg(short, long)]
    device: Option<u32>,
}

type DeviceFactory = fn() -> Result<Box<dyn Camera + Send>, CameraError>;

fn synthetic_camera() -> Result<Box<dyn Camera + Send>, CameraError> {
    Ok(Box::new(MockCamera::new()))
}

#[cfg(feature = "camera")]
fn hardware_camera() -> Result<Box<dyn Camera + Send>, CameraError> {
    Ok(Box::new(camstream::capture::NokhwaCamera::new()))
}

fn select_device(device: Option<u32>) -> Result<DeviceFactory, String> {
    match device {
        None => {
            warn!("No device selected, serving the synthetic test pattern");
            Ok(synthetic_camera)
        }
        #[cfg(feature = "camera")]
        Some(index) => {
            info!(device = index, "Using hardware camera");
            Ok(hardware_camera)
        }
        #[cfg(not(feature = "camera"))]
        Some(_) => Err("built without hardware camera support (enable the `camera` feature)".into()),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Camera server v{}", camstream::VERSION);

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(port) = args.port {
        config.server.bind_addr.set_port(port);
    }
    if let Some(dir) = args.capture_dir {
        config.storage.capture_dir = dir;
    }
    if let Some(device) = args.device {
        config.capture.device_id = device;
    }

    let factory = match select_device(args.device) {
        Ok(factory) => factory,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let metrics = match MetricsRegistry::new() {
        Ok(metrics) => metrics,
        Err(e) => {
            eprintln!("Failed to create metrics registry: {}", e);
            std::process::exit(1);
        }
    };

    let coordinator = CameraCoordinator::new(factory, config.capture.clone(), metrics)
        .with_warmup(config.server.warmup());

    let server = CameraServer::new(
        config.server.clone(),
        AppState {
            coordinator: Arc::new(coordinator),
            store: PhotoStore::new(&config.storage.capture_dir),
            breakdowns: config.storage.breakdowns_file.clone(),
            stream: config.stream.clone(),
            session: config.session.clone(),
        },
    );

    let shutdown = Arc::new(Notify::new());
    let notify = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C");
        notify.notify_one();
    }) {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run(async move { shutdown.notified().await }).await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }

    info!("Done.");
}
