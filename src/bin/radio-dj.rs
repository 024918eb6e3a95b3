//! Radio DJ daemon — generates tracks in the background and serves them to
//! WebSocket listeners.
//!
//! Needs a running generation daemon on its Unix socket (default
//! `/tmp/ace-step-gen.sock`). Startup fails if it cannot be reached.
//!
//! # Example
//!
//! ```sh
//! radio-dj --port 5000 --output-dir ./generated_tracks
//! RUST_LOG=melody_radio=debug radio-dj --config radio.json
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use clap::Parser;
use melody_radio::buffer::TrackBuffer;
use melody_radio::config::RadioConfig;
use melody_radio::generator::DaemonGenerator;
use melody_radio::manager::GenerationManager;
use melody_radio::producer::Producer;
use melody_radio::protocol::Dispatcher;
use melody_radio::server;
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(
    name = "radio-dj",
    about = "Generative radio: keeps a buffer of fresh tracks and pushes them to listeners"
)]
struct Args {
    /// JSON config file. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Generation daemon socket.
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Address to bind, e.g. `0.0.0.0:5000`.
    #[arg(long)]
    bind: Option<String>,

    /// Port to bind on all interfaces. Ignored when `--bind` is given.
    #[arg(long)]
    port: Option<u16>,

    /// Base URL listeners use to fetch tracks. Defaults to
    /// `http://localhost:<bound port>`.
    #[arg(long)]
    public_url: Option<String>,

    /// Directory for finished tracks.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Tracks to keep ready ahead of listeners.
    #[arg(long)]
    capacity: Option<usize>,

    /// Length of each generated track in seconds.
    #[arg(long)]
    duration: Option<f64>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<RadioConfig> {
        let mut config = match &self.config {
            Some(path) => RadioConfig::from_file(path)?,
            None => RadioConfig::default(),
        };
        if let Some(socket) = self.socket {
            config.daemon.socket = socket;
        }
        match (self.bind, self.port) {
            (Some(bind), _) => config.bind_addr = bind,
            (None, Some(port)) => config.bind_addr = format!("0.0.0.0:{port}"),
            (None, None) => {}
        }
        match self.public_url {
            Some(url) => config.public_url = url,
            // An unset public URL follows the port we actually listen on.
            None if config.public_url == RadioConfig::default().public_url => {
                if let Ok(addr) = config.bind_addr.parse::<SocketAddr>() {
                    config.public_url = format!("http://localhost:{}", addr.port());
                }
            }
            None => {}
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(capacity) = self.capacity {
            config.buffer_capacity = capacity;
        }
        if let Some(duration) = self.duration {
            config.track_duration_s = duration;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    std::fs::create_dir_all(&config.output_dir)?;

    let buffer = Arc::new(TrackBuffer::new(config.buffer_capacity)?);

    let daemon = config.daemon.clone();
    let duration_s = config.track_duration_s;
    tracing::info!(socket = %daemon.socket.display(), "connecting to generation daemon");
    let manager = GenerationManager::start(move || DaemonGenerator::connect(&daemon, duration_s)).await?;

    let producer = Producer::new(manager, Arc::clone(&buffer), &config);
    let stop = producer.stop_handle();
    producer.spawn()?;

    let listener = TcpListener::bind(&config.bind_addr).await?;
    let app = server::router(Dispatcher::from_config(buffer, &config), &config.output_dir);
    tracing::info!(public_url = %config.public_url, "radio on air");

    server::serve(listener, app, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("shutdown requested");
    })
    .await?;

    stop.store(true, Ordering::Relaxed);
    tracing::info!("server stopped; producer will not start another track");
    // The producer may be parked inside a generation request. Waiting for it
    // would hold the process open for up to a full track.
    std::process::exit(0);
}
