use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use camera_bridge::config::BridgeConfig;
use camera_bridge::{supervisor, worker};

/// Bridge a P2P camera session to a raw H.264 stream on stdout.
#[derive(Parser, Debug)]
#[command(name = "camera-bridge", version)]
struct Cli {
    /// Device UID
    uid: String,

    /// Device auth key
    auth_key: String,

    /// Internal: run as the connection worker for this catalog index.
    /// Set by the supervisor when it re-executes itself.
    #[arg(long, hide = true, value_name = "INDEX")]
    connect_worker: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout belongs to the video stream.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = BridgeConfig::from_env(cli.uid, cli.auth_key);

    match cli.connect_worker {
        Some(index) => worker::run(&cfg, index).await,
        None => {
            info!(uid = %cfg.uid, "camera bridge starting");
            supervisor::run(&cfg).await
        }
    }
}
