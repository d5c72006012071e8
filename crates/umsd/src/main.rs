//! umsd - Unified Model Store daemon.
//!
//! Main entry point: load config, install hooks, run the watchers until
//! SIGINT.

use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use ums_core::{CoordinationConfig, UmsPaths};
use umsd::UmsDaemon;

fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // The repo root is the only argument; default to the current directory.
    let repo_root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().expect("cannot determine current directory"));

    let config = match CoordinationConfig::from_file(&UmsPaths::new(&repo_root).config_file) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    runtime.block_on(async {
        let mut daemon = match UmsDaemon::new(&repo_root, config) {
            Ok(daemon) => daemon,
            Err(e) => {
                error!("failed to initialize daemon: {e}");
                std::process::exit(1);
            }
        };

        if let Err(e) = daemon.install_hooks() {
            error!("failed to install hooks: {e}");
            std::process::exit(1);
        }

        daemon.start();
        info!("umsd running on {}", repo_root.display());

        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received SIGINT"),
            Err(e) => error!("failed to listen for SIGINT: {e}"),
        }
        daemon.shutdown().await;
    });
}
