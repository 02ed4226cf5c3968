//! logkv Server Binary
//!
//! Opens the store and serves it over TCP.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::Parser;
use logkv::network::Server;
use logkv::{Config, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// logkv Server
#[derive(Parser, Debug)]
#[command(name = "logkv-server")]
#[command(about = "Append-only log key-value store server")]
#[command(version)]
struct Args {
    /// Log file path
    #[arg(short, long, default_value = "data/data.db")]
    path: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6380")]
    listen: String,

    /// Index capacity (0 = unbounded)
    #[arg(short = 'e', long, default_value = "10")]
    max_entries: usize,

    /// Maximum queued connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Connection worker threads
    #[arg(short, long, default_value = "4")]
    workers: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,logkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("logkv Server v{}", logkv::VERSION);
    tracing::info!("Log file: {}", args.path);
    tracing::info!("Listen address: {}", args.listen);

    let builder = Config::builder()
        .path(&args.path)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .worker_threads(args.workers);

    let config = match args.max_entries {
        0 => builder.unbounded_index().build(),
        n => builder.max_entries(n).build(),
    };

    // Open store once; it lives for the whole process
    let store = match Store::open(config.clone()) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, Arc::clone(&store)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Ctrl+C / SIGTERM stop the accept loop so the log is synced before exit
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown.store(true, Ordering::Relaxed);
    }) {
        tracing::error!("Failed to install signal handler: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = store.sync() {
        tracing::error!("Failed to sync log on shutdown: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
