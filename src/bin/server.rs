//! shardvault Server Binary
//!
//! Starts the TCP server for shardvault.

use std::sync::Arc;

use clap::Parser;
use shardvault::collection::CollectionEngine;
use shardvault::config::{Config, SyncPolicy};
use shardvault::network::Server;
use shardvault::{DocumentService, VaultError};
use tracing_subscriber::{fmt, EnvFilter};

/// shardvault Server
#[derive(Parser, Debug)]
#[command(name = "shardvault-server")]
#[command(about = "Document collections with a sharded side-file content store")]
#[command(version)]
struct Args {
    /// Collection data directory
    #[arg(short, long, default_value = "./shardvault_data")]
    data_dir: String,

    /// Content store root (defaults to <data-dir>/contentstore)
    #[arg(short, long)]
    store_dir: Option<String>,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8087")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Width of generated JPEG previews
    #[arg(short = 'w', long, default_value = "150")]
    preview_width: u32,

    /// Fsync collection logs after every write
    #[arg(long)]
    sync_every_write: bool,

    /// Compact a collection log once it holds this many records (0 = never)
    #[arg(long, default_value = "10000")]
    compact_after: u64,

    /// Collections to create at startup if missing (repeatable)
    #[arg(short, long = "collection")]
    collections: Vec<String>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shardvault=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    let store_dir = args
        .store_dir
        .clone()
        .unwrap_or_else(|| format!("{}/contentstore", args.data_dir));

    tracing::info!("shardvault Server v{}", shardvault::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Content store: {}", store_dir);
    tracing::info!("Listen address: {}", args.listen);

    let sync_policy = if args.sync_every_write {
        SyncPolicy::EveryWrite
    } else {
        SyncPolicy::EveryNEntries { count: 100 }
    };

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .store_dir(&store_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .preview_width(args.preview_width)
        .sync_policy(sync_policy)
        .compact_after_records(args.compact_after)
        .build();

    let service = match DocumentService::open(&config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to open service: {}", e);
            std::process::exit(1);
        }
    };

    for name in &args.collections {
        match service.engine().create_collection(name) {
            Ok(()) | Err(VaultError::CollectionExists(_)) => {}
            Err(e) => {
                tracing::error!("Failed to create collection {}: {}", name, e);
                std::process::exit(1);
            }
        }
    }

    tracing::info!("Collections: {:?}", service.collection_names());

    let mut server = Server::new(config, service);
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
