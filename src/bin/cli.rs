//! shardstore CLI
//!
//! Command-line interface for poking a shardstore directory: single-key
//! writes and reads, routing inspection, and file checkpoint/restore.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use shardstore::{Config, StorageClient};
use tracing_subscriber::{fmt, EnvFilter};

/// shardstore CLI
#[derive(Parser, Debug)]
#[command(name = "shardstore-cli")]
#[command(about = "CLI for the shardstore sharded document store")]
#[command(version)]
struct Args {
    /// Base directory for node storage
    #[arg(short, long, default_value = "./shardstore_data")]
    base_dir: PathBuf,

    /// Topology name under the base directory
    #[arg(short, long, default_value = "primary")]
    topology: String,

    /// Number of storage nodes
    #[arg(short, long, default_value = "4")]
    nodes: u32,

    /// Virtual-node replication factor
    #[arg(short, long, default_value = "32")]
    replicas: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a key-value pair
    Write {
        /// The key to write
        key: String,

        /// The value to write
        value: String,
    },

    /// Read a value by key
    Read {
        /// The key to read
        key: String,
    },

    /// Print the node index a key routes to
    Route {
        /// The key to route
        key: String,
    },

    /// Checkpoint a file's contents under a URI
    Checkpoint {
        /// Checkpoint URI (manifest key; chunks are keyed "<uri>-c<i>")
        uri: String,

        /// File to checkpoint
        file: PathBuf,
    },

    /// Restore a checkpoint into a file
    Restore {
        /// Checkpoint URI
        uri: String,

        /// Output file
        file: PathBuf,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shardstore=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let config = Config::builder()
        .base_dir(&args.base_dir)
        .topology(&args.topology)
        .node_count(args.nodes)
        .virtual_replicas(args.replicas)
        .build();

    let client = match StorageClient::open(config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to open storage client: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(&client, args.command) {
        tracing::error!("command failed: {e}");
        process::exit(1);
    }

    if let Err(e) = client.close() {
        tracing::error!("failed to close storage client: {e}");
        process::exit(1);
    }
}

fn run(client: &StorageClient, command: Commands) -> shardstore::Result<()> {
    match command {
        Commands::Write { key, value } => {
            client.write(&key, value.as_bytes())?;
            println!("OK");
        }

        Commands::Read { key } => {
            let payload = client.read(&key)?;
            match std::str::from_utf8(&payload) {
                Ok(text) => println!("{text}"),
                Err(_) => println!("({} binary bytes)", payload.len()),
            }
        }

        Commands::Route { key } => {
            println!("{}", client.route(&key)?);
        }

        Commands::Checkpoint { uri, file } => {
            let data = fs::read(&file)?;
            let chunks = client.checkpoint(&uri, &data)?;
            println!("{} bytes in {} chunks", data.len(), chunks);
        }

        Commands::Restore { uri, file } => {
            let data = client.restore(&uri)?;
            fs::write(&file, &data)?;
            println!("{} bytes", data.len());
        }
    }

    Ok(())
}
