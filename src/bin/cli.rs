//! shardvault CLI Client
//!
//! Command-line interface for interacting with shardvault.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shardvault::network::Client;
use shardvault::service::parse_document_id;
use shardvault::{Result, Upload};

/// shardvault CLI
#[derive(Parser, Debug)]
#[command(name = "shardvault-cli")]
#[command(about = "CLI for the shardvault document store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8087")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Insert a JSON document, optionally with an attachment
    Insert {
        collection: String,

        /// JSON object
        doc: String,

        /// File to attach
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Declared content type of the attachment
        #[arg(short = 't', long, default_value = "application/octet-stream")]
        content_type: String,
    },

    /// Read a document
    Get { collection: String, id: String },

    /// Read one page of documents
    Page {
        collection: String,
        page: u64,
        total: u64,
    },

    /// Replace a document's JSON (drops its attachment)
    Update {
        collection: String,
        id: String,
        doc: String,
    },

    /// Delete a document and its artifacts
    Delete { collection: String, id: String },

    /// Approximate document count
    Count { collection: String },

    /// Fetch an artifact: json, meta, preview.jpg, or the attachment extension
    Fetch {
        collection: String,
        id: String,
        selector: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Create a collection
    Create { collection: String },

    /// Drop a collection and its artifacts
    Drop { collection: String },

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut client = Client::connect(&args.server)?;

    match args.command {
        Commands::Insert {
            collection,
            doc,
            file,
            content_type,
        } => {
            let upload = match file {
                Some(path) => {
                    let data = std::fs::read(&path)?;
                    let filename = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    Some(Upload::new(filename, content_type, data))
                }
                None => None,
            };
            let id = client.insert(&collection, &doc, upload)?;
            println!("{}", id);
        }
        Commands::Get { collection, id } => {
            let doc = client.get(&collection, parse_document_id(&id)?)?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Commands::Page {
            collection,
            page,
            total,
        } => {
            let docs = client.page(&collection, page, total)?;
            println!("{}", serde_json::to_string_pretty(&docs)?);
        }
        Commands::Update {
            collection,
            id,
            doc,
        } => {
            client.update(&collection, parse_document_id(&id)?, &doc)?;
            println!("OK");
        }
        Commands::Delete { collection, id } => {
            client.delete(&collection, parse_document_id(&id)?)?;
            println!("OK");
        }
        Commands::Count { collection } => {
            println!("{}", client.count(&collection)?);
        }
        Commands::Fetch {
            collection,
            id,
            selector,
            out,
        } => {
            let fetched = client.fetch(&collection, parse_document_id(&id)?, &selector)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, &fetched.bytes)?;
                    eprintln!(
                        "{} bytes ({}) written to {}",
                        fetched.bytes.len(),
                        fetched.content_type,
                        path.display()
                    );
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&fetched.bytes)?;
                    stdout.flush()?;
                }
            }
        }
        Commands::Create { collection } => {
            client.create_collection(&collection)?;
            println!("OK");
        }
        Commands::Drop { collection } => {
            client.drop_collection(&collection)?;
            println!("OK");
        }
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
    }

    Ok(())
}
