//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread polling a shutdown flag
//! - One thread per connection, bounded by `max_connections`
//! - Commands routed through DocumentService

mod server;
mod connection;
mod client;

pub use server::Server;
pub use connection::{execute, Connection};
pub use client::Client;
