//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Worker thread pool for connections (bounded crossbeam channel)
//! - Commands routed through Store

mod server;
mod connection;

pub use server::Server;
pub use connection::Connection;
